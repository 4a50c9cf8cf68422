// File: tunebot-core/tests/test_utils/mod.rs
//
// In-memory stand-ins for the resolver, the voice output and the voice cache.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::Semaphore;

use tunebot_common::error::{Error, ResolveError};
use tunebot_common::models::{SessionNotice, SessionSnapshot, Track};
use tunebot_common::traits::resolver_traits::TrackResolver;
use tunebot_common::traits::voice_traits::{
    CompletionSink, PlaybackControl, PlaybackRequest, VoiceOutput, VoicePresence,
};
use tunebot_core::config::PlayerConfig;
use tunebot_core::session::{SessionHandle, SessionManager};

pub const GUILD: u64 = 1;
pub const VOICE: u64 = 10;

pub fn track(title: &str, secs: u64) -> Track {
    Track::new(title, format!("https://www.youtube.com/watch?v={title}")).with_duration(secs)
}

// ----------------------------------------------------------------------
// resolver
// ----------------------------------------------------------------------

/// Answers from a fixed table, keyed by query text or source url.
#[derive(Default)]
pub struct FakeResolver {
    answers: Mutex<HashMap<String, Result<Track, ResolveError>>>,
    calls: AtomicUsize,
    answered: AtomicUsize,
    gate: Option<Semaphore>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolvable both by title and by source url.
    pub fn with_track(self, track: &Track) -> Self {
        let resolved = track
            .clone()
            .with_stream_url(format!("stream://{}", track.title));
        let mut answers = self.answers.lock();
        answers.insert(track.title.clone(), Ok(resolved.clone()));
        answers.insert(track.source_url.clone(), Ok(resolved));
        drop(answers);
        self
    }

    pub fn with_failure(self, track: &Track, err: ResolveError) -> Self {
        {
            let mut answers = self.answers.lock();
            answers.insert(track.title.clone(), Err(err.clone()));
            answers.insert(track.source_url.clone(), Err(err));
        }
        self
    }

    /// Every lookup waits for a [`FakeResolver::release`] before answering.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Lets `n` held lookups answer, oldest first.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn answered(&self) -> usize {
        self.answered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackResolver for FakeResolver {
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let answer = self
            .answers
            .lock()
            .get(query)
            .cloned()
            .unwrap_or(Err(ResolveError::NoResults));
        self.answered.fetch_add(1, Ordering::SeqCst);
        answer
    }
}

// ----------------------------------------------------------------------
// voice output
// ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    Pause,
    Resume,
    Stop,
    Volume(f32),
}

struct FakeControl {
    log: Arc<Mutex<Vec<ControlCall>>>,
}

impl PlaybackControl for FakeControl {
    fn pause(&self) -> Result<(), Error> {
        self.log.lock().push(ControlCall::Pause);
        Ok(())
    }

    fn resume(&self) -> Result<(), Error> {
        self.log.lock().push(ControlCall::Resume);
        Ok(())
    }

    fn stop(&self) -> Result<(), Error> {
        self.log.lock().push(ControlCall::Stop);
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), Error> {
        self.log.lock().push(ControlCall::Volume(volume));
        Ok(())
    }
}

/// Records every call and hands out controllable playbacks.
#[derive(Default)]
pub struct FakeOutput {
    pub connects: Mutex<Vec<(u64, u64)>>,
    pub disconnects: Mutex<Vec<u64>>,
    pub plays: Mutex<Vec<PlaybackRequest>>,
    sinks: Mutex<Vec<Option<CompletionSink>>>,
    controls: Mutex<Vec<Arc<Mutex<Vec<ControlCall>>>>>,
    failing_plays: AtomicUsize,
    play_attempts: AtomicUsize,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` calls to `play` fail as if the encoder would not start.
    pub fn fail_next_plays(&self, n: usize) {
        self.failing_plays.store(n, Ordering::SeqCst);
    }

    /// Calls to `play`, including failed ones.
    pub fn play_attempts(&self) -> usize {
        self.play_attempts.load(Ordering::SeqCst)
    }

    /// Successful calls to `play`.
    pub fn play_count(&self) -> usize {
        self.plays.lock().len()
    }

    pub fn stream_urls(&self) -> Vec<String> {
        self.plays.lock().iter().map(|p| p.stream_url.clone()).collect()
    }

    /// Control calls received by the `index`-th playback.
    pub fn control_log(&self, index: usize) -> Vec<ControlCall> {
        self.controls
            .lock()
            .get(index)
            .map(|log| log.lock().clone())
            .unwrap_or_default()
    }

    /// Fires the completion of the `index`-th playback, as the driver would.
    pub fn complete(&self, index: usize, error: Option<String>) {
        let sink = self.sinks.lock().get_mut(index).and_then(Option::take);
        if let Some(sink) = sink {
            sink.complete(error);
        }
    }

    pub fn complete_latest(&self) {
        let latest = self.play_count().saturating_sub(1);
        self.complete(latest, None);
    }
}

#[async_trait]
impl VoiceOutput for FakeOutput {
    async fn connect(&self, guild_id: u64, channel_id: u64) -> Result<(), Error> {
        self.connects.lock().push((guild_id, channel_id));
        Ok(())
    }

    async fn disconnect(&self, guild_id: u64) -> Result<(), Error> {
        self.disconnects.lock().push(guild_id);
        Ok(())
    }

    async fn play(
        &self,
        _guild_id: u64,
        request: PlaybackRequest,
        on_complete: CompletionSink,
    ) -> Result<Box<dyn PlaybackControl>, Error> {
        self.play_attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_plays
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Voice(format!("ffmpeg failed to start for {}", request.stream_url)));
        }
        let log = Arc::new(Mutex::new(Vec::new()));
        self.plays.lock().push(request);
        self.sinks.lock().push(Some(on_complete));
        self.controls.lock().push(Arc::clone(&log));
        Ok(Box::new(FakeControl { log }))
    }
}

// ----------------------------------------------------------------------
// presence
// ----------------------------------------------------------------------

/// Listener count and user channels set directly by the test.
#[derive(Default)]
pub struct FakePresence {
    listeners: Mutex<Option<usize>>,
    users: Mutex<HashMap<u64, u64>>,
}

impl FakePresence {
    pub fn set_listeners(&self, count: Option<usize>) {
        *self.listeners.lock() = count;
    }

    pub fn seat(&self, user_id: u64, channel_id: u64) {
        self.users.lock().insert(user_id, channel_id);
    }
}

impl VoicePresence for FakePresence {
    fn listener_count(&self, _guild_id: u64) -> Option<usize> {
        *self.listeners.lock()
    }

    fn user_channel(&self, _guild_id: u64, user_id: u64) -> Option<u64> {
        self.users.lock().get(&user_id).copied()
    }
}

// ----------------------------------------------------------------------
// harness
// ----------------------------------------------------------------------

pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub resolver: Arc<FakeResolver>,
    pub output: Arc<FakeOutput>,
    pub presence: Arc<FakePresence>,
    pub notices: UnboundedReceiver<SessionNotice>,
}

impl Harness {
    pub fn new(resolver: FakeResolver) -> Self {
        Self::with_config(resolver, PlayerConfig::default())
    }

    pub fn with_config(resolver: FakeResolver, config: PlayerConfig) -> Self {
        let resolver = Arc::new(resolver);
        let output = Arc::new(FakeOutput::new());
        let presence = Arc::new(FakePresence::default());
        let (tx, notices) = unbounded_channel();
        let manager = SessionManager::new(config, resolver.clone(), output.clone())
            .with_presence(presence.clone())
            .with_notices(tx);
        Self { manager: Arc::new(manager), resolver, output, presence, notices }
    }

    /// A session for [`GUILD`] already connected to [`VOICE`].
    pub async fn connected_session(&self) -> Result<SessionHandle, Error> {
        let handle = self.manager.get_or_create(GUILD);
        handle.connect(VOICE).await?;
        Ok(handle)
    }

    pub fn drain_notices(&mut self) -> Vec<SessionNotice> {
        let mut out = Vec::new();
        while let Ok(n) = self.notices.try_recv() {
            out.push(n);
        }
        out
    }
}

/// Polls the session until `pred` holds, or panics after a while.
pub async fn wait_for<F>(handle: &SessionHandle, what: &str, pred: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    for _ in 0..500 {
        if let Ok(snapshot) = handle.snapshot().await {
            if pred(&snapshot) {
                return snapshot;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let last = handle.snapshot().await;
    panic!("timed out waiting for {what}; last snapshot: {last:?}");
}

/// Polls an arbitrary condition, or panics after a while.
pub async fn wait_until<F>(what: &str, cond: F)
where
    F: Fn() -> bool,
{
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for {what}");
}

pub fn current_title(s: &SessionSnapshot) -> Option<&str> {
    s.current.as_ref().map(|t| t.title.as_str())
}

pub fn queue_titles(s: &SessionSnapshot) -> Vec<&str> {
    s.queue.iter().map(|t| t.title.as_str()).collect()
}
