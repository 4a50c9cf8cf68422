// File: tunebot-core/src/session/actor.rs
//
// The playback coordinator for one guild. Everything that touches the queue or
// the session state arrives as a `SessionMessage` on one mailbox and is
// handled here, one message at a time.

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace, warn};

use tunebot_common::error::{Error, ResolveError};
use tunebot_common::models::{PlaybackState, ReapReason, SessionNotice, SessionSnapshot, Track};
use tunebot_common::traits::resolver_traits::TrackResolver;
use tunebot_common::traits::voice_traits::{
    CompletionSink, PlaybackControl, PlaybackRequest, VoiceOutput, VoicePresence,
};

use crate::config::PlayerConfig;
use crate::session::queue::TrackQueue;
use crate::session::reaper::IdleReaper;

/// Result of a `join`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Joined,
    Moved,
    AlreadyConnected,
}

/// Caller-issued operations. Each carries its own reply channel.
#[derive(Debug)]
pub enum SessionCommand {
    Connect { channel_id: u64, reply: oneshot::Sender<Result<ConnectOutcome, Error>> },
    Enqueue { track: Track, reply: oneshot::Sender<usize> },
    Start { reply: oneshot::Sender<bool> },
    Pause { reply: oneshot::Sender<bool> },
    Resume { reply: oneshot::Sender<bool> },
    Stop { reply: oneshot::Sender<bool> },
    Skip { reply: oneshot::Sender<bool> },
    SetVolume { volume: f32, reply: oneshot::Sender<bool> },
    ClearQueue { reply: oneshot::Sender<usize> },
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },
    Leave { reply: oneshot::Sender<bool> },
}

/// Everything the session task reacts to.
#[derive(Debug)]
pub enum SessionMessage {
    Command(SessionCommand),
    /// A resolver task finished. Stale generations are dropped.
    Resolved { generation: u64, result: Result<Track, ResolveError> },
    /// The output reported the end of a playback attempt.
    TrackEnded { generation: u64, error: Option<String> },
    /// Non-bot listener count of the connected channel changed.
    ListenersChanged(usize),
}

enum Flow {
    Continue,
    Shutdown,
}

enum Wake {
    Message(Option<SessionMessage>),
    Deadline,
}

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionDeps {
    pub resolver: Arc<dyn TrackResolver>,
    pub output: Arc<dyn VoiceOutput>,
    pub presence: Option<Arc<dyn VoicePresence>>,
    pub notices: Option<UnboundedSender<SessionNotice>>,
}

pub struct SessionActor {
    guild_id: u64,
    config: PlayerConfig,
    deps: SessionDeps,
    mailbox: UnboundedSender<SessionMessage>,
    rx: UnboundedReceiver<SessionMessage>,

    queue: TrackQueue,
    state: PlaybackState,
    current: Option<Track>,
    control: Option<Box<dyn PlaybackControl>>,
    volume: f32,
    channel_id: Option<u64>,

    /// Bumped on every playback attempt and on every forced stop.
    generation: u64,
    consecutive_failures: u32,
    reaper: IdleReaper,
}

impl SessionActor {
    pub fn new(
        guild_id: u64,
        config: PlayerConfig,
        deps: SessionDeps,
        mailbox: UnboundedSender<SessionMessage>,
        rx: UnboundedReceiver<SessionMessage>,
    ) -> Self {
        let reaper = IdleReaper::new(config.idle_timeout);
        let volume = config.default_volume.clamp(0.0, 1.0);
        Self {
            guild_id,
            config,
            deps,
            mailbox,
            rx,
            queue: TrackQueue::new(),
            state: PlaybackState::Idle,
            current: None,
            control: None,
            volume,
            channel_id: None,
            generation: 0,
            consecutive_failures: 0,
            reaper,
        }
    }

    /// Drives the session until `leave` or the idle reaper ends it.
    pub async fn run(mut self) {
        info!("(Session {}) started", self.guild_id);
        self.reaper.mark_idle(Instant::now());

        loop {
            let deadline = self.reaper.next_deadline();
            let wake = tokio::select! {
                msg = self.rx.recv() => Wake::Message(msg),
                _ = sleep_until_deadline(deadline) => Wake::Deadline,
            };

            let flow = match wake {
                Wake::Message(Some(msg)) => self.handle_message(msg).await,
                Wake::Message(None) => Flow::Shutdown,
                Wake::Deadline => self.on_deadline().await,
            };

            if let Flow::Shutdown = flow {
                break;
            }
        }

        info!("(Session {}) ended", self.guild_id);
    }

    async fn handle_message(&mut self, msg: SessionMessage) -> Flow {
        match msg {
            SessionMessage::Command(cmd) => return self.handle_command(cmd).await,
            SessionMessage::Resolved { generation, result } => {
                self.on_resolved(generation, result).await;
            }
            SessionMessage::TrackEnded { generation, error } => {
                self.on_track_ended(generation, error);
            }
            SessionMessage::ListenersChanged(count) => {
                trace!("(Session {}) listeners => {count}", self.guild_id);
                self.reaper.listeners_changed(count, Instant::now());
            }
        }
        Flow::Continue
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> Flow {
        match cmd {
            SessionCommand::Connect { channel_id, reply } => {
                let res = self.connect(channel_id).await;
                let _ = reply.send(res);
            }
            SessionCommand::Enqueue { track, reply } => {
                debug!("(Session {}) enqueue '{}'", self.guild_id, track.title);
                let _ = reply.send(self.queue.enqueue(track));
            }
            SessionCommand::Start { reply } => {
                let _ = reply.send(self.start());
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            SessionCommand::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            SessionCommand::Stop { reply } => {
                let _ = reply.send(self.stop());
            }
            SessionCommand::Skip { reply } => {
                let _ = reply.send(self.skip());
            }
            SessionCommand::SetVolume { volume, reply } => {
                let _ = reply.send(self.set_volume(volume));
            }
            SessionCommand::ClearQueue { reply } => {
                let removed = self.queue.len();
                self.queue.clear();
                let _ = reply.send(removed);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Leave { reply } => {
                let was_connected = self.channel_id.is_some();
                self.teardown().await;
                let _ = reply.send(was_connected);
                return Flow::Shutdown;
            }
        }
        Flow::Continue
    }

    // ---------------------------------------------------------------
    // guarded transitions
    // ---------------------------------------------------------------

    async fn connect(&mut self, channel_id: u64) -> Result<ConnectOutcome, Error> {
        if self.channel_id == Some(channel_id) {
            return Ok(ConnectOutcome::AlreadyConnected);
        }
        self.deps.output.connect(self.guild_id, channel_id).await?;
        let previous = self.channel_id.replace(channel_id);
        info!("(Session {}) connected to channel {channel_id}", self.guild_id);

        if let Some(count) = self.deps.presence.as_ref().and_then(|p| p.listener_count(self.guild_id)) {
            self.reaper.listeners_changed(count, Instant::now());
        }

        Ok(match previous {
            Some(_) => ConnectOutcome::Moved,
            None => ConnectOutcome::Joined,
        })
    }

    fn start(&mut self) -> bool {
        if self.state != PlaybackState::Idle || self.queue.is_empty() || self.channel_id.is_none() {
            return false;
        }
        self.consecutive_failures = 0;
        self.advance();
        true
    }

    fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let Some(control) = &self.control else {
            return false;
        };
        match control.pause() {
            Ok(()) => {
                self.state = PlaybackState::Paused;
                true
            }
            Err(e) => {
                warn!("(Session {}) pause failed => {e}", self.guild_id);
                false
            }
        }
    }

    fn resume(&mut self) -> bool {
        if self.state != PlaybackState::Paused {
            return false;
        }
        let Some(control) = &self.control else {
            return false;
        };
        match control.resume() {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                true
            }
            Err(e) => {
                warn!("(Session {}) resume failed => {e}", self.guild_id);
                false
            }
        }
    }

    fn stop(&mut self) -> bool {
        if self.current.is_none() {
            return false;
        }
        self.state = PlaybackState::Stopping;
        self.halt_output();
        self.queue.clear();
        self.enter_idle();
        info!("(Session {}) stopped, queue cleared", self.guild_id);
        true
    }

    fn skip(&mut self) -> bool {
        let Some(skipped) = self.current.take() else {
            return false;
        };
        debug!("(Session {}) skipping '{}'", self.guild_id, skipped.title);
        self.state = PlaybackState::Stopping;
        self.halt_output();
        self.consecutive_failures = 0;
        self.advance();
        true
    }

    fn set_volume(&mut self, volume: f32) -> bool {
        if !(0.0..=1.0).contains(&volume) {
            return false;
        }
        self.volume = volume;
        if let Some(control) = &self.control {
            if let Err(e) = control.set_volume(volume) {
                warn!("(Session {}) live volume change failed => {e}", self.guild_id);
            }
        }
        true
    }

    // ---------------------------------------------------------------
    // coordinator internals
    // ---------------------------------------------------------------

    /// Pops the next track and kicks off its re-resolution, or idles.
    fn advance(&mut self) {
        if self.channel_id.is_none() {
            self.enter_idle();
            return;
        }
        let Some(track) = self.queue.dequeue_front() else {
            self.enter_idle();
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        self.state = PlaybackState::Resolving;
        self.reaper.mark_active();
        debug!(
            "(Session {}) resolving '{}' (gen {generation})",
            self.guild_id, track.title
        );

        let source = track.source_url.clone();
        self.current = Some(track);

        let resolver = Arc::clone(&self.deps.resolver);
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(&source).await;
            let _ = mailbox.send(SessionMessage::Resolved { generation, result });
        });
    }

    async fn on_resolved(&mut self, generation: u64, result: Result<Track, ResolveError>) {
        if generation != self.generation || self.state != PlaybackState::Resolving {
            debug!(
                "(Session {}) discarding stale resolve result (gen {generation}, now {})",
                self.guild_id, self.generation
            );
            return;
        }

        let fresh = match result {
            Ok(fresh) => fresh,
            Err(e) => {
                self.playback_failed(e.user_hint().to_string(), &e.to_string());
                return;
            }
        };
        let Some(stream_url) = fresh.stream_url else {
            self.playback_failed(
                ResolveError::Malformed(String::new()).user_hint().to_string(),
                "resolver returned no stream url",
            );
            return;
        };

        let request = PlaybackRequest { stream_url: stream_url.clone(), volume: self.volume };
        let sink = self.completion_sink(generation);
        match self.deps.output.play(self.guild_id, request, sink).await {
            Ok(control) => {
                self.control = Some(control);
                self.state = PlaybackState::Playing;
                self.consecutive_failures = 0;
                if let Some(current) = self.current.as_mut() {
                    current.stream_url = Some(stream_url);
                    info!("(Session {}) now playing '{}'", self.guild_id, current.title);
                    let notice = SessionNotice::TrackStarted {
                        guild_id: self.guild_id,
                        track: current.clone(),
                    };
                    self.notify(notice);
                }
            }
            Err(e) => {
                self.playback_failed("Audio output could not be started.".to_string(), &e.to_string());
            }
        }
    }

    fn on_track_ended(&mut self, generation: u64, error: Option<String>) {
        if generation != self.generation
            || !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused)
        {
            trace!("(Session {}) ignoring completion for gen {generation}", self.guild_id);
            return;
        }
        match error {
            Some(e) => warn!("(Session {}) playback error => {e}", self.guild_id),
            None => debug!("(Session {}) track finished", self.guild_id),
        }
        self.control = None;
        self.current = None;
        self.advance();
    }

    /// Skip-on-failure, bounded by `max_consecutive_failures`.
    fn playback_failed(&mut self, hint: String, detail: &str) {
        self.consecutive_failures += 1;
        self.control = None;
        let title = self
            .current
            .take()
            .map(|t| t.title)
            .unwrap_or_else(|| "Unknown Title".to_string());
        warn!(
            "(Session {}) skipping '{}' ({} in a row) => {detail}",
            self.guild_id, title, self.consecutive_failures
        );
        self.notify(SessionNotice::TrackSkipped {
            guild_id: self.guild_id,
            title,
            reason: hint,
        });

        if self.consecutive_failures >= self.config.max_consecutive_failures {
            error!(
                "(Session {}) queue exhausted by errors after {} failures",
                self.guild_id, self.consecutive_failures
            );
            self.notify(SessionNotice::QueueExhaustedByErrors {
                guild_id: self.guild_id,
                failures: self.consecutive_failures,
            });
            self.consecutive_failures = 0;
            self.enter_idle();
        } else {
            self.advance();
        }
    }

    fn completion_sink(&self, generation: u64) -> CompletionSink {
        let mailbox = self.mailbox.clone();
        CompletionSink::new(move |error| {
            let _ = mailbox.send(SessionMessage::TrackEnded { generation, error });
        })
    }

    /// Hard-stops whatever is playing and invalidates in-flight callbacks.
    fn halt_output(&mut self) {
        self.generation += 1;
        if let Some(control) = self.control.take() {
            if let Err(e) = control.stop() {
                warn!("(Session {}) stopping output failed => {e}", self.guild_id);
            }
        }
    }

    fn enter_idle(&mut self) {
        self.state = PlaybackState::Idle;
        self.current = None;
        self.control = None;
        self.reaper.mark_idle(Instant::now());
    }

    async fn on_deadline(&mut self) -> Flow {
        let now = Instant::now();
        let Some(reason) = self.reaper.expired(now) else {
            return Flow::Continue;
        };

        if reason == ReapReason::NoListeners {
            let live = self.deps.presence.as_ref().and_then(|p| p.listener_count(self.guild_id));
            if let Some(count) = live.filter(|c| *c > 0) {
                debug!("(Session {}) listeners came back ({count}), staying", self.guild_id);
                self.reaper.clear_alone();
                return Flow::Continue;
            }
        }

        info!("(Session {}) idle reaper fired => {reason:?}", self.guild_id);
        self.teardown().await;
        self.notify(SessionNotice::Disconnected { guild_id: self.guild_id, reason });
        Flow::Shutdown
    }

    /// Stops playback, drops the queue and leaves voice.
    async fn teardown(&mut self) {
        // Closed mailbox: the manager treats this session as gone from here on.
        self.rx.close();
        self.halt_output();
        self.queue.clear();
        self.current = None;
        self.state = PlaybackState::Idle;
        if self.channel_id.take().is_some() {
            if let Err(e) = self.deps.output.disconnect(self.guild_id).await {
                debug!("(Session {}) disconnect => {e}; treating as disconnected", self.guild_id);
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            guild_id: self.guild_id,
            state: self.state,
            current: self.current.clone(),
            queue: self.queue.peek_all(),
            volume: self.volume,
            channel_id: self.channel_id,
        }
    }

    fn notify(&self, notice: SessionNotice) {
        if let Some(tx) = &self.deps.notices {
            let _ = tx.send(notice);
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}
