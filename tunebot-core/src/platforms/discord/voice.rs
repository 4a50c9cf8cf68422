//! voice.rs
//!
//! Voice output through Songbird: joins/leaves voice channels and plays
//! ffmpeg-transcoded streams, reporting the end of each track back through a
//! [`CompletionSink`].

use std::num::NonZeroU64;
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use songbird::error::JoinError;
use songbird::id::{ChannelId, GuildId};
use songbird::input::core::io::ReadOnlySource;
use songbird::input::{ChildContainer, Input, RawAdapter};
use songbird::tracks::{PlayMode, Track as VoiceTrack, TrackHandle};
use songbird::{Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent};
use tracing::{debug, info};

use tunebot_common::error::Error;
use tunebot_common::traits::voice_traits::{
    CompletionSink, PlaybackControl, PlaybackRequest, VoiceOutput,
};

use crate::config::OutputConfig;

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: u32 = 2;

fn guild(id: u64) -> Result<GuildId, Error> {
    NonZeroU64::new(id)
        .map(GuildId::from)
        .ok_or_else(|| Error::Voice(format!("invalid guild id {id}")))
}

fn channel(id: u64) -> Result<ChannelId, Error> {
    NonZeroU64::new(id)
        .map(ChannelId::from)
        .ok_or_else(|| Error::Voice(format!("invalid channel id {id}")))
}

/// [`VoiceOutput`] backed by a shared [`Songbird`] manager.
pub struct SongbirdOutput {
    songbird: Arc<Songbird>,
    config: OutputConfig,
}

impl SongbirdOutput {
    pub fn new(songbird: Arc<Songbird>, config: OutputConfig) -> Self {
        Self { songbird, config }
    }

    fn spawn_transcoder(&self, stream_url: &str) -> Result<Input, Error> {
        let child = Command::new(&self.config.ffmpeg)
            .args(self.config.ffmpeg_args(stream_url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(RawAdapter::new(ReadOnlySource::new(ChildContainer::from(child)), SAMPLE_RATE, CHANNELS).into())
    }
}

#[async_trait]
impl VoiceOutput for SongbirdOutput {
    async fn connect(&self, guild_id: u64, channel_id: u64) -> Result<(), Error> {
        self.songbird
            .join(guild(guild_id)?, channel(channel_id)?)
            .await
            .map_err(|e| Error::Voice(format!("join failed: {e}")))?;
        info!("(Songbird) joined channel {channel_id} in guild {guild_id}");
        Ok(())
    }

    async fn disconnect(&self, guild_id: u64) -> Result<(), Error> {
        match self.songbird.remove(guild(guild_id)?).await {
            Ok(()) => {
                info!("(Songbird) left guild {guild_id}");
                Ok(())
            }
            Err(JoinError::NoCall) => {
                debug!("(Songbird) no call in guild {guild_id}; already disconnected");
                Ok(())
            }
            Err(e) => Err(Error::Voice(format!("leave failed: {e}"))),
        }
    }

    async fn play(
        &self,
        guild_id: u64,
        request: PlaybackRequest,
        on_complete: CompletionSink,
    ) -> Result<Box<dyn PlaybackControl>, Error> {
        let call = self
            .songbird
            .get(guild(guild_id)?)
            .ok_or_else(|| Error::Voice(format!("not connected in guild {guild_id}")))?;

        let input = self.spawn_transcoder(&request.stream_url)?;
        let handle = {
            let mut call = call.lock().await;
            call.play_only(VoiceTrack::from(input).volume(request.volume))
        };

        let notifier = TrackEndNotifier::new(on_complete);
        handle
            .add_event(Event::Track(TrackEvent::End), notifier.clone())
            .map_err(|e| Error::Voice(format!("could not watch track end: {e}")))?;
        handle
            .add_event(Event::Track(TrackEvent::Error), notifier)
            .map_err(|e| Error::Voice(format!("could not watch track errors: {e}")))?;

        Ok(Box::new(SongbirdPlayback { handle }))
    }
}

/// Fires the completion sink on the first end or error event of a track.
#[derive(Clone)]
struct TrackEndNotifier {
    sink: Arc<Mutex<Option<CompletionSink>>>,
}

impl TrackEndNotifier {
    fn new(sink: CompletionSink) -> Self {
        Self { sink: Arc::new(Mutex::new(Some(sink))) }
    }
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(states) => states.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(format!("{e:?}")),
                _ => None,
            }),
            _ => None,
        };
        if let Some(sink) = self.sink.lock().take() {
            sink.complete(error);
        }
        Some(Event::Cancel)
    }
}

struct SongbirdPlayback {
    handle: TrackHandle,
}

impl PlaybackControl for SongbirdPlayback {
    fn pause(&self) -> Result<(), Error> {
        self.handle.pause().map_err(|e| Error::Voice(e.to_string()))
    }

    fn resume(&self) -> Result<(), Error> {
        self.handle.play().map_err(|e| Error::Voice(e.to_string()))
    }

    fn stop(&self) -> Result<(), Error> {
        self.handle.stop().map_err(|e| Error::Voice(e.to_string()))
    }

    fn set_volume(&self, volume: f32) -> Result<(), Error> {
        self.handle.set_volume(volume).map_err(|e| Error::Voice(e.to_string()))
    }
}
