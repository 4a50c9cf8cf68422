use std::fmt;

use async_trait::async_trait;

use crate::error::Error;

/// What the output side needs to start one playback attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub stream_url: String,
    pub volume: f32,
}

/// One-shot completion callback for a playback attempt.
///
/// Consumed on use, so it can fire at most once. Dropping it without calling
/// [`CompletionSink::complete`] means the attempt never reports completion.
pub struct CompletionSink {
    callback: Box<dyn FnOnce(Option<String>) + Send>,
}

impl CompletionSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Option<String>) + Send + 'static,
    {
        Self { callback: Box::new(callback) }
    }

    /// `error` is `None` for a natural end of stream.
    pub fn complete(self, error: Option<String>) {
        (self.callback)(error)
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionSink")
    }
}

/// Control surface of a single running playback.
pub trait PlaybackControl: Send + Sync {
    fn pause(&self) -> Result<(), Error>;
    fn resume(&self) -> Result<(), Error>;
    /// Hard stop. Must not wait for the stream to notice.
    fn stop(&self) -> Result<(), Error>;
    fn set_volume(&self, volume: f32) -> Result<(), Error>;
}

/// The voice connection + transcoder side of a guild.
#[async_trait]
pub trait VoiceOutput: Send + Sync {
    async fn connect(&self, guild_id: u64, channel_id: u64) -> Result<(), Error>;

    /// Leaving a guild we are not connected to is not an error.
    async fn disconnect(&self, guild_id: u64) -> Result<(), Error>;

    async fn play(
        &self,
        guild_id: u64,
        request: PlaybackRequest,
        on_complete: CompletionSink,
    ) -> Result<Box<dyn PlaybackControl>, Error>;
}

/// Read access to who is sitting in which voice channel.
pub trait VoicePresence: Send + Sync {
    /// Non-bot users in the channel the bot is connected to in this guild.
    /// `None` when the bot has no voice state in the guild.
    fn listener_count(&self, guild_id: u64) -> Option<usize>;

    /// The voice channel a user currently sits in.
    fn user_channel(&self, guild_id: u64, user_id: u64) -> Option<u64>;
}
