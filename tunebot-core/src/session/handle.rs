// File: tunebot-core/src/session/handle.rs

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use tunebot_common::error::Error;
use tunebot_common::models::{SessionSnapshot, Track};

use crate::session::actor::{ConnectOutcome, SessionCommand, SessionMessage};

/// Cheap, cloneable front door to one guild's session task.
///
/// Every method posts into the session mailbox and waits for the reply, so
/// callers never touch session state directly.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    guild_id: u64,
    tx: UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    pub(crate) fn new(guild_id: u64, tx: UnboundedSender<SessionMessage>) -> Self {
        Self { guild_id, tx }
    }

    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }

    /// True once the session task has ended.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMessage::Command(make(reply)))
            .map_err(|_| Error::SessionClosed(self.guild_id))?;
        rx.await.map_err(|_| Error::SessionClosed(self.guild_id))
    }

    pub async fn connect(&self, channel_id: u64) -> Result<ConnectOutcome, Error> {
        self.request(|reply| SessionCommand::Connect { channel_id, reply }).await?
    }

    /// Appends to the queue; returns the queue length afterwards.
    pub async fn enqueue(&self, track: Track) -> Result<usize, Error> {
        self.request(|reply| SessionCommand::Enqueue { track, reply }).await
    }

    /// Starts playback if the session is idle, connected, and has queued tracks.
    pub async fn start(&self) -> Result<bool, Error> {
        self.request(|reply| SessionCommand::Start { reply }).await
    }

    pub async fn pause(&self) -> Result<bool, Error> {
        self.request(|reply| SessionCommand::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<bool, Error> {
        self.request(|reply| SessionCommand::Resume { reply }).await
    }

    pub async fn stop(&self) -> Result<bool, Error> {
        self.request(|reply| SessionCommand::Stop { reply }).await
    }

    pub async fn skip(&self) -> Result<bool, Error> {
        self.request(|reply| SessionCommand::Skip { reply }).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<bool, Error> {
        self.request(|reply| SessionCommand::SetVolume { volume, reply }).await
    }

    /// Empties the queue; returns how many tracks were removed.
    pub async fn clear_queue(&self) -> Result<usize, Error> {
        self.request(|reply| SessionCommand::ClearQueue { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, Error> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Stops, disconnects and ends the session. Returns whether it was connected.
    pub async fn leave(&self) -> Result<bool, Error> {
        self.request(|reply| SessionCommand::Leave { reply }).await
    }

    pub fn listeners_changed(&self, count: usize) {
        let _ = self.tx.send(SessionMessage::ListenersChanged(count));
    }
}
