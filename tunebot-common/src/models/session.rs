use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::track::Track;

/// Coordinator states.
///
/// `Stopping` is a transitional state a stop or skip passes through inside a
/// single mailbox message. Snapshots never report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Resolving,
    Playing,
    Paused,
    Stopping,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Resolving => "resolving",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Point-in-time copy of a guild session, handed out to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub guild_id: u64,
    pub state: PlaybackState,
    pub current: Option<Track>,
    pub queue: Vec<Track>,
    pub volume: f32,
    pub channel_id: Option<u64>,
}

impl SessionSnapshot {
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn is_connected(&self) -> bool {
        self.channel_id.is_some()
    }
}

/// Why the idle reaper tore a session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReapReason {
    NothingPlaying,
    NoListeners,
}

/// Things a session reports on its own, outside of any command reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionNotice {
    TrackStarted { guild_id: u64, track: Track },
    TrackSkipped { guild_id: u64, title: String, reason: String },
    QueueExhaustedByErrors { guild_id: u64, failures: u32 },
    Disconnected { guild_id: u64, reason: ReapReason },
}

impl SessionNotice {
    pub fn guild_id(&self) -> u64 {
        match self {
            SessionNotice::TrackStarted { guild_id, .. }
            | SessionNotice::TrackSkipped { guild_id, .. }
            | SessionNotice::QueueExhaustedByErrors { guild_id, .. }
            | SessionNotice::Disconnected { guild_id, .. } => *guild_id,
        }
    }
}
