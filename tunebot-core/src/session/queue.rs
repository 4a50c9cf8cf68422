// File: tunebot-core/src/session/queue.rs

use std::collections::VecDeque;

use tunebot_common::models::Track;

/// FIFO of tracks waiting to be played in one guild. Only the owning session
/// task ever touches it.
#[derive(Debug, Default, Clone)]
pub struct TrackQueue {
    tracks: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends at the tail and returns the new length.
    pub fn enqueue(&mut self, track: Track) -> usize {
        self.tracks.push_back(track);
        self.tracks.len()
    }

    pub fn dequeue_front(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Snapshot in playback order.
    pub fn peek_all(&self) -> Vec<Track> {
        self.tracks.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
