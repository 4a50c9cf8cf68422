// File: tunebot-core/src/session/reaper.rs

use std::time::Duration;

use tokio::time::Instant;
use tunebot_common::models::ReapReason;

/// Deadline bookkeeping for the idle reaper. Purely passive: the session task
/// sleeps until [`IdleReaper::next_deadline`] and then asks
/// [`IdleReaper::expired`] what fired.
#[derive(Debug, Clone)]
pub struct IdleReaper {
    window: Duration,
    idle_since: Option<Instant>,
    alone_since: Option<Instant>,
}

impl IdleReaper {
    pub fn new(window: Duration) -> Self {
        Self { window, idle_since: None, alone_since: None }
    }

    /// Nothing is playing or about to play. Keeps an already running countdown.
    pub fn mark_idle(&mut self, now: Instant) {
        self.idle_since.get_or_insert(now);
    }

    /// Playback started; the idle countdown is cancelled.
    pub fn mark_active(&mut self) {
        self.idle_since = None;
    }

    /// Latest non-bot listener count of the bot's channel.
    pub fn listeners_changed(&mut self, count: usize, now: Instant) {
        if count == 0 {
            self.alone_since.get_or_insert(now);
        } else {
            self.alone_since = None;
        }
    }

    /// The alone countdown was re-checked and found listeners after all.
    pub fn clear_alone(&mut self) {
        self.alone_since = None;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        let idle = self.idle_since.and_then(|t| self.deadline(t));
        let alone = self.alone_since.and_then(|t| self.deadline(t));
        match (idle, alone) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Which trigger, if any, has run out at `now`. Idle wins over alone.
    pub fn expired(&self, now: Instant) -> Option<ReapReason> {
        let due = |since: Option<Instant>| {
            since.and_then(|t| self.deadline(t)).is_some_and(|d| now >= d)
        };
        if due(self.idle_since) {
            return Some(ReapReason::NothingPlaying);
        }
        if due(self.alone_since) {
            return Some(ReapReason::NoListeners);
        }
        None
    }

    /// `None` when the window reaches past what `Instant` can represent.
    fn deadline(&self, since: Instant) -> Option<Instant> {
        since.checked_add(self.window)
    }
}
