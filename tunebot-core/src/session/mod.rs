//! Per-guild playback sessions: queue, coordinator task, idle reaper.

pub mod actor;
pub mod handle;
pub mod manager;
pub mod queue;
pub mod reaper;

pub use actor::{ConnectOutcome, SessionDeps};
pub use handle::SessionHandle;
pub use manager::SessionManager;
pub use queue::TrackQueue;
pub use reaper::IdleReaper;
