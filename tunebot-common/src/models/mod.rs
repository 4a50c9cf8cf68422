// File: tunebot-common/src/models/mod.rs
pub mod track;
pub mod session;

pub use track::{Requester, Track};
pub use session::{PlaybackState, ReapReason, SessionNotice, SessionSnapshot};
