// ================================================================
// File: tunebot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The session task for this guild has already shut down.
    #[error("Session closed for guild {0}")]
    SessionClosed(u64),
}

/// Why a query (or a re-resolution of a queued track) produced nothing playable.
///
/// Callers handle every variant the same way (skip / reject); the variant only
/// picks the hint shown to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no results for query")]
    NoResults,

    #[error("media is not accessible: {0}")]
    Inaccessible(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("extractor unavailable: {0}")]
    Backend(String),
}

impl ResolveError {
    pub fn user_hint(&self) -> &'static str {
        match self {
            ResolveError::NoResults => "No results were found for that search.",
            ResolveError::Inaccessible(_) => {
                "The video is DRM protected, private, or otherwise unavailable."
            }
            ResolveError::Network(_) => "There was a network problem reaching the video host.",
            ResolveError::Malformed(_) => "The video host returned something I couldn't play.",
            ResolveError::Backend(_) => "The media extractor isn't available right now.",
        }
    }
}
