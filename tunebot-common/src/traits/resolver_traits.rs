use async_trait::async_trait;

use crate::error::ResolveError;
use crate::models::Track;

/// Turns a URL or free-text search into a playable [`Track`].
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError>;
}
