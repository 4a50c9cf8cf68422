use serde::{Deserialize, Serialize};

/// The user who asked for a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: u64,
    pub name: String,
}

impl Requester {
    pub fn new(user_id: u64, name: impl Into<String>) -> Self {
        Self { user_id, name: name.into() }
    }

    /// Discord mention markup, e.g. `<@1234>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

/// A resolved, playable piece of media.
///
/// `stream_url` is only valid for a short while after resolution; the
/// coordinator re-resolves `source_url` right before playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub source_url: String,
    pub duration_secs: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub requester: Option<Requester>,
    pub stream_url: Option<String>,
}

impl Track {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            duration_secs: None,
            thumbnail_url: None,
            requester: None,
            stream_url: None,
        }
    }

    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requester = Some(requester);
        self
    }
}
