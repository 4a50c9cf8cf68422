//! Track resolution through an external extractor.

pub mod ytdlp;

pub use ytdlp::YtDlpResolver;

use url::Url;

use crate::utils::is_youtube_url;

/// How a user query will be handed to the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A media URL, passed through as-is.
    Url(String),
    /// Free text, searched on the default provider.
    Search(String),
}

impl Query {
    /// Provider auto-detection: http(s) URLs and scheme-less YouTube links are
    /// used directly, anything else is a search.
    pub fn classify(input: &str) -> Self {
        let input = input.trim();
        if let Ok(url) = Url::parse(input) {
            if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
                return Query::Url(input.to_string());
            }
        }
        if is_youtube_url(input) {
            return Query::Url(format!("https://{input}"));
        }
        Query::Search(input.to_string())
    }

    /// The argument passed to the extractor, e.g. `ytsearch1:lofi beats`.
    pub fn to_extractor_arg(&self, default_search: &str) -> String {
        match self {
            Query::Url(u) => u.clone(),
            Query::Search(terms) => format!("{default_search}1:{terms}"),
        }
    }
}
