// File: tunebot-core/src/resolver/ytdlp.rs

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use tunebot_common::error::ResolveError;
use tunebot_common::models::Track;
use tunebot_common::traits::resolver_traits::TrackResolver;

use crate::config::ResolverConfig;
use crate::resolver::Query;

/// The subset of yt-dlp's `--dump-single-json` output we care about.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    url: Option<String>,
    #[serde(default)]
    entries: Option<Vec<YtDlpInfo>>,
}

/// Resolves queries by shelling out to `yt-dlp`. Only metadata and a direct
/// stream URL are fetched, nothing is downloaded.
pub struct YtDlpResolver {
    config: ResolverConfig,
}

impl YtDlpResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, target: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--playlist-items".to_string(),
            "1".to_string(),
            "-f".to_string(),
            self.config.format.clone(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--default-search".to_string(),
            self.config.default_search.clone(),
        ];
        if let Some(addr) = &self.config.source_address {
            args.push("--source-address".to_string());
            args.push(addr.clone());
        }
        args.push("--".to_string());
        args.push(target.to_string());
        args
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError> {
        let query_kind = Query::classify(query);
        if let Query::Search(terms) = &query_kind {
            if terms.is_empty() {
                return Err(ResolveError::NoResults);
            }
        }
        let target = query_kind.to_extractor_arg(&self.config.default_search);
        debug!("(YtDlpResolver) resolving '{}'", target);

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(self.build_args(&target))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.timeout, cmd.output()).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => {
                warn!("(YtDlpResolver) failed to launch '{}': {e}", self.config.binary);
                return Err(ResolveError::Backend(e.to_string()));
            }
            Err(_) => {
                return Err(ResolveError::Network(format!(
                    "extraction timed out after {:?}",
                    self.config.timeout
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            trace!("(YtDlpResolver) stderr => {stderr}");
            return Err(classify_failure(&stderr));
        }

        parse_info(&output.stdout, &target)
    }
}

/// Maps a single-JSON document to a [`Track`], keeping only the first entry of
/// a playlist or search result.
pub fn parse_info(json: &[u8], requested: &str) -> Result<Track, ResolveError> {
    let info: YtDlpInfo =
        serde_json::from_slice(json).map_err(|e| ResolveError::Malformed(e.to_string()))?;

    let info = match info.entries {
        Some(entries) => entries.into_iter().next().ok_or(ResolveError::NoResults)?,
        None => info,
    };

    let stream_url = info
        .url
        .ok_or_else(|| ResolveError::Malformed("no stream url in response".into()))?;

    let source_url = info
        .webpage_url
        .or(info.original_url)
        .unwrap_or_else(|| requested.to_string());

    let mut track = Track::new(
        info.title.unwrap_or_else(|| "Unknown Title".to_string()),
        source_url,
    )
    .with_stream_url(stream_url);
    if let Some(d) = info.duration.filter(|d| d.is_finite() && *d >= 0.0) {
        track = track.with_duration(d.round() as u64);
    }
    if let Some(thumb) = info.thumbnail {
        track = track.with_thumbnail(thumb);
    }
    Ok(track)
}

/// Best-effort reading of yt-dlp's error output.
pub fn classify_failure(stderr: &str) -> ResolveError {
    let lower = stderr.to_lowercase();
    let message = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("unknown extractor error")
        .trim()
        .to_string();

    const RESTRICTED: [&str; 7] = [
        "drm",
        "sign in to confirm",
        "private video",
        "video unavailable",
        "not available",
        "copyright",
        "members-only",
    ];
    const NETWORK: [&str; 6] = [
        "unable to download",
        "timed out",
        "temporary failure in name resolution",
        "connection reset",
        "network is unreachable",
        "http error 5",
    ];

    if lower.contains("no video results") || lower.contains("returned 0 results") {
        ResolveError::NoResults
    } else if RESTRICTED.iter().any(|m| lower.contains(m)) {
        ResolveError::Inaccessible(message)
    } else if NETWORK.iter().any(|m| lower.contains(m)) {
        ResolveError::Network(message)
    } else {
        ResolveError::Malformed(message)
    }
}
