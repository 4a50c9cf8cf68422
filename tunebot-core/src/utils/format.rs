// File: tunebot-core/src/utils/format.rs

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest title shown in queue listings before it gets an ellipsis.
pub const DEFAULT_TRUNCATE_LEN: usize = 50;

static YOUTUBE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(https?://)?(www\.|m\.|music\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/",
        r"^(https?://)?(www\.)?youtu\.be/",
        r"^(https?://)?(www\.)?youtube\.com/watch\?v=",
        r"^(https?://)?(www\.)?youtube\.com/embed/",
        r"^(https?://)?(www\.)?youtube\.com/v/",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// True for anything that looks like a YouTube video link, with or without a scheme.
pub fn is_youtube_url(text: &str) -> bool {
    YOUTUBE_PATTERNS.iter().any(|re| re.is_match(text))
}

/// `MM:SS`, or `HH:MM:SS` once the duration reaches an hour. `None` is "Unknown".
pub fn format_duration(seconds: Option<u64>) -> String {
    let Some(seconds) = seconds else {
        return "Unknown".to_string();
    };
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Cuts `text` to `max_len` characters, ending in "..." when something was cut.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// `**Title** [03:25]` as used in queue listings.
pub fn track_line(title: &str, duration_secs: Option<u64>) -> String {
    format!(
        "**{}** [{}]",
        truncate_text(title, DEFAULT_TRUNCATE_LEN),
        format_duration(duration_secs)
    )
}
