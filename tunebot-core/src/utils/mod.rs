pub mod format;

pub use format::{format_duration, is_youtube_url, track_line, truncate_text};
