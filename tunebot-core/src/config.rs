// File: tunebot-core/src/config.rs
//
// Runtime configuration. The server binary fills these from CLI flags and the
// environment; everything here has sensible defaults for tests.

use std::time::Duration;

use tunebot_common::error::Error;

/// Token value shipped in example `.env` files. Refused at startup.
pub const PLACEHOLDER_TOKEN: &str = "your_discord_bot_token_here";

/// Longest idle timeout accepted at startup (one week).
pub const MAX_IDLE_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Volume a fresh session starts with, `0.0..=1.0`.
    pub default_volume: f32,
    /// Quiet period before the idle reaper disconnects.
    pub idle_timeout: Duration,
    /// Consecutive resolve/start failures before the coordinator gives up.
    pub max_consecutive_failures: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 0.5,
            idle_timeout: Duration::from_secs(300),
            max_consecutive_failures: 5,
        }
    }
}

/// Options passed to `yt-dlp` for every extraction.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub binary: String,
    pub format: String,
    pub default_search: String,
    pub source_address: Option<String>,
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            default_search: "ytsearch".to_string(),
            source_address: Some("0.0.0.0".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Options for the `ffmpeg` transcoder feeding songbird.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub ffmpeg: String,
    pub reconnect: bool,
    pub reconnect_max_retries: u32,
    pub reconnect_delay_max_secs: u32,
    /// Fixed gain applied inside ffmpeg, before the runtime volume.
    pub base_gain: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            reconnect: true,
            reconnect_max_retries: 5,
            reconnect_delay_max_secs: 5,
            base_gain: 0.25,
        }
    }
}

impl OutputConfig {
    /// Full ffmpeg argument list for one stream, producing raw f32 stereo PCM on stdout.
    pub fn ffmpeg_args(&self, stream_url: &str) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
        if self.reconnect {
            args.extend([
                "-reconnect".into(),
                "1".into(),
                "-reconnect_streamed".into(),
                "1".into(),
                "-reconnect_max_retries".into(),
                self.reconnect_max_retries.to_string(),
                "-reconnect_delay_max".into(),
                self.reconnect_delay_max_secs.to_string(),
            ]);
        }
        args.extend([
            "-i".into(),
            stream_url.to_string(),
            "-vn".into(),
            "-filter:a".into(),
            format!("volume={}", self.base_gain),
            "-f".into(),
            "f32le".into(),
            "-ar".into(),
            "48000".into(),
            "-ac".into(),
            "2".into(),
            "pipe:1".into(),
        ]);
        args
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub command_prefix: String,
    pub player: PlayerConfig,
    pub resolver: ResolverConfig,
    pub output: OutputConfig,
}

impl BotConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            command_prefix: "!".to_string(),
            player: PlayerConfig::default(),
            resolver: ResolverConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Rejects configs the bot cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        let token = self.token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(Error::Config(
                "DISCORD_TOKEN is unset or still the placeholder value".into(),
            ));
        }
        if self.command_prefix.is_empty() || self.command_prefix.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!(
                "invalid command prefix '{}'",
                self.command_prefix
            )));
        }
        if !(0.0..=1.0).contains(&self.player.default_volume) {
            return Err(Error::Config(format!(
                "default volume {} is outside 0.0..=1.0",
                self.player.default_volume
            )));
        }
        if self.player.idle_timeout.is_zero() {
            return Err(Error::Config("idle timeout must be non-zero".into()));
        }
        if self.player.idle_timeout > MAX_IDLE_TIMEOUT {
            return Err(Error::Config(format!(
                "idle timeout {:?} exceeds the maximum of {:?}",
                self.player.idle_timeout, MAX_IDLE_TIMEOUT
            )));
        }
        if self.player.max_consecutive_failures == 0 {
            return Err(Error::Config("max consecutive failures must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_missing_token() {
        assert!(BotConfig::new("").validate().is_err());
        assert!(BotConfig::new("   ").validate().is_err());
        assert!(BotConfig::new(PLACEHOLDER_TOKEN).validate().is_err());
        assert!(BotConfig::new("abc.def.ghi").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_volume_and_prefix() {
        let mut cfg = BotConfig::new("abc.def.ghi");
        cfg.player.default_volume = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = BotConfig::new("abc.def.ghi");
        cfg.command_prefix = "! ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_idle_timeout() {
        let mut cfg = BotConfig::new("abc.def.ghi");
        cfg.player.idle_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());

        cfg.player.idle_timeout = MAX_IDLE_TIMEOUT;
        assert!(cfg.validate().is_ok());

        cfg.player.idle_timeout = Duration::from_secs(u64::MAX);
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_ffmpeg_args_include_reconnect_and_audio_only() {
        let cfg = OutputConfig::default();
        let args = cfg.ffmpeg_args("https://cdn.example/stream");
        let joined = args.join(" ");
        assert!(joined.contains("-reconnect 1 -reconnect_streamed 1"));
        assert!(joined.contains("-reconnect_max_retries 5"));
        assert!(joined.contains("-reconnect_delay_max 5"));
        assert!(joined.contains("-i https://cdn.example/stream -vn"));
        assert!(joined.ends_with("pipe:1"));

        let no_reconnect = OutputConfig { reconnect: false, ..OutputConfig::default() };
        assert!(!no_reconnect.ffmpeg_args("x").iter().any(|a| a == "-reconnect"));
    }
}
