use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use tunebot_core::config::{BotConfig, OutputConfig, PlayerConfig, ResolverConfig};
use tunebot_core::platforms::discord::DiscordPlatform;
use tunebot_core::platforms::PlatformIntegration;

#[derive(Parser, Debug, Clone)]
#[command(name = "tunebot")]
#[command(author, version, about = "TuneBot - Discord music bot")]
struct Args {
    /// Discord bot token.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true, default_value = "")]
    token: String,

    /// Prefix for chat commands.
    #[arg(long, env = "TUNEBOT_PREFIX", default_value = "!")]
    prefix: String,

    /// Volume new sessions start at, 0.0 to 1.0.
    #[arg(long, env = "TUNEBOT_DEFAULT_VOLUME", default_value_t = 0.5)]
    default_volume: f32,

    /// Seconds of silence (or of an empty channel) before leaving voice.
    #[arg(long, env = "TUNEBOT_IDLE_TIMEOUT_SECS", default_value_t = 300)]
    idle_timeout_secs: u64,

    /// Failed tracks in a row before playback gives up.
    #[arg(long, env = "TUNEBOT_MAX_FAILURES", default_value_t = 5)]
    max_failures: u32,

    #[arg(long, env = "TUNEBOT_YTDLP", default_value = "yt-dlp")]
    ytdlp: String,

    #[arg(long, env = "TUNEBOT_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: String,

    /// Seconds a single yt-dlp lookup may take.
    #[arg(long, env = "TUNEBOT_RESOLVE_TIMEOUT_SECS", default_value_t = 30)]
    resolve_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> BotConfig {
        BotConfig {
            token: self.token,
            command_prefix: self.prefix,
            player: PlayerConfig {
                default_volume: self.default_volume,
                idle_timeout: Duration::from_secs(self.idle_timeout_secs),
                max_consecutive_failures: self.max_failures,
            },
            resolver: ResolverConfig {
                binary: self.ytdlp,
                timeout: Duration::from_secs(self.resolve_timeout_secs),
                ..ResolverConfig::default()
            },
            output: OutputConfig {
                ffmpeg: self.ffmpeg,
                ..OutputConfig::default()
            },
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_log::LogTracer::init().context("Failed to bridge log records")?;
    let filter = EnvFilter::from_default_env()
        .add_directive("tunebot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).context("Failed to set global subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenv::dotenv();
    init_tracing()?;

    let config = Args::parse().into_config();
    if let Err(e) = config.validate() {
        error!("Refusing to start: {e}");
        return Err(e.into());
    }
    info!(
        "TuneBot starting. prefix='{}', idle_timeout={:?}",
        config.command_prefix, config.player.idle_timeout
    );

    let mut platform = DiscordPlatform::new(config);
    platform.connect().await.context("Discord connect failed")?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {:?}", e);
    }
    info!("Ctrl-C received, leaving voice channels...");

    platform.disconnect().await.context("Discord disconnect failed")?;
    info!("Main finished. Goodbye!");
    Ok(())
}
