// File: tunebot-core/src/services/commands.rs
//
// Prefix-command parsing. Knows nothing about sessions or Discord.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicCommand {
    Play(String),
    Pause,
    Resume,
    Stop,
    Skip,
    Queue,
    /// Raw percentage as typed; range checking happens when it is applied.
    Volume(i64),
    NowPlaying,
    Clear,
    Join,
    Leave,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("missing argument <{0}>")]
    MissingArgument(&'static str),

    #[error("invalid argument '{0}'")]
    BadArgument(String),
}

/// `(usage, description)` for every command, in help order.
pub const COMMAND_HELP: &[(&str, &str)] = &[
    ("play <song/url>", "Play a song from YouTube"),
    ("pause", "Pause the current song"),
    ("resume", "Resume the paused song"),
    ("stop", "Stop music and clear queue"),
    ("skip", "Skip the current song"),
    ("queue", "Show the current queue"),
    ("volume <0-100>", "Set the volume"),
    ("nowplaying", "Show current song info"),
    ("clear", "Clear the queue"),
    ("join", "Join your voice channel"),
    ("leave", "Leave the voice channel"),
];

/// `None` if `text` is not addressed to the bot at all.
pub fn parse_command(prefix: &str, text: &str) -> Option<Result<MusicCommand, CommandParseError>> {
    let body = text.trim_start().strip_prefix(prefix)?;
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    let cmd = match name.to_lowercase().as_str() {
        "play" | "p" => {
            if rest.is_empty() {
                return Some(Err(CommandParseError::MissingArgument("query")));
            }
            MusicCommand::Play(rest.to_string())
        }
        "pause" => MusicCommand::Pause,
        "resume" | "unpause" => MusicCommand::Resume,
        "stop" => MusicCommand::Stop,
        "skip" | "next" => MusicCommand::Skip,
        "queue" | "q" => MusicCommand::Queue,
        "volume" | "vol" => {
            let Some(arg) = rest.split_whitespace().next() else {
                return Some(Err(CommandParseError::MissingArgument("volume")));
            };
            match arg.parse::<i64>() {
                Ok(v) => MusicCommand::Volume(v),
                Err(_) => return Some(Err(CommandParseError::BadArgument(arg.to_string()))),
            }
        }
        "nowplaying" | "np" => MusicCommand::NowPlaying,
        "clear" => MusicCommand::Clear,
        "join" | "connect" => MusicCommand::Join,
        "leave" | "disconnect" => MusicCommand::Leave,
        "help" | "musichelp" | "commands" => MusicCommand::Help,
        other => return Some(Err(CommandParseError::Unknown(other.to_string()))),
    };
    Some(Ok(cmd))
}
