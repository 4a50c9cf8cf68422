// File: tunebot-core/src/services/command_service.rs

use std::sync::Arc;

use tracing::{debug, error, info};

use tunebot_common::error::Error;
use tunebot_common::models::{PlaybackState, Requester, SessionSnapshot};

use crate::session::{ConnectOutcome, SessionManager};
use crate::services::commands::{parse_command, CommandParseError, MusicCommand};
use crate::services::replies::{self, CommandReply};

/// Who sent a command, and from where.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    /// Voice channel the author is sitting in, if any.
    pub author_voice_channel: Option<u64>,
}

impl CommandContext {
    fn requester(&self) -> Requester {
        Requester::new(self.author_id, self.author_name.clone())
    }
}

/// Turns parsed music commands into session operations and user replies.
pub struct CommandService {
    sessions: Arc<SessionManager>,
    prefix: String,
    default_volume: f32,
}

impl CommandService {
    pub fn new(sessions: Arc<SessionManager>, prefix: impl Into<String>, default_volume: f32) -> Self {
        let prefix = prefix.into();
        debug!("Initializing CommandService with prefix '{prefix}'");
        Self { sessions, prefix, default_volume }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Processes one chat line. `None` means the line was not a command.
    pub async fn handle_message(&self, ctx: &CommandContext, text: &str) -> Option<CommandReply> {
        let parsed = parse_command(&self.prefix, text)?;
        Some(self.handle(ctx, parsed).await)
    }

    pub async fn handle(
        &self,
        ctx: &CommandContext,
        parsed: Result<MusicCommand, CommandParseError>,
    ) -> CommandReply {
        let cmd = match parsed {
            Ok(cmd) => cmd,
            Err(e) => {
                debug!("(CommandService) rejected command in guild {} => {e}", ctx.guild_id);
                return CommandReply::text(self.parse_error_text(&e));
            }
        };

        debug!("(CommandService) guild {} <= {:?}", ctx.guild_id, cmd);
        match self.execute(ctx, cmd).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("(CommandService) command failed in guild {} => {e}", ctx.guild_id);
                CommandReply::text("❌ An error occurred while executing the command.")
            }
        }
    }

    fn parse_error_text(&self, e: &CommandParseError) -> String {
        let p = &self.prefix;
        match e {
            CommandParseError::Unknown(_) => {
                format!("❌ Unknown command. Use `{p}musichelp` for available commands.")
            }
            CommandParseError::MissingArgument(_) => {
                format!("❌ Missing required argument. Use `{p}musichelp` for command usage.")
            }
            CommandParseError::BadArgument(_) => {
                format!("❌ Invalid argument provided. Use `{p}musichelp` for command usage.")
            }
        }
    }

    async fn execute(&self, ctx: &CommandContext, cmd: MusicCommand) -> Result<CommandReply, Error> {
        match cmd {
            MusicCommand::Play(query) => self.play(ctx, &query).await,
            MusicCommand::Join => self.join(ctx).await,
            MusicCommand::Leave => self.leave(ctx).await,
            MusicCommand::Pause => self.simple(ctx, SimpleOp::Pause).await,
            MusicCommand::Resume => self.simple(ctx, SimpleOp::Resume).await,
            MusicCommand::Stop => self.simple(ctx, SimpleOp::Stop).await,
            MusicCommand::Skip => self.simple(ctx, SimpleOp::Skip).await,
            MusicCommand::Volume(percent) => self.volume(ctx, percent).await,
            MusicCommand::Queue => {
                let snapshot = self.snapshot_or_empty(ctx.guild_id).await?;
                Ok(replies::queue(&snapshot).into())
            }
            MusicCommand::NowPlaying => {
                let snapshot = self.snapshot_or_empty(ctx.guild_id).await?;
                Ok(match (&snapshot.current, snapshot.is_playing()) {
                    (Some(track), true) => replies::now_playing(&snapshot, track).into(),
                    _ => CommandReply::text(NOTHING_PLAYING),
                })
            }
            MusicCommand::Clear => {
                if let Some(handle) = self.sessions.get(ctx.guild_id) {
                    let removed = handle.clear_queue().await?;
                    debug!("(CommandService) cleared {removed} tracks in guild {}", ctx.guild_id);
                }
                Ok(CommandReply::text("🗑️ Queue cleared!"))
            }
            MusicCommand::Help => Ok(replies::help(&self.prefix).into()),
        }
    }

    async fn play(&self, ctx: &CommandContext, query: &str) -> Result<CommandReply, Error> {
        let Some(voice_channel) = ctx.author_voice_channel else {
            return Ok(CommandReply::text("❌ You need to be in a voice channel to play music!"));
        };

        let handle = self.sessions.get_or_create(ctx.guild_id);
        let joined = if handle.snapshot().await?.is_connected() {
            None
        } else {
            handle.connect(voice_channel).await?;
            Some(format!("✅ Joined <#{voice_channel}>"))
        };

        let track = match self.sessions.resolver().resolve(query).await {
            Ok(track) => track.with_requester(ctx.requester()),
            Err(e) => {
                info!("(CommandService) could not resolve '{query}' => {e}");
                let reply = CommandReply::text(format!(
                    "❌ Could not find or load the requested song! {}\n\n\
                     Try searching for a different song or using a different YouTube video.",
                    e.user_hint()
                ));
                return Ok(match joined {
                    Some(line) => reply.with_content(line),
                    None => reply,
                });
            }
        };

        let embed_track = track.clone();
        let position = handle.enqueue(track).await?;
        handle.start().await?;
        let reply = CommandReply::from(replies::song_added(&embed_track, position));
        Ok(match joined {
            Some(line) => reply.with_content(line),
            None => reply,
        })
    }

    async fn join(&self, ctx: &CommandContext) -> Result<CommandReply, Error> {
        let Some(voice_channel) = ctx.author_voice_channel else {
            return Ok(CommandReply::text(
                "❌ You need to be in a voice channel to use this command!",
            ));
        };
        let handle = self.sessions.get_or_create(ctx.guild_id);
        Ok(CommandReply::text(match handle.connect(voice_channel).await? {
            ConnectOutcome::Moved => format!("🔄 Moved to <#{voice_channel}>"),
            ConnectOutcome::Joined | ConnectOutcome::AlreadyConnected => {
                format!("✅ Joined <#{voice_channel}>")
            }
        }))
    }

    async fn leave(&self, ctx: &CommandContext) -> Result<CommandReply, Error> {
        let was_connected = match self.sessions.get(ctx.guild_id) {
            Some(handle) => handle.leave().await?,
            None => false,
        };
        Ok(CommandReply::text(if was_connected {
            "👋 Disconnected from voice channel!"
        } else {
            "❌ Bot is not connected to a voice channel!"
        }))
    }

    async fn volume(&self, ctx: &CommandContext, percent: i64) -> Result<CommandReply, Error> {
        if !(0..=100).contains(&percent) {
            return Ok(CommandReply::text("❌ Volume must be between 0 and 100!"));
        }
        let handle = self.sessions.get_or_create(ctx.guild_id);
        Ok(CommandReply::text(if handle.set_volume(percent as f32 / 100.0).await? {
            format!("🔊 Volume set to {percent}%!")
        } else {
            "❌ Could not set volume!".to_string()
        }))
    }

    /// Runs a guarded transition on the guild's session, if it has one. A
    /// missing session counts as a rejection.
    async fn simple(&self, ctx: &CommandContext, op: SimpleOp) -> Result<CommandReply, Error> {
        let accepted = match self.sessions.get(ctx.guild_id) {
            Some(handle) => match op {
                SimpleOp::Pause => handle.pause().await?,
                SimpleOp::Resume => handle.resume().await?,
                SimpleOp::Stop => handle.stop().await?,
                SimpleOp::Skip => handle.skip().await?,
            },
            None => false,
        };
        let (ok, rejected) = match op {
            SimpleOp::Pause => ("⏸️ Music paused!", NOTHING_PLAYING),
            SimpleOp::Resume => ("▶️ Music resumed!", "❌ Music is not paused!"),
            SimpleOp::Stop => ("⏹️ Music stopped and queue cleared!", NOTHING_PLAYING),
            SimpleOp::Skip => ("⏭️ Song skipped!", NOTHING_PLAYING),
        };
        Ok(CommandReply::text(if accepted { ok } else { rejected }))
    }

    async fn snapshot_or_empty(&self, guild_id: u64) -> Result<SessionSnapshot, Error> {
        match self.sessions.get(guild_id) {
            Some(handle) => handle.snapshot().await,
            None => Ok(SessionSnapshot {
                guild_id,
                state: PlaybackState::Idle,
                current: None,
                queue: Vec::new(),
                volume: self.default_volume,
                channel_id: None,
            }),
        }
    }
}

const NOTHING_PLAYING: &str = "❌ Nothing is currently playing!";

#[derive(Debug, Clone, Copy)]
enum SimpleOp {
    Pause,
    Resume,
    Stop,
    Skip,
}
