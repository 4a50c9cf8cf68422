use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use songbird::shards::TwilightMap;
use songbird::Songbird;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{DefaultInMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway, CloseFrame, ConfigBuilder, Event, EventTypeFlags, Intents, MessageSender, Shard,
    StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::Client as HttpClient;
use twilight_model::gateway::payload::incoming::{MessageCreate, Ready as ReadyPayload};
use twilight_model::gateway::payload::outgoing::update_presence::UpdatePresencePayload;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;

use tunebot_common::error::Error;
use tunebot_common::models::SessionNotice;
use tunebot_common::traits::voice_traits::VoicePresence;

use crate::config::BotConfig;
use crate::platforms::discord::presence::CachePresence;
use crate::platforms::discord::voice::SongbirdOutput;
use crate::platforms::{ConnectionStatus, PlatformIntegration};
use crate::resolver::ytdlp::YtDlpResolver;
use crate::services::command_service::{CommandContext, CommandService};
use crate::services::commands::{parse_command, MusicCommand};
use crate::services::replies::{notice_text, CommandReply};
use crate::session::SessionManager;

/// Everything a shard runner needs to react to gateway events.
struct ShardState {
    http: Arc<HttpClient>,
    cache: Arc<DefaultInMemoryCache>,
    songbird: Arc<Songbird>,
    presence: Arc<CachePresence>,
    commands: Arc<CommandService>,
    /// Text channel that last issued a command, per guild.
    announce: Arc<DashMap<u64, u64>>,
}

/// Reads gateway events for one shard:
///   - keeps the in-memory cache and songbird up to date
///   - hands guild messages to the command service, one task per message
///   - forwards voice-state changes to the affected session
async fn shard_runner(mut shard: Shard, state: Arc<ShardState>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };

        state.cache.update(&event);
        state.songbird.process(&event).await;

        match &event {
            Event::Ready(ready) => {
                let data: &ReadyPayload = ready;
                info!(
                    "Shard {shard_id} => READY as {} (ID={}) in {} guilds",
                    data.user.name,
                    data.user.id,
                    data.guilds.len()
                );
            }
            Event::MessageCreate(msg_create) => {
                let msg: &MessageCreate = msg_create;
                if msg.author.bot {
                    continue;
                }
                let state = Arc::clone(&state);
                let msg = msg.clone();
                tokio::spawn(async move {
                    handle_message(state, msg).await;
                });
            }
            Event::VoiceStateUpdate(update) => {
                if let Some(guild_id) = update.guild_id {
                    trace!("Shard {shard_id} => voice state change in guild {guild_id}");
                    state.commands.sessions().refresh_listeners(guild_id.get());
                }
            }
            _ => {
                trace!("Shard {shard_id} => unhandled event: {:?}", event.kind());
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

async fn handle_message(state: Arc<ShardState>, msg: MessageCreate) {
    let Some(guild_id) = msg.guild_id else {
        return;
    };
    let Some(parsed) = parse_command(state.commands.prefix(), &msg.content) else {
        return;
    };

    let ctx = CommandContext {
        guild_id: guild_id.get(),
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        author_name: msg
            .author
            .global_name
            .clone()
            .unwrap_or_else(|| msg.author.name.clone()),
        author_voice_channel: state.presence.user_channel(guild_id.get(), msg.author.id.get()),
    };
    state.announce.insert(ctx.guild_id, ctx.channel_id);

    if matches!(parsed, Ok(MusicCommand::Play(_))) {
        if let Err(e) = state.http.create_typing_trigger(msg.channel_id).await {
            trace!("(Discord) typing trigger failed => {e}");
        }
    }

    let reply = state.commands.handle(&ctx, parsed).await;
    if let Err(e) = send_reply(&state.http, msg.channel_id, &reply).await {
        error!("(Discord) could not reply in channel {} => {e}", msg.channel_id);
    }
}

async fn send_reply(
    http: &HttpClient,
    channel_id: Id<ChannelMarker>,
    reply: &CommandReply,
) -> Result<(), Error> {
    let request = http.create_message(channel_id);
    let result = match reply {
        CommandReply::Text(text) => request.content(text).await,
        CommandReply::Embed { content, embed } => {
            let request = request.embeds(std::slice::from_ref(embed.as_ref()));
            match content {
                Some(line) => request.content(line).await,
                None => request.await,
            }
        }
    };
    result
        .map(|_| ())
        .map_err(|e| Error::Platform(format!("Error sending Discord message: {e}")))
}

/// Posts session notices to whichever channel last talked to the bot in that guild.
async fn notice_forwarder(
    mut rx: UnboundedReceiver<SessionNotice>,
    http: Arc<HttpClient>,
    announce: Arc<DashMap<u64, u64>>,
) {
    while let Some(notice) = rx.recv().await {
        let guild_id = notice.guild_id();
        let Some(channel) = announce.get(&guild_id).map(|c| *c) else {
            debug!("(Discord) no announce channel for guild {guild_id}, dropping {notice:?}");
            continue;
        };
        let Some(channel_id) = Id::<ChannelMarker>::new_checked(channel) else {
            continue;
        };
        let reply = CommandReply::Text(notice_text(&notice));
        if let Err(e) = send_reply(&http, channel_id, &reply).await {
            warn!("(Discord) notice for guild {guild_id} not delivered => {e}");
        }
    }
}

fn presence_payload(prefix: &str) -> Result<UpdatePresencePayload, Error> {
    let activity = MinimalActivity {
        kind: ActivityType::Listening,
        name: format!("{prefix}musichelp"),
        url: None,
    };
    UpdatePresencePayload::new(vec![activity.into()], false, None, Status::Online)
        .map_err(|e| Error::Platform(format!("invalid presence: {e}")))
}

/// The Discord side of the bot: gateway shards, HTTP client, cache and voice.
pub struct DiscordPlatform {
    config: BotConfig,
    connection_status: ConnectionStatus,

    shard_tasks: Vec<JoinHandle<()>>,
    shard_senders: Vec<MessageSender>,
    notice_task: Option<JoinHandle<()>>,

    http: Option<Arc<HttpClient>>,
    sessions: Option<Arc<SessionManager>>,
}

impl DiscordPlatform {
    pub fn new(config: BotConfig) -> Self {
        Self {
            config,
            connection_status: ConnectionStatus::Disconnected,
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
            notice_task: None,
            http: None,
            sessions: None,
        }
    }
}

#[async_trait]
impl PlatformIntegration for DiscordPlatform {
    async fn connect(&mut self) -> Result<(), Error> {
        if matches!(self.connection_status, ConnectionStatus::Connected) {
            info!("(DiscordPlatform) Already connected => skipping");
            return Ok(());
        }
        self.config.validate()?;

        let http_client = Arc::new(
            ClientBuilder::new()
                .token(self.config.token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        let bot_user_id = http_client
            .current_user()
            .await
            .map_err(|e| Error::Platform(format!("current_user error: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("current_user body error: {e}")))?
            .id;
        info!("(DiscordPlatform) Authenticated as user {bot_user_id}");

        let cache = Arc::new(
            DefaultInMemoryCache::builder()
                .resource_types(
                    ResourceType::GUILD
                        | ResourceType::CHANNEL
                        | ResourceType::VOICE_STATE
                        | ResourceType::USER
                        | ResourceType::MEMBER,
                )
                .build(),
        );

        let intents = Intents::GUILDS
            | Intents::GUILD_MESSAGES
            | Intents::MESSAGE_CONTENT
            | Intents::GUILD_VOICE_STATES;
        let config = ConfigBuilder::new(self.config.token.clone(), intents)
            .presence(presence_payload(&self.config.command_prefix)?)
            .build();

        let shards: Vec<Shard> = gateway::create_recommended(&http_client, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?
            .collect();

        let senders: HashMap<_, _> = shards
            .iter()
            .map(|shard| (shard.id().number().into(), shard.sender()))
            .collect();
        let songbird = Arc::new(Songbird::twilight(Arc::new(TwilightMap::new(senders)), bot_user_id));

        let presence = Arc::new(CachePresence::new(Arc::clone(&cache), bot_user_id));
        let output = Arc::new(SongbirdOutput::new(Arc::clone(&songbird), self.config.output.clone()));
        let resolver = Arc::new(YtDlpResolver::new(self.config.resolver.clone()));

        let (notice_tx, notice_rx) = unbounded_channel();
        let sessions = Arc::new(
            SessionManager::new(self.config.player.clone(), resolver, output)
                .with_presence(presence.clone())
                .with_notices(notice_tx),
        );
        let commands = Arc::new(CommandService::new(
            Arc::clone(&sessions),
            self.config.command_prefix.clone(),
            self.config.player.default_volume,
        ));

        let announce = Arc::new(DashMap::new());
        self.notice_task = Some(tokio::spawn(notice_forwarder(
            notice_rx,
            Arc::clone(&http_client),
            Arc::clone(&announce),
        )));

        let state = Arc::new(ShardState {
            http: Arc::clone(&http_client),
            cache,
            songbird,
            presence,
            commands,
            announce,
        });

        for shard in shards {
            self.shard_senders.push(shard.sender());
            let state_for_shard = Arc::clone(&state);
            self.shard_tasks
                .push(tokio::spawn(shard_runner(shard, state_for_shard)));
        }

        self.http = Some(http_client);
        self.sessions = Some(sessions);
        self.connection_status = ConnectionStatus::Connected;
        info!("(DiscordPlatform) Connected with {} shard(s)", self.shard_tasks.len());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        self.connection_status = ConnectionStatus::Disconnected;

        if let Some(sessions) = self.sessions.take() {
            sessions.shutdown_all().await;
        }

        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in &mut self.shard_tasks {
            let _ = task.await;
        }
        self.shard_senders.clear();
        self.shard_tasks.clear();

        if let Some(task) = self.notice_task.take() {
            task.abort();
        }
        self.http = None;
        info!("(DiscordPlatform) Disconnected");
        Ok(())
    }

    async fn send_message(&self, channel: u64, message: &str) -> Result<(), Error> {
        let channel_id = Id::<ChannelMarker>::new_checked(channel)
            .ok_or_else(|| Error::Platform(format!("Invalid channel ID: {channel}")))?;
        match &self.http {
            Some(http) => send_reply(http, channel_id, &CommandReply::text(message)).await,
            None => Err(Error::Platform("not connected".into())),
        }
    }

    async fn get_connection_status(&self) -> Result<ConnectionStatus, Error> {
        Ok(self.connection_status.clone())
    }
}
