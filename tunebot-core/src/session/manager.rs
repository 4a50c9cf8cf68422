// File: tunebot-core/src/session/manager.rs

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, info, warn};

use tunebot_common::models::SessionNotice;
use tunebot_common::traits::resolver_traits::TrackResolver;
use tunebot_common::traits::voice_traits::{VoiceOutput, VoicePresence};

use crate::config::PlayerConfig;
use crate::session::actor::{SessionActor, SessionDeps};
use crate::session::handle::SessionHandle;

/// Owns the per-guild sessions. Sessions are created on first use and remove
/// themselves from the map when their task ends.
pub struct SessionManager {
    sessions: Arc<DashMap<u64, SessionHandle>>,
    config: PlayerConfig,
    deps: SessionDeps,
}

impl SessionManager {
    pub fn new(
        config: PlayerConfig,
        resolver: Arc<dyn TrackResolver>,
        output: Arc<dyn VoiceOutput>,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            config,
            deps: SessionDeps { resolver, output, presence: None, notices: None },
        }
    }

    pub fn with_presence(mut self, presence: Arc<dyn VoicePresence>) -> Self {
        self.deps.presence = Some(presence);
        self
    }

    pub fn with_notices(mut self, notices: UnboundedSender<SessionNotice>) -> Self {
        self.deps.notices = Some(notices);
        self
    }

    pub fn resolver(&self) -> Arc<dyn TrackResolver> {
        Arc::clone(&self.deps.resolver)
    }

    /// The live session for a guild, if there is one.
    pub fn get(&self, guild_id: u64) -> Option<SessionHandle> {
        self.sessions
            .get(&guild_id)
            .map(|h| h.clone())
            .filter(|h| !h.is_closed())
    }

    pub fn get_or_create(&self, guild_id: u64) -> SessionHandle {
        let mut entry = self
            .sessions
            .entry(guild_id)
            .or_insert_with(|| self.spawn_session(guild_id));
        if entry.is_closed() {
            debug!("(SessionManager) replacing closed session for guild {guild_id}");
            *entry = self.spawn_session(guild_id);
        }
        entry.clone()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.iter().filter(|h| !h.is_closed()).count()
    }

    /// Re-reads the listener count for a guild and forwards it to its session.
    pub fn refresh_listeners(&self, guild_id: u64) {
        let Some(handle) = self.get(guild_id) else {
            return;
        };
        if let Some(count) = self.deps.presence.as_ref().and_then(|p| p.listener_count(guild_id)) {
            handle.listeners_changed(count);
        }
    }

    /// Leaves voice in every guild. Used on shutdown.
    pub async fn shutdown_all(&self) {
        let handles: Vec<SessionHandle> = self
            .sessions
            .iter()
            .map(|h| h.clone())
            .filter(|h| !h.is_closed())
            .collect();
        for handle in handles {
            if let Err(e) = handle.leave().await {
                warn!("(SessionManager) leave on shutdown failed for guild {} => {e}", handle.guild_id());
            }
        }
    }

    fn spawn_session(&self, guild_id: u64) -> SessionHandle {
        let (tx, rx) = unbounded_channel();
        let actor = SessionActor::new(guild_id, self.config.clone(), self.deps.clone(), tx.clone(), rx);
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            actor.run().await;
            sessions.remove_if(&guild_id, |_, h| h.is_closed());
        });
        info!("(SessionManager) created session for guild {guild_id}");
        SessionHandle::new(guild_id, tx)
    }
}
