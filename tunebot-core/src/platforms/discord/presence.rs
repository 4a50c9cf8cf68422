use std::sync::Arc;

use twilight_cache_inmemory::DefaultInMemoryCache;
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;

use tunebot_common::traits::voice_traits::VoicePresence;

/// Answers voice-membership questions from the gateway's in-memory cache.
pub struct CachePresence {
    cache: Arc<DefaultInMemoryCache>,
    bot_user_id: Id<UserMarker>,
}

impl CachePresence {
    pub fn new(cache: Arc<DefaultInMemoryCache>, bot_user_id: Id<UserMarker>) -> Self {
        Self { cache, bot_user_id }
    }

    fn is_bot(&self, user_id: Id<UserMarker>) -> bool {
        user_id == self.bot_user_id
            || self.cache.user(user_id).map(|u| u.bot).unwrap_or(false)
    }
}

impl VoicePresence for CachePresence {
    fn listener_count(&self, guild_id: u64) -> Option<usize> {
        let guild_id = Id::<GuildMarker>::new_checked(guild_id)?;
        let channel_id = self.cache.voice_state(self.bot_user_id, guild_id)?.channel_id();
        let states = self.cache.voice_channel_states(channel_id)?;
        Some(states.filter(|state| !self.is_bot(state.user_id())).count())
    }

    fn user_channel(&self, guild_id: u64, user_id: u64) -> Option<u64> {
        let guild_id = Id::<GuildMarker>::new_checked(guild_id)?;
        let user_id = Id::<UserMarker>::new_checked(user_id)?;
        self.cache
            .voice_state(user_id, guild_id)
            .map(|state| state.channel_id().get())
    }
}
