pub mod presence;
pub mod runtime;
pub mod voice;

pub use presence::CachePresence;
pub use runtime::DiscordPlatform;
pub use voice::SongbirdOutput;
