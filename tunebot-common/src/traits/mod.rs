pub mod resolver_traits;
pub mod voice_traits;
