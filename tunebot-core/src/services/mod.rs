// File: src/services/mod.rs

pub mod command_service;
pub mod commands;
pub mod replies;

pub use command_service::{CommandContext, CommandService};
pub use commands::{parse_command, CommandParseError, MusicCommand};
pub use replies::CommandReply;
