// File: src/platforms/mod.rs

use async_trait::async_trait;
use tunebot_common::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// A chat platform the bot can be attached to.
#[async_trait]
pub trait PlatformIntegration: Send {
    async fn connect(&mut self) -> Result<(), Error>;
    async fn disconnect(&mut self) -> Result<(), Error>;
    async fn send_message(&self, channel: u64, message: &str) -> Result<(), Error>;
    async fn get_connection_status(&self) -> Result<ConnectionStatus, Error>;
}

pub mod discord;
