// src/lib.rs

pub mod config;
pub mod platforms;
pub mod resolver;
pub mod services;
pub mod session;
pub mod utils;

pub use tunebot_common::error::Error;
