//! Core library for the WiFi watch daemon.
//! This crate owns the watched-network registry and its edge-triggered
//! presence tracking, defines the collaborator traits (scanner, notifier,
//! permission gate, store), and provides backend implementations that the
//! daemon selects from configuration.

pub mod backends;
pub mod config;
pub mod factory;
pub mod monitor;
pub mod registry;
pub mod store;
pub mod traits;
pub mod web_server;

// Define a shared Error and Result type for the entire crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
