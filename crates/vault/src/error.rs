//! Vault error types.

use std::time::Duration;

use common::AggregateError;
use event_store::EventStoreError;
use projections::RepositoryError;
use thiserror::Error;

/// Errors surfaced by the vault facades.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Appending or projecting an event failed.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Reading the read models failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A database connection could not be obtained.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The native clipboard failed.
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// A caller-supplied identifier is invalid.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] AggregateError),

    /// A collection the caller named does not exist.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// A collection with the name exists and suffixing was not requested.
    #[error("A collection named {0:?} already exists")]
    CollectionExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the native clipboard adapters.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// No clipboard mechanism exists on this system.
    #[error("No native clipboard is available")]
    Unavailable,

    /// The clipboard command did not finish in time.
    #[error("Clipboard command {program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The clipboard command exited unsuccessfully.
    #[error("Clipboard command {program} failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Clipboard I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The platform has no per-user config directory.
    #[error("Could not determine the user config directory")]
    NoConfigDir,

    /// An environment override holds an unusable value.
    #[error("Invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Errors reading or writing the device identity file.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
