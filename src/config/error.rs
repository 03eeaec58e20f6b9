//! Error types for local configuration handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while reading or writing local configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither an override nor a platform configuration directory exists.
    #[error("unable to determine a configuration directory")]
    NoConfigDir,

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// Name passed to `config set/get/rm` is not a known setting.
    #[error("configuration key is not valid: {name}")]
    UnknownName { name: String },

    /// Setting is absent from the overlay file.
    #[error("configuration value '{name}' is not set")]
    NotFound { name: String },

    /// The OS secret store is compiled out or has no backend on this host.
    #[error("OS secret store unavailable: {message}")]
    SecretStoreUnavailable { message: String },

    /// The OS secret store rejected an operation.
    #[error("OS secret store error: {message}")]
    SecretStore { message: String },
}

impl ConfigError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read { path: path.into(), source }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse { path: path.into(), message: message.into() }
    }

    pub fn unknown_name(name: impl Into<String>) -> Self {
        Self::UnknownName { name: name.into() }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn secret_store(message: impl Into<String>) -> Self {
        Self::SecretStore { message: message.into() }
    }

    pub fn secret_store_unavailable(message: impl Into<String>) -> Self {
        Self::SecretStoreUnavailable { message: message.into() }
    }
}
