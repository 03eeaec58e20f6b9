//! Error types for vault operations.

use crate::auth::CredentialError;
use thiserror::Error;

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Service error code the vault returns for a missing secret.
pub const SECRET_NOT_FOUND_CODE: &str = "SecretNotFound";

/// Errors that can occur while talking to the vault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The vault reported `SecretNotFound` for the key.
    #[error("Secret not found: {key}")]
    NotFound { key: String },

    /// Any other service error, including 404s with other codes.
    #[error("Vault returned {status} {code}: {message}")]
    Service { status: u16, code: String, message: String },

    /// No access token could be obtained.
    #[error("Authentication failed: {0}")]
    Credential(#[from] CredentialError),

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The response body was not what the API documents.
    #[error("Unexpected vault response: {0}")]
    Decode(String),

    /// A local precondition failed before any request was made.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl VaultError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn service(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service { status, code: code.into(), message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The vault answered 409 Conflict (e.g. a delete still in progress).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Service { status: 409, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_constructors() {
        let err = VaultError::not_found("db-password");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Secret not found: db-password");

        let err = VaultError::service(409, "Conflict", "Secret is currently being deleted.");
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }
}
