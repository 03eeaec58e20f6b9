//! Error types for secret generation and resolution.

use crate::vault::VaultError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by the constrained generator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Secrets must be at least one character long.
    #[error("Secret length must be at least 1")]
    InvalidLength,

    /// No character class is enabled, or the custom charset is empty.
    #[error("No characters available to generate from")]
    EmptyAlphabet,

    /// The policy can never be met, whatever is drawn.
    #[error("Policy cannot be satisfied: {reason}")]
    Unsatisfiable { reason: String },

    /// Every draw was rejected by the class checks.
    #[error("No value satisfying the policy after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl GenerationError {
    pub fn unsatisfiable(reason: impl Into<String>) -> Self {
        Self::Unsatisfiable { reason: reason.into() }
    }
}

/// Errors produced by the resolve workflow.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The secret is expired and not tagged for rotation.
    #[error("Secret '{key}' expired at {expired_at}")]
    SecretExpired { key: String, expired_at: DateTime<Utc> },

    /// Fetching the secret failed for a reason other than absence.
    #[error("Failed to fetch secret: {0}")]
    SecretFetchFailed(#[source] VaultError),

    /// No value could be generated.
    #[error("Failed to generate {} value: {source}", value_kind(.rotation))]
    SecretGenerateFailed {
        rotation: bool,
        #[source]
        source: GenerationError,
    },

    /// The generated value could not be stored.
    #[error("Failed to store secret: {0}")]
    SecretSetFailed(#[source] VaultError),
}

fn value_kind(rotation: &bool) -> &'static str {
    if *rotation {
        "rotated"
    } else {
        "new"
    }
}

impl ResolveError {
    pub fn generate_failed(rotation: bool, source: GenerationError) -> Self {
        Self::SecretGenerateFailed { rotation, source }
    }
}
