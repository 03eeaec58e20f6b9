//! Error types for credential acquisition.

use crate::config::ConfigError;
use std::fmt;
use thiserror::Error;

/// The kinds of credential source a chain can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Environment,
    AzureCli,
    ManagedIdentity,
    InteractiveBrowser,
    DeviceCode,
    Chained,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Environment => "environment",
            Self::AzureCli => "azure-cli",
            Self::ManagedIdentity => "managed-identity",
            Self::InteractiveBrowser => "interactive-browser",
            Self::DeviceCode => "device-code",
            Self::Chained => "chained",
        };
        f.write_str(name)
    }
}

/// One source's failure inside a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub kind: CredentialKind,
    pub message: String,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Errors that can occur while building or using credentials.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The source is not usable in this environment (missing tool, missing
    /// configuration, unreachable endpoint).
    #[error("{kind} credential unavailable: {message}")]
    Unavailable { kind: CredentialKind, message: String },

    /// The identity provider rejected the request.
    #[error("{kind} authentication failed: {message}")]
    AuthenticationFailed { kind: CredentialKind, message: String },

    /// The user did not complete an interactive sign-in in time.
    #[error("{kind} sign-in was not completed: {message}")]
    SignInIncomplete { kind: CredentialKind, message: String },

    /// The chain was built with no sources at all.
    #[error("no credential sources are configured")]
    NoSources,

    /// Every source in the chain failed.
    #[error("all credential sources failed: {}", format_failures(.failures))]
    Exhausted { failures: Vec<SourceFailure> },

    /// The authentication record could not be written.
    #[error("failed to persist authentication record: {0}")]
    Persistence(#[from] ConfigError),
}

fn format_failures(failures: &[SourceFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl CredentialError {
    pub fn unavailable(kind: CredentialKind, message: impl Into<String>) -> Self {
        Self::Unavailable { kind, message: message.into() }
    }

    pub fn authentication_failed(kind: CredentialKind, message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { kind, message: message.into() }
    }

    pub fn sign_in_incomplete(kind: CredentialKind, message: impl Into<String>) -> Self {
        Self::SignInIncomplete { kind, message: message.into() }
    }
}
