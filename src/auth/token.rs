//! Access tokens and the provider trait every credential source implements.

use super::error::{CredentialError, CredentialKind};
use crate::secrets::SecretString;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECONDS: i64 = 120;

/// A bearer token and its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<SecretString>, expires_on: DateTime<Utc>) -> Self {
        Self { token: token.into(), expires_on }
    }

    /// Whether the token can still be sent at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECONDS) < self.expires_on
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

/// A source of access tokens.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log token values
/// - Errors carry identity provider messages, never request secrets
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Which kind of source this is.
    fn kind(&self) -> CredentialKind;

    /// Acquires a token for `scopes`.
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError>;
}

/// Cache key for a scope set.
pub(crate) fn scope_key(scopes: &[&str]) -> String {
    scopes.join(" ")
}

/// Resource URI for a `/.default` scope, as the managed identity and Azure
/// CLI endpoints expect it.
pub(crate) fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}
