//! Get-or-create workflow for a single secret.

use super::error::ResolveError;
use super::generator::{generate, GenerationPolicy};
use super::types::SecretString;
use crate::address::SecretAddress;
use crate::vault::{SecretVault, SetSecretParameters};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// How the returned value came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The stored value was current.
    Existing,
    /// The secret did not exist and was created.
    Created,
    /// The secret was expired, tagged for rotation and replaced.
    Rotated,
}

#[derive(Debug, Clone)]
pub struct ResolvedSecret {
    pub value: SecretString,
    pub version: Option<String>,
    pub outcome: ResolveOutcome,
}

/// Fetches a secret and creates or rotates it when needed.
///
/// | fetch result                          | action                     |
/// |---------------------------------------|----------------------------|
/// | found, not expired                    | return it                  |
/// | found, expired, `auto-rotate=true`    | generate, store, return    |
/// | found, expired, otherwise             | `SecretExpired`            |
/// | `SecretNotFound`                      | generate, store, return    |
/// | any other error                       | `SecretFetchFailed`        |
pub struct SecretResolver<V> {
    vault: V,
}

impl<V: SecretVault> SecretResolver<V> {
    pub fn new(vault: V) -> Self {
        Self { vault }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub async fn resolve(
        &self,
        address: &SecretAddress,
        policy: &GenerationPolicy,
    ) -> Result<ResolvedSecret, ResolveError> {
        self.resolve_at(address, policy, Utc::now()).await
    }

    /// [`resolve`](Self::resolve) with an explicit notion of "now".
    pub async fn resolve_at(
        &self,
        address: &SecretAddress,
        policy: &GenerationPolicy,
        now: DateTime<Utc>,
    ) -> Result<ResolvedSecret, ResolveError> {
        let key = address.key.as_str();

        let rotation = match self.vault.get_secret(key, address.version.as_deref()).await {
            Ok(record) => match record.expires_at {
                Some(expired_at) if record.is_expired_at(now) => {
                    if !record.auto_rotate() {
                        warn!(key = %key, expired_at = %expired_at, "Secret expired and is not tagged for rotation");
                        return Err(ResolveError::SecretExpired { key: key.to_string(), expired_at });
                    }
                    info!(key = %key, expired_at = %expired_at, "Secret expired; rotating");
                    true
                }
                _ => {
                    debug!(key = %key, version = ?record.version, "Secret is current");
                    return Ok(ResolvedSecret {
                        value: record.value,
                        version: record.version,
                        outcome: ResolveOutcome::Existing,
                    });
                }
            },
            Err(err) if err.is_not_found() => {
                info!(key = %key, "Secret not found; creating a generated value");
                false
            }
            Err(err) => return Err(ResolveError::SecretFetchFailed(err)),
        };

        let value = generate(policy).map_err(|err| ResolveError::generate_failed(rotation, err))?;

        let record = self
            .vault
            .set_secret(key, &SetSecretParameters::value(value.clone()))
            .await
            .map_err(ResolveError::SecretSetFailed)?;

        let outcome = if rotation { ResolveOutcome::Rotated } else { ResolveOutcome::Created };
        Ok(ResolvedSecret { value, version: record.version, outcome })
    }
}
