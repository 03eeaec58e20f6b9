//! Ordered fallback over several credential sources.

use super::error::{CredentialError, CredentialKind, SourceFailure};
use super::token::{scope_key, AccessToken, TokenProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Tries each source in order until one yields a token.
///
/// The first source to succeed is remembered and used exclusively for the
/// rest of the process, so sources that failed are not retried. Tokens are
/// cached per scope set until shortly before they expire.
pub struct ChainedCredential {
    sources: Vec<Arc<dyn TokenProvider>>,
    selected: Mutex<Option<usize>>,
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl std::fmt::Debug for ChainedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedCredential").field("sources", &self.kinds()).finish()
    }
}

impl ChainedCredential {
    /// Fails with [`CredentialError::NoSources`] when `sources` is empty.
    pub fn new(sources: Vec<Arc<dyn TokenProvider>>) -> Result<Self, CredentialError> {
        if sources.is_empty() {
            return Err(CredentialError::NoSources);
        }
        Ok(Self { sources, selected: Mutex::new(None), tokens: Mutex::new(HashMap::new()) })
    }

    /// Source kinds in chain order.
    pub fn kinds(&self) -> Vec<CredentialKind> {
        self.sources.iter().map(|source| source.kind()).collect()
    }

    /// Kind of the source that produced the first token, if any has.
    pub fn selected_kind(&self) -> Option<CredentialKind> {
        let selected = self.selected.lock().ok().and_then(|selected| *selected)?;
        self.sources.get(selected).map(|source| source.kind())
    }

    fn cached(&self, key: &str) -> Option<AccessToken> {
        let tokens = self.tokens.lock().ok()?;
        tokens.get(key).filter(|token| token.is_fresh()).cloned()
    }

    fn remember(&self, key: String, token: &AccessToken, index: usize) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(key, token.clone());
        }
        if let Ok(mut selected) = self.selected.lock() {
            selected.get_or_insert(index);
        }
    }
}

#[async_trait]
impl TokenProvider for ChainedCredential {
    fn kind(&self) -> CredentialKind {
        CredentialKind::Chained
    }

    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let key = scope_key(scopes);
        if let Some(token) = self.cached(&key) {
            return Ok(token);
        }

        let selected = self.selected.lock().ok().and_then(|selected| *selected);
        if let Some(index) = selected {
            let token = self.sources[index].get_token(scopes).await?;
            self.remember(key, &token, index);
            return Ok(token);
        }

        let mut failures = Vec::with_capacity(self.sources.len());
        for (index, source) in self.sources.iter().enumerate() {
            match source.get_token(scopes).await {
                Ok(token) => {
                    info!(source = %source.kind(), "Acquired access token");
                    self.remember(key, &token, index);
                    return Ok(token);
                }
                Err(err) => {
                    debug!(source = %source.kind(), error = %err, "Credential source failed");
                    failures.push(SourceFailure { kind: source.kind(), message: err.to_string() });
                }
            }
        }

        warn!(attempted = failures.len(), "All credential sources failed");
        Err(CredentialError::Exhausted { failures })
    }
}
