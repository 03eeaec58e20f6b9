//! Common test utilities for the vault integration tests.
//!
//! Provides a fixed-token credential and a client pointed at a wiremock server.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrets_akv::auth::{AccessToken, CredentialError, CredentialKind, TokenProvider};
use secrets_akv::vault::KeyVaultClient;
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;
use wiremock::MockServer;

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_SCOPE: &str = "https://vault.azure.net/.default";

/// Always returns [`TEST_TOKEN`].
pub struct StaticToken;

#[async_trait]
impl TokenProvider for StaticToken {
    fn kind(&self) -> CredentialKind {
        CredentialKind::Environment
    }

    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        assert_eq!(scopes, [TEST_SCOPE]);
        Ok(AccessToken::new(TEST_TOKEN, Utc::now() + Duration::hours(1)))
    }
}

/// Client sending every request to `server`.
pub fn client_for(server: &MockServer) -> KeyVaultClient {
    let endpoint = Url::parse(&server.uri()).expect("mock server uri");
    KeyVaultClient::with_endpoint(endpoint, TEST_SCOPE, Arc::new(StaticToken), reqwest::Client::new())
}

/// Secret bundle body as the vault returns it.
pub fn bundle(server: &MockServer, key: &str, version: &str, value: &str) -> Value {
    json!({
        "value": value,
        "id": format!("{}/secrets/{}/{}", server.uri(), key, version),
        "attributes": { "enabled": true, "created": 1_700_000_000, "updated": 1_700_000_000 },
        "tags": {}
    })
}

/// Error body for a missing secret.
pub fn secret_not_found(key: &str) -> Value {
    json!({
        "error": {
            "code": "SecretNotFound",
            "message": format!("A secret with (name/id) {} was not found in this key vault.", key)
        }
    })
}
