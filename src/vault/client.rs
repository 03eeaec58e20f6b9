//! Key Vault secrets REST client.

use super::error::{Result, VaultError, SECRET_NOT_FOUND_CODE};
use super::models::{
    DeletedSecret, SecretProperties, SecretPropertiesUpdate, SecretRecord, SetSecretParameters,
    WireDeletedSecret, WireErrorBody, WireSecretBundle, WireSecretPage, WireSetSecret, WireUpdateSecret,
};
use crate::address::VaultHost;
use crate::auth::TokenProvider;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const API_VERSION: &str = "7.4";

/// Secret operations the CLI and the resolver need from a vault.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log secret values
/// - Network communication MUST use TLS
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Fetches a secret; the latest version when `version` is `None`.
    async fn get_secret(&self, key: &str, version: Option<&str>) -> Result<SecretRecord>;

    /// Creates a new version of a secret.
    async fn set_secret(&self, key: &str, params: &SetSecretParameters) -> Result<SecretRecord>;

    /// Changes attributes or tags of a version without a new value.
    async fn update_secret_properties(
        &self,
        key: &str,
        version: Option<&str>,
        update: &SecretPropertiesUpdate,
    ) -> Result<SecretRecord>;

    /// Every secret in the vault, following pagination.
    async fn list_secret_properties(&self) -> Result<Vec<SecretProperties>>;

    /// Soft-deletes a secret.
    async fn delete_secret(&self, key: &str) -> Result<DeletedSecret>;

    async fn get_deleted_secret(&self, key: &str) -> Result<DeletedSecret>;

    /// Permanently removes a soft-deleted secret.
    async fn purge_deleted_secret(&self, key: &str) -> Result<()>;
}

/// [`SecretVault`] over the Key Vault REST API.
pub struct KeyVaultClient {
    http: reqwest::Client,
    endpoint: Url,
    credential: Arc<dyn TokenProvider>,
    scope: String,
}

impl KeyVaultClient {
    /// Client for `https://<vault>` authenticating for the vault's cloud scope.
    pub fn new(
        vault: &VaultHost,
        credential: Arc<dyn TokenProvider>,
        http: reqwest::Client,
    ) -> std::result::Result<Self, VaultError> {
        let endpoint = Url::parse(&vault.url())
            .map_err(|err| VaultError::InvalidRequest(format!("vault URL: {}", err)))?;
        Ok(Self { http, endpoint, credential, scope: vault.scope() })
    }

    /// Client for an explicit endpoint, e.g. a local emulator or test server.
    pub fn with_endpoint(
        endpoint: Url,
        scope: impl Into<String>,
        credential: Arc<dyn TokenProvider>,
        http: reqwest::Client,
    ) -> Self {
        Self { http, endpoint, credential, scope: scope.into() }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| VaultError::InvalidRequest("vault URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.credential.get_token(&[self.scope.as_str()]).await?;
        Ok(self.http.request(method, url).bearer_auth(token.token.expose_secret()))
    }

    async fn send(&self, request: RequestBuilder, key: Option<&str>) -> Result<Response> {
        let response = request.send().await.map_err(|err| VaultError::Transport(err.to_string()))?;
        let status = response.status();
        debug!(status = %status, url = %response.url().path(), "Vault response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<WireErrorBody>(&body) {
            Ok(parsed) => (parsed.error.code, parsed.error.message),
            Err(_) => (String::new(), body),
        };

        if code == SECRET_NOT_FOUND_CODE {
            return Err(VaultError::not_found(key.unwrap_or_default()));
        }
        Err(VaultError::service(status.as_u16(), code, message))
    }

    async fn json<T: for<'de> serde::Deserialize<'de>>(response: Response) -> Result<T> {
        let body = response.text().await.map_err(|err| VaultError::Transport(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| VaultError::Decode(err.to_string()))
    }
}

#[async_trait]
impl SecretVault for KeyVaultClient {
    async fn get_secret(&self, key: &str, version: Option<&str>) -> Result<SecretRecord> {
        let url = self.url(&["secrets", key, version.unwrap_or_default()])?;
        let response = self.send(self.request(Method::GET, url).await?, Some(key)).await?;
        let bundle: WireSecretBundle = Self::json(response).await?;
        Ok(bundle.into_record(key))
    }

    async fn set_secret(&self, key: &str, params: &SetSecretParameters) -> Result<SecretRecord> {
        let url = self.url(&["secrets", key])?;
        let request = self.request(Method::PUT, url).await?.json(&WireSetSecret::from(params));
        let response = self.send(request, Some(key)).await?;
        let bundle: WireSecretBundle = Self::json(response).await?;
        let record = bundle.into_record(key);
        info!(key = %key, version = ?record.version, "Secret version created");
        Ok(record)
    }

    async fn update_secret_properties(
        &self,
        key: &str,
        version: Option<&str>,
        update: &SecretPropertiesUpdate,
    ) -> Result<SecretRecord> {
        let url = self.url(&["secrets", key, version.unwrap_or_default()])?;
        let request = self.request(Method::PATCH, url).await?.json(&WireUpdateSecret::from(update));
        let response = self.send(request, Some(key)).await?;
        let bundle: WireSecretBundle = Self::json(response).await?;
        Ok(bundle.into_record(key))
    }

    async fn list_secret_properties(&self) -> Result<Vec<SecretProperties>> {
        let mut next = Some(self.url(&["secrets"])?);
        let mut secrets = Vec::new();

        while let Some(url) = next.take() {
            let response = self.send(self.request(Method::GET, url).await?, None).await?;
            let page: WireSecretPage = Self::json(response).await?;
            secrets.extend(page.value.into_iter().map(SecretProperties::from));

            next = match page.next_link.filter(|link| !link.is_empty()) {
                Some(link) => {
                    Some(Url::parse(&link).map_err(|err| VaultError::Decode(format!("nextLink: {}", err)))?)
                }
                None => None,
            };
        }

        debug!(count = secrets.len(), "Listed secrets");
        Ok(secrets)
    }

    async fn delete_secret(&self, key: &str) -> Result<DeletedSecret> {
        let url = self.url(&["secrets", key])?;
        let response = self.send(self.request(Method::DELETE, url).await?, Some(key)).await?;
        let deleted: WireDeletedSecret = Self::json(response).await?;
        info!(key = %key, "Secret deleted");
        Ok(deleted.into_deleted(key))
    }

    async fn get_deleted_secret(&self, key: &str) -> Result<DeletedSecret> {
        let url = self.url(&["deletedsecrets", key])?;
        let response = self.send(self.request(Method::GET, url).await?, Some(key)).await?;
        let deleted: WireDeletedSecret = Self::json(response).await?;
        Ok(deleted.into_deleted(key))
    }

    async fn purge_deleted_secret(&self, key: &str) -> Result<()> {
        let url = self.url(&["deletedsecrets", key])?;
        self.send(self.request(Method::DELETE, url).await?, Some(key)).await?;
        info!(key = %key, "Deleted secret purged");
        Ok(())
    }
}

/// How long [`delete_and_purge`] waits for a deletion to settle.
#[derive(Debug, Clone, Copy)]
pub struct PurgeWait {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PurgeWait {
    fn default() -> Self {
        Self { attempts: 30, interval: Duration::from_secs(2) }
    }
}

/// Waits until a deleted secret is visible in the deleted list, then purges
/// it, retrying while the vault still reports a conflict.
pub async fn purge_when_deleted<V: SecretVault + ?Sized>(vault: &V, key: &str, wait: PurgeWait) -> Result<()> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match vault.get_deleted_secret(key).await {
            Ok(_) => vault.purge_deleted_secret(key).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => return Ok(()),
            Err(err) if (err.is_not_found() || err.is_conflict()) && attempt < wait.attempts => {
                debug!(key = %key, attempt = attempt, "Deletion still in progress; waiting to purge");
                tokio::time::sleep(wait.interval).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Soft-deletes a secret and then purges it.
pub async fn delete_and_purge<V: SecretVault + ?Sized>(vault: &V, key: &str, wait: PurgeWait) -> Result<()> {
    vault.delete_secret(key).await?;
    purge_when_deleted(vault, key, wait).await
}
