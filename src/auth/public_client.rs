//! Credentials that sign a user in: interactive browser and device code.
//!
//! Both flows share everything except how the user proves who they are, so
//! [`UserCredential`] owns the token state and delegates the sign-in itself
//! to a [`UserFlow`].

use super::error::{CredentialError, CredentialKind};
use super::oauth::{post_form, Authority, TokenResponse};
use super::record::AuthenticationRecord;
use super::token::{scope_key, AccessToken, TokenProvider};
use crate::config::LayeredEnvironment;
use crate::secrets::SecretString;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Public client id of the Azure development tools.
pub const DEVELOPER_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

/// Tenant that accepts any work or school account.
pub const DEFAULT_TENANT: &str = "organizations";

/// Scopes added to every user sign-in so the response carries an id token
/// and a refresh token.
const SIGN_IN_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// Identity platform coordinates of a public client application.
#[derive(Debug, Clone)]
pub struct PublicClient {
    pub http: reqwest::Client,
    pub authority: Authority,
    pub tenant_id: String,
    pub client_id: String,
}

impl PublicClient {
    /// Authority from `AZURE_AUTHORITY_HOST`, tenant from `AZURE_TENANT_ID`
    /// (default `organizations`), the developer tools client id.
    pub fn from_env(env: &LayeredEnvironment, http: reqwest::Client) -> Self {
        Self {
            http,
            authority: Authority::from_env(env),
            tenant_id: env.non_empty("AZURE_TENANT_ID").unwrap_or(DEFAULT_TENANT).to_string(),
            client_id: DEVELOPER_CLIENT_ID.to_string(),
        }
    }

    pub fn token_endpoint(&self) -> String {
        self.authority.token_endpoint(&self.tenant_id)
    }

    /// Scope string for a user sign-in.
    pub fn sign_in_scope(scopes: &[&str]) -> String {
        scopes.iter().copied().chain(SIGN_IN_SCOPES).collect::<Vec<_>>().join(" ")
    }

    /// Redeems a token endpoint grant, mapping failures to `kind`.
    pub async fn redeem(
        &self,
        kind: CredentialKind,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, CredentialError> {
        post_form(&self.http, &self.token_endpoint(), form)
            .await
            .map_err(|err| err.into_credential_error(kind))
    }
}

/// The part of a user sign-in that involves the user.
#[async_trait]
pub trait UserFlow: Send + Sync {
    fn kind(&self) -> CredentialKind;

    /// Signs the user in and returns the token endpoint's response, which
    /// must include an id token.
    async fn sign_in(
        &self,
        client: &PublicClient,
        scopes: &[&str],
        login_hint: Option<&str>,
    ) -> Result<TokenResponse, CredentialError>;
}

#[derive(Default)]
struct UserState {
    record: AuthenticationRecord,
    refresh_token: Option<SecretString>,
    tokens: HashMap<String, AccessToken>,
}

/// A user credential backed by one [`UserFlow`].
pub struct UserCredential<F> {
    client: PublicClient,
    flow: F,
    state: Mutex<UserState>,
}

impl<F: UserFlow> UserCredential<F> {
    pub fn new(client: PublicClient, flow: F) -> Self {
        Self { client, flow, state: Mutex::new(UserState::default()) }
    }

    /// Attaches a cached record. Construction never prompts; the record
    /// pins the tenant and supplies a login hint for later sign-ins.
    pub fn with_record(mut self, record: AuthenticationRecord) -> Self {
        if !record.tenant_id.is_empty() {
            self.client.tenant_id = record.tenant_id.clone();
        }
        self.state.get_mut().record = record;
        self
    }

    pub fn client(&self) -> &PublicClient {
        &self.client
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    /// The record currently attached.
    pub async fn record(&self) -> AuthenticationRecord {
        self.state.lock().await.record.clone()
    }

    /// Signs the user in unconditionally and returns the resulting record.
    /// The token acquired on the way is kept for `scopes`.
    pub async fn authenticate(&self, scopes: &[&str]) -> Result<AuthenticationRecord, CredentialError> {
        let mut state = self.state.lock().await;
        self.sign_in(&mut state, scopes).await?;
        Ok(state.record.clone())
    }

    async fn sign_in(&self, state: &mut UserState, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let login_hint = Some(state.record.username.as_str()).filter(|hint| !hint.is_empty());
        let response = self.flow.sign_in(&self.client, scopes, login_hint).await?;

        let record = AuthenticationRecord::from_sign_in(
            self.flow.kind(),
            self.client.authority.host(),
            &self.client.client_id,
            &response,
        )?;
        info!(source = %self.flow.kind(), username = %record.username, "Signed in");

        Ok(self.store(state, scopes, response, Some(record)))
    }

    async fn refresh(&self, state: &mut UserState, scopes: &[&str]) -> Option<AccessToken> {
        let refresh_token = state.refresh_token.clone()?;
        let scope = PublicClient::sign_in_scope(scopes);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client.client_id.as_str()),
            ("refresh_token", refresh_token.expose_secret()),
            ("scope", scope.as_str()),
            ("client_info", "1"),
        ];

        match self.client.redeem(self.flow.kind(), &form).await {
            Ok(response) => Some(self.store(state, scopes, response, None)),
            Err(err) => {
                debug!(error = %err, "Refresh token redemption failed; signing in again");
                state.refresh_token = None;
                None
            }
        }
    }

    fn store(
        &self,
        state: &mut UserState,
        scopes: &[&str],
        response: TokenResponse,
        record: Option<AuthenticationRecord>,
    ) -> AccessToken {
        let token = response.access_token();
        if let Some(refresh_token) = response.refresh_token {
            state.refresh_token = Some(refresh_token);
        }
        if let Some(record) = record {
            state.record = record;
        }
        state.tokens.insert(scope_key(scopes), token.clone());
        token
    }
}

#[async_trait]
impl<F: UserFlow> TokenProvider for UserCredential<F> {
    fn kind(&self) -> CredentialKind {
        self.flow.kind()
    }

    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.tokens.get(&scope_key(scopes)).filter(|token| token.is_fresh()) {
            return Ok(token.clone());
        }

        if let Some(token) = self.refresh(&mut state, scopes).await {
            return Ok(token);
        }

        self.sign_in(&mut state, scopes).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Flow that signs in without a user and counts how often it was asked.
    #[derive(Clone, Default)]
    pub struct CountingFlow {
        pub prompts: Arc<AtomicUsize>,
        pub hints: Arc<std::sync::Mutex<Vec<Option<String>>>>,
    }

    impl CountingFlow {
        pub fn prompts(&self) -> usize {
            self.prompts.load(Ordering::SeqCst)
        }
    }

    pub fn id_token(username: &str) -> String {
        let claims = serde_json::json!({"oid": "oid-1", "tid": "tenant-1", "preferred_username": username});
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default())
        )
    }

    #[async_trait]
    impl UserFlow for CountingFlow {
        fn kind(&self) -> CredentialKind {
            CredentialKind::DeviceCode
        }

        async fn sign_in(
            &self,
            _client: &PublicClient,
            _scopes: &[&str],
            login_hint: Option<&str>,
        ) -> Result<TokenResponse, CredentialError> {
            let count = self.prompts.fetch_add(1, Ordering::SeqCst) + 1;
            if let Ok(mut hints) = self.hints.lock() {
                hints.push(login_hint.map(str::to_string));
            }
            Ok(TokenResponse {
                access_token: SecretString::new(format!("user-token-{count}")),
                expires_in: 3600,
                refresh_token: None,
                id_token: Some(id_token("ada@contoso.com")),
                client_info: None,
            })
        }
    }

    pub fn client() -> PublicClient {
        PublicClient::from_env(&LayeredEnvironment::default(), reqwest::Client::new())
    }
}
