//! Managed identity tokens from the App Service or IMDS endpoint.

use super::error::{CredentialError, CredentialKind};
use super::oauth::lenient_i64;
use super::token::{scope_to_resource, AccessToken, TokenProvider};
use crate::config::LayeredEnvironment;
use crate::secrets::SecretString;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

const IMDS_DEFAULT_HOST: &str = "http://169.254.169.254";
const IMDS_PATH: &str = "/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Where the managed identity endpoint lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedIdentitySource {
    /// Azure VM / AKS instance metadata service.
    Imds { endpoint: String },
    /// App Service and Functions (`IDENTITY_ENDPOINT` + `IDENTITY_HEADER`).
    AppService { endpoint: String, header: String },
}

impl ManagedIdentitySource {
    pub fn from_env(env: &LayeredEnvironment) -> Self {
        if let (Some(endpoint), Some(header)) =
            (env.non_empty("IDENTITY_ENDPOINT"), env.non_empty("IDENTITY_HEADER"))
        {
            return Self::AppService { endpoint: endpoint.to_string(), header: header.to_string() };
        }

        let host = env
            .non_empty("AZURE_POD_IDENTITY_AUTHORITY_HOST")
            .unwrap_or(IMDS_DEFAULT_HOST)
            .trim_end_matches('/');
        Self::Imds { endpoint: format!("{}{}", host, IMDS_PATH) }
    }
}

#[derive(Debug, Deserialize)]
struct ManagedIdentityToken {
    access_token: SecretString,
    #[serde(deserialize_with = "lenient_i64")]
    expires_on: i64,
}

#[derive(Debug, Deserialize)]
struct ManagedIdentityError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Token source for the identity assigned to the host.
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    source: ManagedIdentitySource,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    pub fn new(http: reqwest::Client, source: ManagedIdentitySource, client_id: Option<String>) -> Self {
        Self { http, source, client_id }
    }

    /// Endpoint from the environment, user-assigned identity from
    /// `AZURE_CLIENT_ID` when set.
    pub fn from_env(env: &LayeredEnvironment, http: reqwest::Client) -> Self {
        let client_id = env.non_empty("AZURE_CLIENT_ID").map(str::to_string);
        Self::new(http, ManagedIdentitySource::from_env(env), client_id)
    }

    pub fn source(&self) -> &ManagedIdentitySource {
        &self.source
    }

    fn request(&self, resource: &str) -> reqwest::RequestBuilder {
        let mut query: Vec<(&str, &str)> = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        match &self.source {
            ManagedIdentitySource::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.http.get(endpoint).header("Metadata", "true").query(&query)
            }
            ManagedIdentitySource::AppService { endpoint, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.http.get(endpoint).header("X-IDENTITY-HEADER", header).query(&query)
            }
        }
    }
}

#[async_trait]
impl TokenProvider for ManagedIdentityCredential {
    fn kind(&self) -> CredentialKind {
        CredentialKind::ManagedIdentity
    }

    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let [scope] = scopes else {
            return Err(CredentialError::authentication_failed(
                self.kind(),
                "managed identity tokens are issued for exactly one scope",
            ));
        };
        let resource = scope_to_resource(scope);

        let response = self
            .request(resource)
            .send()
            .await
            .map_err(|err| CredentialError::unavailable(self.kind(), err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CredentialError::unavailable(self.kind(), err.to_string()))?;
        debug!(status = %status, "Managed identity endpoint response");

        if !status.is_success() {
            let detail = serde_json::from_str::<ManagedIdentityError>(&body)
                .ok()
                .and_then(|err| err.error_description.or(err.message).or(err.error))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(CredentialError::authentication_failed(self.kind(), detail));
        }

        let token: ManagedIdentityToken = serde_json::from_str(&body)
            .map_err(|err| CredentialError::authentication_failed(self.kind(), err.to_string()))?;
        let expires_on = DateTime::<Utc>::from_timestamp(token.expires_on, 0).ok_or_else(|| {
            CredentialError::authentication_failed(self.kind(), "invalid expires_on in token response")
        })?;

        Ok(AccessToken::new(token.access_token, expires_on))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn app_service_variables_take_precedence() {
        let env = LayeredEnvironment::from_vars([
            ("IDENTITY_ENDPOINT", "http://localhost:42356/msi/token"),
            ("IDENTITY_HEADER", "secret-header"),
        ]);

        assert_eq!(
            ManagedIdentitySource::from_env(&env),
            ManagedIdentitySource::AppService {
                endpoint: "http://localhost:42356/msi/token".into(),
                header: "secret-header".into(),
            }
        );
    }

    #[test]
    fn imds_is_the_default() {
        assert_eq!(
            ManagedIdentitySource::from_env(&LayeredEnvironment::default()),
            ManagedIdentitySource::Imds {
                endpoint: "http://169.254.169.254/metadata/identity/oauth2/token".into()
            }
        );
    }

    #[tokio::test]
    async fn imds_request_carries_metadata_header_and_client_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IMDS_PATH))
            .and(header("Metadata", "true"))
            .and(query_param("resource", "https://vault.azure.net"))
            .and(query_param("client_id", "user-assigned"))
            .and(query_param("api-version", IMDS_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mi-token",
                "expires_on": "4102444800",
                "resource": "https://vault.azure.net",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let env = LayeredEnvironment::from_vars([
            ("AZURE_POD_IDENTITY_AUTHORITY_HOST", server.uri()),
            ("AZURE_CLIENT_ID", "user-assigned".to_string()),
        ]);
        let credential = ManagedIdentityCredential::from_env(&env, reqwest::Client::new());

        let token = credential.get_token(&["https://vault.azure.net/.default"]).await.unwrap();
        assert_eq!(token.token.expose_secret(), "mi-token");
        assert_eq!(token.expires_on.timestamp(), 4102444800);
    }

    #[tokio::test]
    async fn endpoint_errors_surface_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IMDS_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_request",
                "error_description": "Identity not found"
            })))
            .mount(&server)
            .await;

        let env = LayeredEnvironment::from_vars([("AZURE_POD_IDENTITY_AUTHORITY_HOST", server.uri())]);
        let credential = ManagedIdentityCredential::from_env(&env, reqwest::Client::new());

        let err = credential.get_token(&["https://vault.azure.net/.default"]).await.unwrap_err();
        assert!(err.to_string().contains("Identity not found"));
    }
}
