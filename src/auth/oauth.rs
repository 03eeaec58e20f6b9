//! Microsoft identity platform endpoints and token endpoint exchanges.

use super::error::{CredentialError, CredentialKind};
use super::token::AccessToken;
use crate::config::LayeredEnvironment;
use crate::secrets::SecretString;
use chrono::{Duration, Utc};
use serde::{Deserialize, Deserializer};
use tracing::debug;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Base URL of the identity provider, e.g. `https://login.microsoftonline.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    base: String,
}

impl Authority {
    pub fn new(base: &str) -> Self {
        Self { base: base.trim().trim_end_matches('/').to_string() }
    }

    /// `AZURE_AUTHORITY_HOST`, else the public cloud.
    pub fn from_env(env: &LayeredEnvironment) -> Self {
        Self::new(env.non_empty("AZURE_AUTHORITY_HOST").unwrap_or(DEFAULT_AUTHORITY_HOST))
    }

    pub fn token_endpoint(&self, tenant: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.base, tenant)
    }

    pub fn device_code_endpoint(&self, tenant: &str) -> String {
        format!("{}/{}/oauth2/v2.0/devicecode", self.base, tenant)
    }

    pub fn authorize_endpoint(&self, tenant: &str) -> String {
        format!("{}/{}/oauth2/v2.0/authorize", self.base, tenant)
    }

    /// Host name recorded in authentication records.
    pub fn host(&self) -> &str {
        let without_scheme = self.base.split_once("://").map(|(_, rest)| rest).unwrap_or(&self.base);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecretString,
    #[serde(deserialize_with = "lenient_i64")]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub client_info: Option<String>,
}

impl TokenResponse {
    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone(), Utc::now() + Duration::seconds(self.expires_in))
    }
}

/// Error body returned by the identity platform.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl OAuthErrorBody {
    pub fn message(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, first_line(description)),
            None => self.error.clone(),
        }
    }
}

/// Identity platform descriptions carry trace ids on following lines.
fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text).trim()
}

/// Outcome of a token endpoint call that did not yield a token.
#[derive(Debug)]
pub enum TokenRequestError {
    /// The endpoint answered with an OAuth error body.
    OAuth(OAuthErrorBody),
    /// The request could not be sent or the body could not be read.
    Transport(String),
}

impl TokenRequestError {
    pub fn into_credential_error(self, kind: CredentialKind) -> CredentialError {
        match self {
            Self::OAuth(body) => CredentialError::authentication_failed(kind, body.message()),
            Self::Transport(message) => CredentialError::unavailable(kind, message),
        }
    }
}

/// POSTs a form to `endpoint` and decodes either a token or an OAuth error.
pub async fn post_form<T>(
    http: &reqwest::Client,
    endpoint: &str,
    form: &[(&str, &str)],
) -> Result<T, TokenRequestError>
where
    T: for<'de> Deserialize<'de>,
{
    let response = http
        .post(endpoint)
        .form(form)
        .send()
        .await
        .map_err(|err| TokenRequestError::Transport(err.to_string()))?;

    let status = response.status();
    let body = response.text().await.map_err(|err| TokenRequestError::Transport(err.to_string()))?;
    debug!(endpoint = endpoint, status = %status, "Identity platform response");

    if status.is_success() {
        return serde_json::from_str(&body)
            .map_err(|err| TokenRequestError::Transport(format!("invalid token response: {}", err)));
    }

    match serde_json::from_str::<OAuthErrorBody>(&body) {
        Ok(error) => Err(TokenRequestError::OAuth(error)),
        Err(_) => Err(TokenRequestError::Transport(format!("HTTP {} from {}", status, endpoint))),
    }
}

/// Accepts `3600` or `"3600"`.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_endpoints_and_host() {
        let authority = Authority::new("https://login.microsoftonline.com/");

        assert_eq!(
            authority.token_endpoint("contoso"),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
        assert_eq!(authority.host(), "login.microsoftonline.com");
    }

    #[test]
    fn authority_defaults_to_public_cloud() {
        let env = LayeredEnvironment::default();
        assert_eq!(Authority::from_env(&env), Authority::new(DEFAULT_AUTHORITY_HOST));

        let env = LayeredEnvironment::from_vars([("AZURE_AUTHORITY_HOST", "https://login.chinacloudapi.cn")]);
        assert_eq!(Authority::from_env(&env).host(), "login.chinacloudapi.cn");
    }

    #[test]
    fn token_response_accepts_string_expiry() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"abc","expires_in":"3599","token_type":"Bearer"}"#)
                .unwrap();

        assert_eq!(response.expires_in, 3599);
        assert!(response.refresh_token.is_none());
        assert!(response.access_token().is_fresh());
    }

    #[test]
    fn oauth_error_message_keeps_first_line() {
        let body: OAuthErrorBody = serde_json::from_str(
            r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret.\r\nTrace ID: 123"}"#,
        )
        .unwrap();

        assert_eq!(body.message(), "invalid_client: AADSTS7000215: Invalid client secret.");
    }
}
