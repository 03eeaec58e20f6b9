//! Device code sign-in: the user enters a code on another device.

use super::error::{CredentialError, CredentialKind};
use super::oauth::{lenient_i64, post_form, TokenRequestError, TokenResponse};
use super::public_client::{PublicClient, UserCredential, UserFlow};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_POLL_INTERVAL_SECONDS: i64 = 5;
const MIN_POLL_INTERVAL_SECONDS: i64 = 1;
const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// What the user needs to complete sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodePrompt {
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    #[serde(flatten)]
    prompt: DeviceCodePrompt,
    device_code: String,
    #[serde(deserialize_with = "lenient_i64")]
    expires_in: i64,
    #[serde(default)]
    interval: Option<i64>,
}

type PromptSink = Arc<dyn Fn(&DeviceCodePrompt) + Send + Sync>;

/// Device code flow. The prompt goes to stderr unless a sink is supplied.
#[derive(Clone)]
pub struct DeviceCodeFlow {
    sink: PromptSink,
}

impl Default for DeviceCodeFlow {
    fn default() -> Self {
        Self::with_sink(|prompt: &DeviceCodePrompt| match &prompt.message {
            Some(message) => eprintln!("{}", message),
            None => eprintln!(
                "To sign in, open {} and enter the code {} to authenticate.",
                prompt.verification_uri, prompt.user_code
            ),
        })
    }
}

impl DeviceCodeFlow {
    pub fn with_sink(sink: impl Fn(&DeviceCodePrompt) + Send + Sync + 'static) -> Self {
        Self { sink: Arc::new(sink) }
    }
}

/// Delay between token polls; never shorter than one second.
fn poll_interval(requested: Option<i64>) -> Duration {
    let seconds = requested.unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS).max(MIN_POLL_INTERVAL_SECONDS);
    Duration::from_secs(seconds as u64)
}

/// Device code sign-in with token caching and record support.
pub type DeviceCodeCredential = UserCredential<DeviceCodeFlow>;

#[async_trait]
impl UserFlow for DeviceCodeFlow {
    fn kind(&self) -> CredentialKind {
        CredentialKind::DeviceCode
    }

    async fn sign_in(
        &self,
        client: &PublicClient,
        scopes: &[&str],
        _login_hint: Option<&str>,
    ) -> Result<TokenResponse, CredentialError> {
        let scope = PublicClient::sign_in_scope(scopes);
        let endpoint = client.authority.device_code_endpoint(&client.tenant_id);
        let form = [("client_id", client.client_id.as_str()), ("scope", scope.as_str())];

        let device: DeviceCodeResponse = post_form(&client.http, &endpoint, &form)
            .await
            .map_err(|err| err.into_credential_error(self.kind()))?;

        (self.sink)(&device.prompt);

        let deadline = Instant::now() + Duration::from_secs(device.expires_in.max(0) as u64);
        let mut interval = poll_interval(device.interval);
        let poll_form = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("client_id", client.client_id.as_str()),
            ("device_code", device.device_code.as_str()),
            ("client_info", "1"),
        ];

        loop {
            tokio::time::sleep(interval).await;
            if Instant::now() >= deadline {
                return Err(CredentialError::sign_in_incomplete(self.kind(), "device code expired"));
            }

            match post_form::<TokenResponse>(&client.http, &client.token_endpoint(), &poll_form).await {
                Ok(response) => return Ok(response),
                Err(TokenRequestError::OAuth(body)) if body.error == "authorization_pending" => {
                    debug!("Waiting for device code sign-in");
                }
                Err(TokenRequestError::OAuth(body)) if body.error == "slow_down" => {
                    interval += SLOW_DOWN_INCREMENT;
                    debug!(interval_secs = interval.as_secs(), "Identity platform asked to slow down");
                }
                Err(TokenRequestError::OAuth(body))
                    if body.error == "authorization_declined" || body.error == "expired_token" =>
                {
                    return Err(CredentialError::sign_in_incomplete(self.kind(), body.message()));
                }
                Err(err) => return Err(err.into_credential_error(self.kind())),
            }
        }
    }
}
