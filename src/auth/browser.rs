//! Interactive browser sign-in: authorization code with PKCE and a loopback
//! redirect listener.

use super::error::{CredentialError, CredentialKind};
use super::oauth::TokenResponse;
use super::public_client::{PublicClient, UserCredential, UserFlow};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

const SIGN_IN_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = "<html><body><h1>Sign-in complete</h1>\
<p>You can close this window and return to the terminal.</p></body></html>";

type RedirectSender = Arc<Mutex<Option<oneshot::Sender<HashMap<String, String>>>>>;

/// Authorization code flow in the system browser.
#[derive(Debug, Clone)]
pub struct BrowserFlow {
    open_browser: bool,
    timeout: Duration,
}

impl Default for BrowserFlow {
    fn default() -> Self {
        Self { open_browser: true, timeout: SIGN_IN_TIMEOUT }
    }
}

impl BrowserFlow {
    /// Only print the sign-in URL; never launch a browser.
    pub fn print_only(mut self) -> Self {
        self.open_browser = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Interactive browser sign-in with token caching and record support.
pub type InteractiveBrowserCredential = UserCredential<BrowserFlow>;

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self { verifier, challenge }
    }
}

async fn handle_redirect(
    State(sender): State<RedirectSender>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    if let Some(sender) = sender.lock().ok().and_then(|mut sender| sender.take()) {
        let _ = sender.send(params);
    }
    Html(SUCCESS_PAGE)
}

fn open_in_browser(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = std::process::Command::new("rundll32");
        command.args(["url.dll,FileProtocolHandler", url]);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = std::process::Command::new("open");
        command.arg(url);
        command
    } else {
        let mut command = std::process::Command::new("xdg-open");
        command.arg(url);
        command
    };
    command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map(|_| ())
}

#[async_trait]
impl UserFlow for BrowserFlow {
    fn kind(&self) -> CredentialKind {
        CredentialKind::InteractiveBrowser
    }

    async fn sign_in(
        &self,
        client: &PublicClient,
        scopes: &[&str],
        login_hint: Option<&str>,
    ) -> Result<TokenResponse, CredentialError> {
        let kind = self.kind();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|err| CredentialError::unavailable(kind, format!("loopback listener: {}", err)))?;
        let port = listener
            .local_addr()
            .map_err(|err| CredentialError::unavailable(kind, err.to_string()))?
            .port();
        let redirect_uri = format!("http://localhost:{}", port);

        let (code_tx, code_rx) = oneshot::channel::<HashMap<String, String>>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = Router::new()
            .route("/", get(handle_redirect))
            .with_state(Arc::new(Mutex::new(Some(code_tx))) as RedirectSender);
        let server = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                warn!(error = %err, "Loopback redirect listener failed");
            }
        });

        let pkce = Pkce::generate();
        let state = uuid::Uuid::new_v4().to_string();
        let scope = PublicClient::sign_in_scope(scopes);
        let mut params = vec![
            ("client_id", client.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state.as_str()),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("prompt", "select_account"),
        ];
        if let Some(hint) = login_hint {
            params.push(("login_hint", hint));
        }
        let authorize_url =
            url::Url::parse_with_params(&client.authority.authorize_endpoint(&client.tenant_id), &params)
                .map_err(|err| CredentialError::unavailable(kind, err.to_string()))?;

        eprintln!("Sign in by opening this URL in a browser:\n{}", authorize_url);
        if self.open_browser {
            if let Err(err) = open_in_browser(authorize_url.as_str()) {
                debug!(error = %err, "Could not launch a browser");
            }
        }

        let outcome = tokio::time::timeout(self.timeout, code_rx).await;
        let _ = shutdown_tx.send(());
        let _ = server.await;

        let params = outcome
            .map_err(|_| CredentialError::sign_in_incomplete(kind, "timed out waiting for the browser"))?
            .map_err(|_| CredentialError::sign_in_incomplete(kind, "redirect listener closed"))?;

        if let Some(error) = params.get("error") {
            let description = params.get("error_description").map(String::as_str).unwrap_or_default();
            return Err(CredentialError::authentication_failed(kind, format!("{}: {}", error, description)));
        }
        if params.get("state") != Some(&state) {
            return Err(CredentialError::authentication_failed(kind, "redirect state mismatch"));
        }
        let code = params
            .get("code")
            .ok_or_else(|| CredentialError::authentication_failed(kind, "redirect carried no code"))?;

        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", client.client_id.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("scope", scope.as_str()),
            ("client_info", "1"),
        ];
        client.redeem(kind, &form).await
    }
}
