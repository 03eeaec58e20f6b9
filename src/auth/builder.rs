//! Assembles the credential chain for one invocation.

use super::azure_cli::AzureCliCredential;
use super::browser::BrowserFlow;
use super::chain::ChainedCredential;
use super::device_code::DeviceCodeFlow;
use super::environment::EnvironmentCredential;
use super::error::CredentialError;
use super::managed_identity::ManagedIdentityCredential;
use super::public_client::{PublicClient, UserCredential, UserFlow};
use super::record::{AuthenticationRecord, RecordStore};
use super::token::TokenProvider;
use crate::config::LayeredEnvironment;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which interactive source, if any, the user asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractiveMode {
    #[default]
    None,
    Browser,
    DeviceCode,
}

/// Builds a [`ChainedCredential`] from the layered environment.
///
/// Order:
/// 1. `AZURE_IDENTITY` truthy: managed identity only
/// 2. environment credential, when fully configured
/// 3. Azure CLI, when `az` is on `PATH`
/// 4. the requested interactive source
pub struct CredentialChainBuilder {
    env: LayeredEnvironment,
    records: RecordStore,
    http: reqwest::Client,
    scope: String,
    browser: BrowserFlow,
    device_code: DeviceCodeFlow,
}

impl CredentialChainBuilder {
    /// `scope` is the vault scope an interactive sign-in is performed for.
    pub fn new(
        env: LayeredEnvironment,
        records: RecordStore,
        http: reqwest::Client,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            env,
            records,
            http,
            scope: scope.into(),
            browser: BrowserFlow::default(),
            device_code: DeviceCodeFlow::default(),
        }
    }

    pub fn with_browser_flow(mut self, flow: BrowserFlow) -> Self {
        self.browser = flow;
        self
    }

    pub fn with_device_code_flow(mut self, flow: DeviceCodeFlow) -> Self {
        self.device_code = flow;
        self
    }

    pub async fn build(&self, mode: InteractiveMode) -> Result<ChainedCredential, CredentialError> {
        if self.env.is_truthy("AZURE_IDENTITY") {
            info!("AZURE_IDENTITY is set; using managed identity only");
            let managed: Arc<dyn TokenProvider> =
                Arc::new(ManagedIdentityCredential::from_env(&self.env, self.http.clone()));
            return ChainedCredential::new(vec![managed]);
        }

        let mut sources: Vec<Arc<dyn TokenProvider>> = Vec::new();

        if let Some(credential) = EnvironmentCredential::from_env(&self.env, self.http.clone())? {
            debug!(certificate = credential.uses_certificate(), "Adding environment credential");
            sources.push(Arc::new(credential));
        }

        match AzureCliCredential::locate(&self.env) {
            Some(cli) => sources.push(Arc::new(cli)),
            None => debug!("Skipping Azure CLI credential"),
        }

        let client = PublicClient::from_env(&self.env, self.http.clone());
        match mode {
            InteractiveMode::None => {}
            InteractiveMode::Browser => {
                let credential = UserCredential::new(client, self.browser.clone());
                sources.push(Arc::new(attach_interactive(credential, &self.records, &self.scope).await?));
            }
            InteractiveMode::DeviceCode => {
                let credential = UserCredential::new(client, self.device_code.clone());
                sources.push(Arc::new(attach_interactive(credential, &self.records, &self.scope).await?));
            }
        }

        let chain = ChainedCredential::new(sources)?;
        debug!(sources = ?chain.kinds(), "Built credential chain");
        Ok(chain)
    }
}

/// Prepares an interactive credential from the cached record.
///
/// A cached record is attached without prompting. Without one, the user
/// signs in once and the new record is persisted before returning; failing
/// to persist it is an error.
pub async fn attach_interactive<F: UserFlow + 'static>(
    credential: UserCredential<F>,
    records: &RecordStore,
    scope: &str,
) -> Result<UserCredential<F>, CredentialError> {
    let record = records.load().unwrap_or_else(|err| {
        warn!(error = %err, "Ignoring unreadable authentication record");
        AuthenticationRecord::default()
    });

    if !record.is_empty() {
        debug!(username = %record.username, "Using cached authentication record");
        return Ok(credential.with_record(record));
    }

    let record = credential.authenticate(&[scope]).await?;
    records.save(&record)?;
    Ok(credential)
}
