//! Arguments shared by the vault commands and the per-invocation session.
//!
//! Every vault command resolves the same way:
//!
//! ```text
//! URL / --vault / --key ──► SecretAddress
//! process env + overlay ──► credential chain ──► KeyVaultClient
//! ```

use super::exit::{CommandFailure, CommandResult, ExitStatus, OrExit};
use crate::address::{AddressError, AddressParts, SecretAddress, VaultHost};
use crate::auth::{CredentialChainBuilder, InteractiveMode, RecordStore};
use crate::config::{default_secret_store, load_environment, ConfigPaths, LayeredEnvironment};
use crate::vault::KeyVaultClient;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Client-wide timeout for vault and identity requests.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a secret lives.
#[derive(Debug, Clone, Default, Args)]
pub struct LocatorArgs {
    /// Secret URL: https://<vault>.vault.azure.net/secrets/<key>[/<version>] or akv://<vault>/<key>[/<version>]
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Key Vault name (e.g. myvault) or host
    #[arg(short = 'v', long)]
    pub vault: Option<String>,

    /// Secret name
    #[arg(short = 'k', long)]
    pub key: Option<String>,
}

impl LocatorArgs {
    pub fn parts(&self, version: Option<&str>) -> CommandResult<AddressParts> {
        AddressParts::from_sources(self.url.as_deref(), self.vault.as_deref(), self.key.as_deref(), version)
            .map_err(address_failure)
    }

    /// Vault and key are both required.
    pub fn address(&self, version: Option<&str>) -> CommandResult<SecretAddress> {
        self.parts(version)?.into_address().map_err(address_failure)
    }
}

/// Maps locator errors to their exit statuses.
pub fn address_failure(err: AddressError) -> CommandFailure {
    let status = match err {
        AddressError::InvalidAddress { .. } | AddressError::UnsupportedScheme { .. } => {
            ExitStatus::InvalidAddress
        }
        AddressError::MissingVault => ExitStatus::MissingVaultName,
        AddressError::MissingKey => ExitStatus::MissingKey,
    };
    CommandFailure::new(status, err)
}

/// How to sign in when no non-interactive credential is available.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct AuthArgs {
    /// Use interactive browser login
    #[arg(short = 'i', long, conflicts_with = "device_code")]
    pub interactive: bool,

    /// Use device code authentication
    #[arg(short = 'D', long)]
    pub device_code: bool,
}

impl AuthArgs {
    pub fn mode(&self) -> InteractiveMode {
        if self.interactive {
            InteractiveMode::Browser
        } else if self.device_code {
            InteractiveMode::DeviceCode
        } else {
            InteractiveMode::None
        }
    }
}

/// Local state loaded once per invocation.
pub struct Session {
    pub paths: ConfigPaths,
    pub env: LayeredEnvironment,
    pub http: reqwest::Client,
}

impl Session {
    pub fn load() -> CommandResult<Self> {
        let paths = ConfigPaths::discover().or_exit(ExitStatus::ConfigFailed)?;
        let store = default_secret_store();
        let env = load_environment(&paths, store.as_ref());
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_exit(ExitStatus::ClientCreationFailed)?;
        debug!(config_dir = %paths.dir().display(), "Loaded session");
        Ok(Self { paths, env, http })
    }

    /// Builds the credential chain and a client for `vault`.
    pub async fn vault_client(&self, vault: &VaultHost, auth: AuthArgs) -> CommandResult<KeyVaultClient> {
        let records = RecordStore::new(self.paths.record_file());
        let chain = CredentialChainBuilder::new(self.env.clone(), records, self.http.clone(), vault.scope())
            .build(auth.mode())
            .await
            .or_exit(ExitStatus::InvalidCredentials)?;
        KeyVaultClient::new(vault, Arc::new(chain), self.http.clone()).or_exit(ExitStatus::ClientCreationFailed)
    }
}
