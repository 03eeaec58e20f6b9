//! Tokens delegated to an already signed-in Azure CLI.

use super::error::{CredentialError, CredentialKind};
use super::token::{scope_to_resource, AccessToken, TokenProvider};
use crate::config::LayeredEnvironment;
use crate::secrets::SecretString;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const CLI_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct CliToken {
    #[serde(rename = "accessToken")]
    access_token: SecretString,
    /// Unix timestamp, present in Azure CLI 2.54 and later.
    #[serde(rename = "expires_on", default)]
    expires_on_unix: Option<i64>,
    /// Local time, e.g. `2024-01-01 12:00:00.000000`.
    #[serde(rename = "expiresOn", default)]
    expires_on_local: Option<String>,
}

/// Runs `az account get-access-token`.
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: PathBuf,
    tenant_id: Option<String>,
}

impl AzureCliCredential {
    pub fn new(program: impl Into<PathBuf>, tenant_id: Option<String>) -> Self {
        Self { program: program.into(), tenant_id }
    }

    /// Finds `az` on the layered `PATH`. `None` when it is not installed.
    /// Tokens are requested for `AZURE_TENANT_ID` when it is set.
    pub fn locate(env: &LayeredEnvironment) -> Option<Self> {
        let tenant_id = env.non_empty("AZURE_TENANT_ID").map(str::to_string);
        let search_path = env.get("PATH")?;
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match which::which_in("az", Some(search_path), cwd) {
            Ok(program) => {
                debug!(program = %program.display(), "Found Azure CLI");
                Some(Self::new(program, tenant_id))
            }
            Err(err) => {
                debug!(error = %err, "Azure CLI not found on PATH");
                None
            }
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn parse_output(stdout: &[u8]) -> Result<AccessToken, String> {
        let token: CliToken = serde_json::from_slice(stdout).map_err(|err| err.to_string())?;

        let expires_on = match token.expires_on_unix {
            Some(timestamp) => DateTime::<Utc>::from_timestamp(timestamp, 0),
            None => token.expires_on_local.as_deref().and_then(parse_local_time),
        }
        .ok_or_else(|| "Azure CLI output has no usable expiry".to_string())?;

        Ok(AccessToken::new(token.access_token, expires_on))
    }
}

fn parse_local_time(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Local.from_local_datetime(&naive).earliest().map(|local| local.with_timezone(&Utc))
}

#[async_trait]
impl TokenProvider for AzureCliCredential {
    fn kind(&self) -> CredentialKind {
        CredentialKind::AzureCli
    }

    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let [scope] = scopes else {
            return Err(CredentialError::unavailable(self.kind(), "Azure CLI accepts exactly one scope"));
        };

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(["account", "get-access-token", "--output", "json", "--resource"])
            .arg(scope_to_resource(scope))
            .kill_on_drop(true);
        if let Some(tenant_id) = &self.tenant_id {
            command.args(["--tenant", tenant_id.as_str()]);
        }

        let output = tokio::time::timeout(CLI_TIMEOUT, command.output())
            .await
            .map_err(|_| CredentialError::unavailable(self.kind(), "timed out waiting for Azure CLI"))?
            .map_err(|err| CredentialError::unavailable(self.kind(), err.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.lines().find(|line| !line.trim().is_empty()).unwrap_or("Azure CLI failed");
            return Err(CredentialError::unavailable(self.kind(), message.trim()));
        }

        Self::parse_output(&output.stdout)
            .map_err(|err| CredentialError::authentication_failed(self.kind(), err))
    }
}
