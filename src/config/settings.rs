//! Names accepted by `config set/get/rm` and the overlay keys behind them.

use super::error::{ConfigError, Result};

/// An overlay entry that refers to an OS secret store account instead of
/// holding the secret itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretReference {
    /// Key written to the overlay, e.g. `AZURE_CLIENT_SECRET_KEY`.
    pub reference_key: &'static str,
    /// Variable the resolved secret is exposed as, e.g. `AZURE_CLIENT_SECRET`.
    pub target_key: &'static str,
    /// Account used when the reference value is `true` or `1`.
    pub default_account: &'static str,
}

pub const CLIENT_SECRET_REFERENCE: SecretReference = SecretReference {
    reference_key: "AZURE_CLIENT_SECRET_KEY",
    target_key: "AZURE_CLIENT_SECRET",
    default_account: "CLIENT_SECRET",
};

pub const CERTIFICATE_PASSWORD_REFERENCE: SecretReference = SecretReference {
    reference_key: "AZURE_CLIENT_CERTIFICATE_PASSWORD_KEY",
    target_key: "AZURE_CLIENT_CERTIFICATE_PASSWORD",
    default_account: "CERTIFICATE_PASSWORD",
};

pub const SECRET_REFERENCES: [SecretReference; 2] =
    [CLIENT_SECRET_REFERENCE, CERTIFICATE_PASSWORD_REFERENCE];

impl SecretReference {
    /// Account named by an overlay reference value.
    pub fn account<'a>(&self, reference_value: &'a str) -> &'a str {
        if super::environment::is_truthy(reference_value) {
            self.default_account
        } else {
            reference_value.trim()
        }
    }
}

/// What a configuration name maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Stored in clear in the overlay file.
    Plain { key: &'static str },
    /// Stored in the OS secret store, referenced from the overlay.
    Secret(SecretReference),
}

impl Setting {
    /// Overlay key holding the value or the reference.
    pub fn overlay_key(&self) -> &'static str {
        match self {
            Self::Plain { key } => key,
            Self::Secret(reference) => reference.reference_key,
        }
    }

    /// Resolves a user-supplied name (alias or variable name, any case).
    pub fn lookup(name: &str) -> Result<Self> {
        let setting = match name.trim().to_ascii_lowercase().as_str() {
            "tenant" | "azure_tenant_id" => Self::Plain { key: "AZURE_TENANT_ID" },
            "identity" | "azure_identity" => Self::Plain { key: "AZURE_IDENTITY" },
            "client.id" | "azure_client_id" => Self::Plain { key: "AZURE_CLIENT_ID" },
            "client.certificate.path" | "azure_client_certificate_path" => {
                Self::Plain { key: "AZURE_CLIENT_CERTIFICATE_PATH" }
            }
            "authority.host" | "azure_authority_host" => Self::Plain { key: "AZURE_AUTHORITY_HOST" },
            "client.secret" | "azure_client_secret" => Self::Secret(CLIENT_SECRET_REFERENCE),
            "client.certificate.password" | "azure_client_certificate_password" => {
                Self::Secret(CERTIFICATE_PASSWORD_REFERENCE)
            }
            _ => return Err(ConfigError::unknown_name(name)),
        };
        Ok(setting)
    }
}
