//! Secret locators.
//!
//! A secret is addressed by vault, key and optional version. The three parts
//! come from `--vault/--key/--version` flags, from a URL-shaped positional
//! argument, or from a mix of both:
//!
//! ```text
//! https://myvault.vault.azure.net/secrets/db-password/0123abcd
//! akv://myvault/db-password
//! ```
//!
//! URL components take precedence over flags for the parts they provide.

use thiserror::Error;
use url::Url;

/// DNS suffix appended to bare vault names.
pub const VAULT_DNS_SUFFIX: &str = ".vault.azure.net";

/// Vault DNS suffixes of the public and sovereign clouds. Names already
/// ending in one of these are left untouched.
const KNOWN_VAULT_SUFFIXES: [&str; 4] =
    [".vault.azure.net", ".vault.azure.cn", ".vault.usgovcloudapi.net", ".vault.microsoftazure.de"];

/// Errors raised while building a [`SecretAddress`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid secret URL '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("unsupported scheme '{scheme}' (expected https or akv)")]
    UnsupportedScheme { scheme: String },

    #[error("vault name is required (use --vault or a secret URL)")]
    MissingVault,

    #[error("secret key is required (use --key or a secret URL)")]
    MissingKey,
}

impl AddressError {
    fn invalid(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAddress { input: input.to_string(), reason: reason.into() }
    }
}

/// Partially specified locator, before defaults and validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub vault: Option<String>,
    pub key: Option<String>,
    pub version: Option<String>,
}

impl AddressParts {
    /// Parses `https://` or `akv://` secret URLs.
    ///
    /// The host becomes the vault. The path, with surrounding slashes and an
    /// optional `secrets/` prefix removed, is split into key and version.
    pub fn parse_url(input: &str) -> Result<Self, AddressError> {
        let url = Url::parse(input).map_err(|err| AddressError::invalid(input, err.to_string()))?;

        match url.scheme() {
            "https" | "akv" => {}
            other => return Err(AddressError::UnsupportedScheme { scheme: other.to_string() }),
        }

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| AddressError::invalid(input, "missing vault host"))?;

        let path = url.path().trim_matches('/');
        let path = path.strip_prefix("secrets/").unwrap_or(path);
        let path = if path == "secrets" { "" } else { path };

        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let key = segments.next().map(str::to_string);
        let version = segments.next().map(str::to_string);
        if segments.next().is_some() {
            return Err(AddressError::invalid(input, "unexpected path segments after the version"));
        }

        Ok(Self { vault: Some(host.to_string()), key, version })
    }

    /// Combines an optional positional URL with flag values.
    pub fn from_sources(
        url: Option<&str>,
        vault: Option<&str>,
        key: Option<&str>,
        version: Option<&str>,
    ) -> Result<Self, AddressError> {
        let flags = Self {
            vault: non_empty(vault),
            key: non_empty(key),
            version: non_empty(version),
        };

        match url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => Ok(Self::parse_url(url)?.or(flags)),
            None => Ok(flags),
        }
    }

    /// Fills the parts this locator lacks from `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            vault: self.vault.or(fallback.vault),
            key: self.key.or(fallback.key),
            version: self.version.or(fallback.version),
        }
    }

    /// Requires a vault, ignoring key and version.
    pub fn vault(&self) -> Result<VaultHost, AddressError> {
        self.vault.as_deref().map(VaultHost::new).ok_or(AddressError::MissingVault)
    }

    /// Requires both vault and key.
    pub fn into_address(self) -> Result<SecretAddress, AddressError> {
        let vault = self.vault()?;
        let key = self.key.ok_or(AddressError::MissingKey)?;
        Ok(SecretAddress { vault, key, version: self.version })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

/// Fully-qualified vault host name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHost(String);

impl VaultHost {
    /// Normalizes a vault name, appending [`VAULT_DNS_SUFFIX`] unless the
    /// name already carries a known vault suffix.
    pub fn new(name: &str) -> Self {
        let name = name.trim().trim_end_matches('.').to_ascii_lowercase();
        if KNOWN_VAULT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            Self(name)
        } else {
            Self(format!("{}{}", name, VAULT_DNS_SUFFIX))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `https://<host>`
    pub fn url(&self) -> String {
        format!("https://{}", self.0)
    }

    /// OAuth scope for the vault's cloud, e.g. `https://vault.azure.net/.default`.
    pub fn scope(&self) -> String {
        let dns_suffix = self.0.split_once('.').map(|(_, rest)| rest).unwrap_or(&self.0);
        format!("https://{}/.default", dns_suffix)
    }
}

impl std::fmt::Display for VaultHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vault, key and optional version of one secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretAddress {
    pub vault: VaultHost,
    pub key: String,
    pub version: Option<String>,
}

impl SecretAddress {
    pub fn new(vault: &str, key: impl Into<String>, version: Option<String>) -> Self {
        Self { vault: VaultHost::new(vault), key: key.into(), version }
    }

    /// Parses a complete secret URL.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        AddressParts::parse_url(input)?.into_address()
    }
}

impl std::fmt::Display for SecretAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}/secrets/{}/{}", self.vault.url(), self.key, version),
            None => write!(f, "{}/secrets/{}", self.vault.url(), self.key),
        }
    }
}
