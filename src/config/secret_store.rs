//! OS-native secret storage for credential material referenced by the overlay.
//!
//! The overlay file never holds client secrets or certificate passwords in
//! clear. It holds a reference (`AZURE_CLIENT_SECRET_KEY=CLIENT_SECRET`) naming
//! an account in the OS secret store under [`SECRET_STORE_SERVICE`].

use super::error::{ConfigError, Result};
use crate::secrets::SecretString;
use std::collections::HashMap;
use std::sync::Mutex;

/// Service name used for every OS secret store entry.
pub const SECRET_STORE_SERVICE: &str = "secrets-akv";

/// Account-keyed secret storage.
pub trait SecretStore: Send + Sync {
    /// Returns `Ok(None)` when the account has no entry.
    fn get(&self, account: &str) -> Result<Option<SecretString>>;

    fn set(&self, account: &str, value: &SecretString) -> Result<()>;

    /// Returns whether an entry existed.
    fn delete(&self, account: &str) -> Result<bool>;
}

/// Secret store backed by the platform keychain.
#[cfg(feature = "os-keyring")]
#[derive(Debug, Clone)]
pub struct OsSecretStore {
    service: String,
}

#[cfg(feature = "os-keyring")]
impl OsSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, account).map_err(map_keyring_error)
    }
}

#[cfg(feature = "os-keyring")]
impl Default for OsSecretStore {
    fn default() -> Self {
        Self::new(SECRET_STORE_SERVICE)
    }
}

#[cfg(feature = "os-keyring")]
fn map_keyring_error(err: keyring::Error) -> ConfigError {
    match err {
        keyring::Error::PlatformFailure(source) | keyring::Error::NoStorageAccess(source) => {
            ConfigError::secret_store_unavailable(source.to_string())
        }
        other => ConfigError::secret_store(other.to_string()),
    }
}

#[cfg(feature = "os-keyring")]
impl SecretStore for OsSecretStore {
    fn get(&self, account: &str) -> Result<Option<SecretString>> {
        match self.entry(account)?.get_password() {
            Ok(password) => Ok(Some(SecretString::new(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(map_keyring_error(err)),
        }
    }

    fn set(&self, account: &str, value: &SecretString) -> Result<()> {
        self.entry(account)?.set_password(value.expose_secret()).map_err(map_keyring_error)
    }

    fn delete(&self, account: &str) -> Result<bool> {
        match self.entry(account)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(map_keyring_error(err)),
        }
    }
}

/// Stand-in used when the binary is built without an OS secret store.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSecretStore;

impl SecretStore for UnavailableSecretStore {
    fn get(&self, _account: &str) -> Result<Option<SecretString>> {
        Err(ConfigError::secret_store_unavailable("built without the os-keyring feature"))
    }

    fn set(&self, _account: &str, _value: &SecretString) -> Result<()> {
        Err(ConfigError::secret_store_unavailable("built without the os-keyring feature"))
    }

    fn delete(&self, _account: &str) -> Result<bool> {
        Err(ConfigError::secret_store_unavailable("built without the os-keyring feature"))
    }
}

/// In-process store, for embedding callers and tests.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, SecretString>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, account: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(account.to_string(), SecretString::new(value));
        }
        self
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, account: &str) -> Result<Option<SecretString>> {
        let entries = self.entries.lock().map_err(|_| ConfigError::secret_store("lock poisoned"))?;
        Ok(entries.get(account).cloned())
    }

    fn set(&self, account: &str, value: &SecretString) -> Result<()> {
        let mut entries =
            self.entries.lock().map_err(|_| ConfigError::secret_store("lock poisoned"))?;
        entries.insert(account.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, account: &str) -> Result<bool> {
        let mut entries =
            self.entries.lock().map_err(|_| ConfigError::secret_store("lock poisoned"))?;
        Ok(entries.remove(account).is_some())
    }
}

/// The platform store when compiled in, otherwise [`UnavailableSecretStore`].
pub fn default_secret_store() -> Box<dyn SecretStore> {
    #[cfg(feature = "os-keyring")]
    {
        Box::new(OsSecretStore::default())
    }

    #[cfg(not(feature = "os-keyring"))]
    {
        Box::new(UnavailableSecretStore)
    }
}
