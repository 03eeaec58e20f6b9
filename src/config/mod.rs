//! # Local Configuration
//!
//! Everything this tool keeps on the local machine between invocations:
//!
//! - the configuration directory and its owner-only files ([`paths`])
//! - the overlay `.env` file of `AZURE_*` settings ([`overlay`])
//! - the layered view of process environment plus overlay ([`environment`])
//! - OS secret store references for client secrets ([`secret_store`], [`settings`])

pub mod environment;
pub mod error;
pub mod overlay;
pub mod paths;
pub mod secret_store;
pub mod settings;

pub use environment::{is_truthy, Layer, LayeredEnvironment};
pub use error::{ConfigError, Result};
pub use overlay::OverlayFile;
pub use paths::{write_private_file, ConfigPaths};
pub use secret_store::{default_secret_store, MemorySecretStore, SecretStore, UnavailableSecretStore};
pub use settings::{SecretReference, Setting, SECRET_REFERENCES};

use tracing::{debug, warn};

/// Process environment layered over the overlay file in `paths`.
pub fn load_environment(paths: &ConfigPaths, store: &dyn SecretStore) -> LayeredEnvironment {
    layer_overlay(LayeredEnvironment::from_process(), &OverlayFile::new(paths.overlay_file()), store)
}

/// Adds the overlay file's entries beneath `env`.
///
/// Secret references are resolved through `store` unless the target variable
/// is already set in `env`. An unreadable overlay or an unavailable store is
/// logged and skipped; neither fails the invocation.
pub fn layer_overlay(
    env: LayeredEnvironment,
    overlay: &OverlayFile,
    store: &dyn SecretStore,
) -> LayeredEnvironment {
    let entries = match overlay.load() {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %overlay.path().display(), error = %err, "Ignoring unreadable overlay file");
            return env;
        }
    };

    let mut resolved = Vec::new();
    for reference in SECRET_REFERENCES {
        if env.get(reference.target_key).is_some() {
            continue;
        }

        let Some((_, value)) = entries.iter().rev().find(|(key, _)| key == reference.reference_key)
        else {
            continue;
        };

        let account = reference.account(value);
        match store.get(account) {
            Ok(Some(secret)) => {
                debug!(variable = reference.target_key, "Resolved overlay secret reference");
                resolved.push((reference.target_key.to_string(), secret.expose_secret().to_string()));
            }
            Ok(None) => warn!(
                variable = reference.target_key,
                account = account,
                "Overlay references a secret store entry that does not exist"
            ),
            Err(err) => debug!(
                variable = reference.target_key,
                error = %err,
                "Skipping overlay secret reference"
            ),
        }
    }

    env.with_overlay(entries).with_overlay(resolved)
}
