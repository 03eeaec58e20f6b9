//! Configuration management CLI commands
//!
//! Manages the overlay `.env` file in the configuration directory. Client
//! secrets and certificate passwords go to the OS secret store; the overlay
//! only records which account holds them.

use super::exit::{CommandFailure, CommandResult, ExitStatus, OrExit};
use crate::config::{default_secret_store, ConfigError, ConfigPaths, OverlayFile, SecretStore, Setting};
use crate::secrets::SecretString;
use clap::Subcommand;
use owo_colors::OwoColorize;
use tracing::{info, warn};

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set {
        /// Configuration name: tenant, client.id, client.secret, client.certificate.path,
        /// client.certificate.password, identity, authority.host (or the AZURE_* variable name)
        name: String,

        /// Configuration value
        value: String,
    },

    /// Print a configuration value
    Get {
        /// Configuration name
        name: String,
    },

    /// Remove a configuration value
    Rm {
        /// Configuration name
        name: String,
    },

    /// Print the configuration file path
    Path,
}

/// Handle config commands
pub async fn handle_config_command(command: ConfigCommands, quiet: bool) -> CommandResult {
    let paths = ConfigPaths::discover().or_exit(ExitStatus::ConfigFailed)?;
    let store = default_secret_store();

    match command {
        ConfigCommands::Set { name, value } => {
            let overlay = set_setting(&paths, store.as_ref(), &name, SecretString::new(value))
                .map_err(config_failure)?;
            if !quiet {
                eprintln!("{} {}", "Configuration saved to:".green(), overlay.path().display());
            }
        }
        ConfigCommands::Get { name } => {
            println!("{}", get_setting(&paths, &name).map_err(config_failure)?);
        }
        ConfigCommands::Rm { name } => {
            remove_setting(&paths, store.as_ref(), &name).map_err(config_failure)?;
        }
        ConfigCommands::Path => println!("{}", paths.overlay_file().display()),
    }

    Ok(())
}

fn config_failure(err: ConfigError) -> CommandFailure {
    let status = match err {
        ConfigError::NotFound { .. } => ExitStatus::ConfigNotFound,
        _ => ExitStatus::ConfigFailed,
    };
    CommandFailure::new(status, err)
}

/// Stores `value` under `name`. Secret-valued settings are written to the
/// OS secret store first; the overlay is only touched once that succeeded.
pub fn set_setting(
    paths: &ConfigPaths,
    store: &dyn SecretStore,
    name: &str,
    value: SecretString,
) -> Result<OverlayFile, ConfigError> {
    let setting = Setting::lookup(name)?;
    let overlay = OverlayFile::new(paths.overlay_file());

    match setting {
        Setting::Plain { key } => overlay.set(key, value.expose_secret())?,
        Setting::Secret(reference) => {
            store.set(reference.default_account, &value)?;
            overlay.set(reference.reference_key, reference.default_account)?;
            info!(variable = reference.target_key, "Stored secret in the OS secret store");
        }
    }

    Ok(overlay)
}

/// Overlay value for `name`. For secret-valued settings this is the secret
/// store account, never the secret.
pub fn get_setting(paths: &ConfigPaths, name: &str) -> Result<String, ConfigError> {
    let setting = Setting::lookup(name)?;
    let overlay = OverlayFile::new(paths.overlay_file());
    if !overlay.exists() {
        return Err(ConfigError::not_found(name));
    }
    overlay.get(setting.overlay_key())?.ok_or_else(|| ConfigError::not_found(name))
}

/// Removes `name` from the overlay and, for secret-valued settings, the
/// referenced secret store entry.
pub fn remove_setting(paths: &ConfigPaths, store: &dyn SecretStore, name: &str) -> Result<(), ConfigError> {
    let setting = Setting::lookup(name)?;
    let overlay = OverlayFile::new(paths.overlay_file());
    if !overlay.exists() {
        return Err(ConfigError::not_found(name));
    }

    let reference_value = overlay.get(setting.overlay_key())?;
    if !overlay.remove(setting.overlay_key())? {
        return Err(ConfigError::not_found(name));
    }

    if let (Setting::Secret(reference), Some(value)) = (setting, reference_value) {
        let account = reference.account(&value);
        match store.delete(account) {
            Ok(_) => info!(account = account, "Removed OS secret store entry"),
            Err(err) => warn!(account = account, error = %err, "Could not remove OS secret store entry"),
        }
    }
    Ok(())
}
