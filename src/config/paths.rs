//! Configuration directory resolution and owner-only file writes.

use super::error::{ConfigError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides the configuration directory entirely.
pub const CONFIG_DIR_ENV: &str = "SECRETS_AKV_CONFIG_DIR";

/// Directory name below the platform configuration directory.
pub const APP_DIR_NAME: &str = "secrets-akv";

/// Overlay file holding `KEY=value` settings.
pub const OVERLAY_FILE_NAME: &str = ".env";

/// Cached interactive login record.
pub const RECORD_FILE_NAME: &str = "credential.cache.json";

/// Locations of the files this tool keeps between invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    dir: PathBuf,
}

impl ConfigPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolves the configuration directory.
    ///
    /// Priority order:
    /// 1. `SECRETS_AKV_CONFIG_DIR`
    /// 2. the platform configuration directory (`$XDG_CONFIG_HOME`,
    ///    `~/.config`, `%APPDATA%`, `~/Library/Application Support`)
    /// 3. the system-wide directory (`/etc/secrets-akv`, `%ProgramData%\secrets-akv`)
    pub fn discover() -> Result<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
            debug!("Using configuration directory from {}", CONFIG_DIR_ENV);
            return Ok(Self::new(dir));
        }

        if let Some(dir) = dirs::config_dir() {
            return Ok(Self::new(dir.join(APP_DIR_NAME)));
        }

        let dir = system_config_dir().ok_or(ConfigError::NoConfigDir)?;
        debug!("No user configuration directory; falling back to {}", dir.display());
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn overlay_file(&self) -> PathBuf {
        self.dir.join(OVERLAY_FILE_NAME)
    }

    pub fn record_file(&self) -> PathBuf {
        self.dir.join(RECORD_FILE_NAME)
    }

    /// Creates the directory, owner-only on unix.
    pub fn ensure_dir(&self) -> Result<()> {
        create_private_dir(&self.dir)
    }
}

#[cfg(unix)]
fn system_config_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/etc").join(APP_DIR_NAME))
}

#[cfg(windows)]
fn system_config_dir() -> Option<PathBuf> {
    std::env::var_os("ProgramData").map(|dir| PathBuf::from(dir).join(APP_DIR_NAME))
}

#[cfg(not(any(unix, windows)))]
fn system_config_dir() -> Option<PathBuf> {
    None
}

/// Creates `dir` and its parents, mode `0700` on unix.
pub fn create_private_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
            .map_err(|err| ConfigError::write(dir, err))
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir).map_err(|err| ConfigError::write(dir, err))
    }
}

/// Writes `contents` to `path`, creating the parent directory. The file is
/// owner read/write only (`0600`) on unix, including when it already existed.
pub fn write_private_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_private_dir(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|err| ConfigError::write(path, err))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|err| ConfigError::write(path, err))?;
    }

    file.write_all(contents).map_err(|err| ConfigError::write(path, err))?;
    file.flush().map_err(|err| ConfigError::write(path, err))
}
