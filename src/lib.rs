//! # secrets-akv
//!
//! Command line access to Azure Key Vault secrets: read, write, list, remove
//! and purge them, and resolve a secret by creating or rotating it on demand.
//!
//! ## Architecture
//!
//! ```text
//! CLI ──► SecretAddress ──► SecretResolver ──► KeyVaultClient ──► Key Vault REST API
//!              │                                     │
//!        Local config ──► credential chain ──► bearer tokens
//! ```
//!
//! ## Core Components
//!
//! - **Address**: parses `https://` and `akv://` secret URLs plus flag overrides
//! - **Auth**: ordered credential chain (environment, certificate, managed identity,
//!   Azure CLI, device code, browser) with an on-disk authentication record
//! - **Config**: configuration directory, overlay `.env` file and OS secret store
//! - **Secrets**: value generation and the resolve/create/rotate workflow
//! - **Vault**: Key Vault secrets client

pub mod address;
pub mod auth;
pub mod cli;
pub mod config;
pub mod secrets;
pub mod vault;

pub use address::{AddressError, SecretAddress, VaultHost};
pub use secrets::{SecretResolver, SecretString};
pub use vault::{KeyVaultClient, SecretVault};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
