//! # Vault Client
//!
//! Thin async client over the Key Vault secrets REST API. Everything above
//! this module talks to the [`SecretVault`] trait so that the resolver and
//! the CLI can be exercised against an in-process fake.

pub mod client;
pub mod error;
pub mod models;

pub use client::{delete_and_purge, purge_when_deleted, KeyVaultClient, PurgeWait, SecretVault, API_VERSION};
pub use error::{Result, VaultError};
pub use models::{
    DeletedSecret, SecretProperties, SecretPropertiesUpdate, SecretRecord, SetSecretParameters, Tags,
    AUTO_ROTATE_TAG,
};
