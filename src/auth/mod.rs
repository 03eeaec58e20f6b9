//! # Credentials
//!
//! Every credential source implements [`TokenProvider`]. The
//! [`CredentialChainBuilder`] picks sources from the layered environment and
//! wraps them in a [`ChainedCredential`] that falls back in a fixed order:
//!
//! ```text
//! AZURE_IDENTITY=true ──► managed identity (only)
//! otherwise           ──► environment ─► Azure CLI ─► browser | device code
//! ```
//!
//! Interactive sources persist an [`AuthenticationRecord`] so that later
//! invocations attach to the cached account instead of prompting up front.

pub mod azure_cli;
pub mod browser;
pub mod builder;
pub mod certificate;
pub mod chain;
pub mod device_code;
pub mod environment;
pub mod error;
pub mod managed_identity;
pub mod oauth;
pub mod public_client;
pub mod record;
pub mod token;

pub use azure_cli::AzureCliCredential;
pub use browser::{BrowserFlow, InteractiveBrowserCredential};
pub use builder::{attach_interactive, CredentialChainBuilder, InteractiveMode};
pub use certificate::ClientCertificate;
pub use chain::ChainedCredential;
pub use device_code::{DeviceCodeCredential, DeviceCodeFlow, DeviceCodePrompt};
pub use environment::EnvironmentCredential;
pub use error::{CredentialError, CredentialKind, SourceFailure};
pub use managed_identity::{ManagedIdentityCredential, ManagedIdentitySource};
pub use oauth::{Authority, TokenResponse};
pub use public_client::{PublicClient, UserCredential, UserFlow};
pub use record::{AuthenticationRecord, RecordStore};
pub use token::{AccessToken, TokenProvider};
