//! # Secret Values
//!
//! Everything that produces or carries a secret value:
//!
//! - [`SecretString`]: redacting, zeroizing wrapper for values in memory
//! - [`generate`]: constrained random values from a [`GenerationPolicy`]
//! - [`SecretResolver`]: get-or-create workflow on top of a
//!   [`SecretVault`](crate::vault::SecretVault)
//!
//! ## Resolve
//!
//! ```rust,ignore
//! use secrets_akv::secrets::{GenerationPolicy, SecretResolver};
//!
//! let resolver = SecretResolver::new(client);
//! let resolved = resolver.resolve(&address, &GenerationPolicy::nist(32)).await?;
//! println!("{}", resolved.value.expose_secret());
//! ```

pub mod error;
pub mod generator;
pub mod resolver;
pub mod types;

pub use error::{GenerationError, ResolveError};
pub use generator::{generate, GenerationPolicy, DEFAULT_LENGTH, DEFAULT_SPECIAL_CHARSET};
pub use resolver::{ResolveOutcome, ResolvedSecret, SecretResolver};
pub use types::SecretString;
