//! `resolve`: print a secret, creating or rotating it first when needed.

use super::exit::{CommandFailure, CommandResult, ExitStatus};
use super::target::{AuthArgs, LocatorArgs, Session};
use crate::secrets::{GenerationPolicy, ResolveError, ResolveOutcome, SecretResolver, DEFAULT_LENGTH, DEFAULT_SPECIAL_CHARSET};
use crate::vault::VaultError;
use clap::Args;
use tracing::info;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub locator: LocatorArgs,

    /// Secret version to read (latest when omitted)
    #[arg(short = 'V', long)]
    pub version: Option<String>,

    #[command(flatten)]
    pub policy: PolicyArgs,

    #[command(flatten)]
    pub auth: AuthArgs,
}

/// Shape of a generated value.
#[derive(Debug, Clone, Args)]
pub struct PolicyArgs {
    /// Require at least one uppercase letter
    #[arg(short = 'u', long)]
    pub upper: bool,

    /// Require at least one lowercase letter
    #[arg(short = 'l', long)]
    pub lower: bool,

    /// Require at least one digit
    #[arg(short = 'g', long)]
    pub digits: bool,

    /// Do not use or require special characters
    #[arg(short = 'n', long)]
    pub no_special: bool,

    /// Upper, lower, digits and special characters all required
    #[arg(short = 'N', long)]
    pub nist: bool,

    /// Special characters to draw from
    #[arg(short = 's', long, default_value = DEFAULT_SPECIAL_CHARSET)]
    pub special: String,

    /// Draw only from these characters; no class requirements apply
    #[arg(short = 'c', long)]
    pub chars: Option<String>,

    /// Length of the generated value
    #[arg(short = 'z', long, default_value_t = DEFAULT_LENGTH)]
    pub size: usize,
}

impl Default for PolicyArgs {
    fn default() -> Self {
        Self {
            upper: false,
            lower: false,
            digits: false,
            no_special: false,
            nist: false,
            special: DEFAULT_SPECIAL_CHARSET.to_string(),
            chars: None,
            size: DEFAULT_LENGTH,
        }
    }
}

impl PolicyArgs {
    /// Without any of `--upper/--lower/--digits`, all three are required.
    pub fn policy(&self) -> GenerationPolicy {
        if let Some(chars) = &self.chars {
            return GenerationPolicy::custom(self.size, chars.clone());
        }
        if self.nist {
            return GenerationPolicy::nist(self.size);
        }

        let any_class = self.upper || self.lower || self.digits;
        GenerationPolicy {
            length: self.size,
            upper: self.upper || !any_class,
            lower: self.lower || !any_class,
            digits: self.digits || !any_class,
            special: !self.no_special,
            special_charset: self.special.clone(),
            custom_charset: None,
        }
    }
}

/// Maps resolve errors to their exit statuses.
pub fn resolve_failure(err: ResolveError) -> CommandFailure {
    let status = match &err {
        ResolveError::SecretExpired { .. } => ExitStatus::SecretExpired,
        ResolveError::SecretFetchFailed(VaultError::Credential(_))
        | ResolveError::SecretSetFailed(VaultError::Credential(_)) => ExitStatus::InvalidCredentials,
        ResolveError::SecretFetchFailed(_) => ExitStatus::GetFailed,
        ResolveError::SecretGenerateFailed { rotation: true, .. } => ExitStatus::RotationGenerateFailed,
        ResolveError::SecretGenerateFailed { rotation: false, .. } => ExitStatus::GenerateFailed,
        ResolveError::SecretSetFailed(_) => ExitStatus::SetFailed,
    };
    CommandFailure::new(status, err)
}

pub async fn handle_resolve_command(args: ResolveArgs) -> CommandResult {
    let address = args.locator.address(args.version.as_deref())?;
    let policy = args.policy.policy();

    let session = Session::load()?;
    let client = session.vault_client(&address.vault, args.auth).await?;
    let resolved = SecretResolver::new(client).resolve(&address, &policy).await.map_err(resolve_failure)?;

    if resolved.outcome != ResolveOutcome::Existing {
        info!(key = %address.key, outcome = ?resolved.outcome, version = ?resolved.version, "Stored generated secret");
    }
    println!("{}", resolved.value.expose_secret());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::GenerationError;
    use chrono::Utc;

    #[test]
    fn defaults_require_all_alphanumeric_classes_and_special() {
        let policy = PolicyArgs::default().policy();
        assert!(policy.upper && policy.lower && policy.digits && policy.special);
        assert_eq!(policy.length, 16);
        assert_eq!(policy.special_charset, "@#`~_-[]|+=");
    }

    #[test]
    fn explicit_classes_disable_the_others() {
        let policy = PolicyArgs { digits: true, no_special: true, ..Default::default() }.policy();
        assert!(policy.digits && !policy.upper && !policy.lower && !policy.special);
    }

    #[test]
    fn chars_override_everything() {
        let policy = PolicyArgs { chars: Some("xyz".into()), nist: true, size: 8, ..Default::default() }.policy();
        assert_eq!(policy, GenerationPolicy::custom(8, "xyz"));
    }

    #[test]
    fn nist_wins_over_no_special() {
        let policy = PolicyArgs { nist: true, no_special: true, size: 24, ..Default::default() }.policy();
        assert_eq!(policy, GenerationPolicy::nist(24));
    }

    #[test]
    fn resolve_errors_map_to_exit_statuses() {
        let status = |err: ResolveError| resolve_failure(err).status;

        assert_eq!(
            status(ResolveError::SecretExpired { key: "db".into(), expired_at: Utc::now() }),
            ExitStatus::SecretExpired
        );
        assert_eq!(
            status(ResolveError::generate_failed(true, GenerationError::InvalidLength)),
            ExitStatus::RotationGenerateFailed
        );
        assert_eq!(
            status(ResolveError::generate_failed(false, GenerationError::InvalidLength)),
            ExitStatus::GenerateFailed
        );
        assert_eq!(
            status(ResolveError::SecretFetchFailed(VaultError::Transport("reset".into()))),
            ExitStatus::GetFailed
        );
        assert_eq!(
            status(ResolveError::SecretSetFailed(VaultError::service(403, "Forbidden", "no"))),
            ExitStatus::SetFailed
        );
    }
}
