//! `get` and `get value`.

use super::exit::{CommandFailure, CommandResult, ExitStatus};
use super::output::{print_output, OutputFormat, SecretView};
use super::target::{AuthArgs, LocatorArgs, Session};
use crate::vault::{SecretRecord, SecretVault, VaultError};
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct GetArgs {
    #[command(subcommand)]
    pub command: Option<GetCommands>,

    #[command(flatten)]
    pub target: GetTarget,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

#[derive(Debug, Subcommand)]
pub enum GetCommands {
    /// Print only the secret value
    Value(GetTarget),
}

#[derive(Debug, Clone, Args)]
pub struct GetTarget {
    #[command(flatten)]
    pub locator: LocatorArgs,

    /// Secret version (latest when omitted)
    #[arg(short = 'V', long)]
    pub version: Option<String>,

    #[command(flatten)]
    pub auth: AuthArgs,
}

pub async fn handle_get_command(args: GetArgs) -> CommandResult {
    match args.command {
        Some(GetCommands::Value(target)) => {
            let record = fetch(&target).await?;
            println!("{}", record.value.expose_secret());
        }
        None => {
            let record = fetch(&args.target).await?;
            print_output(&SecretView::from(&record), args.output)
                .map_err(|err| CommandFailure::new(ExitStatus::GetFailed, err))?;
        }
    }
    Ok(())
}

async fn fetch(target: &GetTarget) -> CommandResult<SecretRecord> {
    let address = target.locator.address(target.version.as_deref())?;
    let session = Session::load()?;
    let client = session.vault_client(&address.vault, target.auth).await?;

    client.get_secret(&address.key, address.version.as_deref()).await.map_err(get_failure)
}

fn get_failure(err: VaultError) -> CommandFailure {
    let status = match &err {
        VaultError::NotFound { .. } => ExitStatus::SecretNotFound,
        VaultError::Credential(_) => ExitStatus::InvalidCredentials,
        _ => ExitStatus::GetFailed,
    };
    CommandFailure::new(status, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialError;

    #[test]
    fn vault_errors_map_to_exit_statuses() {
        assert_eq!(get_failure(VaultError::not_found("db")).status, ExitStatus::SecretNotFound);
        assert_eq!(get_failure(VaultError::service(403, "Forbidden", "no")).status, ExitStatus::GetFailed);
        assert_eq!(
            get_failure(VaultError::Credential(CredentialError::NoSources)).status,
            ExitStatus::InvalidCredentials
        );
    }
}
