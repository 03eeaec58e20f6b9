//! `rm` and `purge`.

use super::exit::{CommandFailure, CommandResult, ExitStatus, OrExit};
use super::prompt::confirm;
use super::target::{AuthArgs, LocatorArgs, Session};
use crate::vault::{purge_when_deleted, PurgeWait, SecretVault, VaultError};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::info;

#[derive(Debug, Args)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub locator: LocatorArgs,

    /// Remove without asking for confirmation
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Permanently delete the secret once removed
    #[arg(short = 'p', long)]
    pub purge: bool,

    #[command(flatten)]
    pub auth: AuthArgs,
}

#[derive(Debug, Args)]
pub struct PurgeArgs {
    #[command(flatten)]
    pub locator: LocatorArgs,

    /// Purge without asking for confirmation
    #[arg(short = 'f', long)]
    pub force: bool,

    #[command(flatten)]
    pub auth: AuthArgs,
}

fn ask(question: &str, force: bool) -> CommandResult {
    if force {
        return Ok(());
    }
    match confirm(question).or_exit(ExitStatus::Error)? {
        true => Ok(()),
        false => Err(CommandFailure::cancelled()),
    }
}

fn remove_failure(err: VaultError) -> CommandFailure {
    let status = match &err {
        VaultError::Credential(_) => ExitStatus::InvalidCredentials,
        _ => ExitStatus::RemoveFailed,
    };
    CommandFailure::new(status, err)
}

pub async fn handle_remove_command(args: RemoveArgs, quiet: bool) -> CommandResult {
    let address = args.locator.address(None)?;
    let session = Session::load()?;
    let client = session.vault_client(&address.vault, args.auth).await?;

    ask("Delete secret", args.force)?;

    match client.delete_secret(&address.key).await {
        Ok(deleted) => {
            info!(key = %address.key, scheduled_purge_at = ?deleted.scheduled_purge_at, "Secret removed");
            if args.purge {
                purge_when_deleted(&client, &address.key, PurgeWait::default()).await.map_err(remove_failure)?;
            }
            if !quiet {
                let verb = if args.purge { "removed and purged" } else { "removed" };
                eprintln!("{}", format!("Secret {} {} from {}.", address.key, verb, address.vault).green());
            }
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            if !quiet {
                eprintln!("Secret {} already removed from {}.", address.key, address.vault);
            }
            Ok(())
        }
        Err(err) => Err(remove_failure(err)),
    }
}

pub async fn handle_purge_command(args: PurgeArgs, quiet: bool) -> CommandResult {
    let address = args.locator.address(None)?;
    let session = Session::load()?;
    let client = session.vault_client(&address.vault, args.auth).await?;

    ask("Purge secret", args.force)?;

    match client.purge_deleted_secret(&address.key).await {
        Ok(()) => {
            if !quiet {
                eprintln!("{}", format!("Secret {} purged from {}.", address.key, address.vault).green());
            }
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            if !quiet {
                eprintln!("Secret {} already purged from {}.", address.key, address.vault);
            }
            Ok(())
        }
        Err(err) => Err(remove_failure(err)),
    }
}
