//! # Command Line Interface
//!
//! Reads, writes, lists, removes and resolves Azure Key Vault secrets, and
//! manages the local credential configuration.
//!
//! Every command returns a [`exit::CommandResult`]; the failure carries the
//! process exit status so scripts can tell a missing secret from a bad
//! credential.

pub mod config_cmd;
pub mod duration;
pub mod exit;
pub mod get;
pub mod list;
pub mod output;
pub mod prompt;
pub mod remove;
pub mod resolve;
pub mod set;
pub mod target;

use clap::{Parser, Subcommand};
use exit::{CommandResult, ExitStatus};
use owo_colors::OwoColorize;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "secrets-akv")]
#[command(about = "Resolve, generate, rotate and manage Azure Key Vault secrets")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging and full error chains
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a secret and its attributes
    Get(get::GetArgs),

    /// Create or update a secret
    Set(set::SetArgs),

    /// List secret names
    #[command(alias = "list")]
    Ls(list::ListArgs),

    /// Delete a secret
    #[command(alias = "remove")]
    Rm(remove::RemoveArgs),

    /// Permanently delete a removed secret
    Purge(remove::PurgeArgs),

    /// Print a secret, creating it or rotating it when needed
    Resolve(resolve::ResolveArgs),

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommands,
    },
}

/// Run CLI commands
pub async fn run_cli() -> ExitCode {
    let cli = Cli::parse();

    initialise_logging(cli.debug);

    match dispatch(cli.command, cli.quiet).await {
        Ok(()) => ExitStatus::Ok.into(),
        Err(failure) => {
            if cli.debug {
                eprintln!("{} {:?}", "Error:".red(), failure.error);
            } else {
                eprintln!("{} {:#}", "Error:".red(), failure.error);
            }
            failure.status.into()
        }
    }
}

async fn dispatch(command: Commands, quiet: bool) -> CommandResult {
    match command {
        Commands::Get(args) => get::handle_get_command(args).await,
        Commands::Set(args) => set::handle_set_command(args, quiet).await,
        Commands::Ls(args) => list::handle_list_command(args).await,
        Commands::Rm(args) => remove::handle_remove_command(args, quiet).await,
        Commands::Purge(args) => remove::handle_purge_command(args, quiet).await,
        Commands::Resolve(args) => resolve::handle_resolve_command(args).await,
        Commands::Config { command } => config_cmd::handle_config_command(command, quiet).await,
    }
}

/// Logs go to stderr so stdout stays pipeable. `RUST_LOG` wins over `--debug`.
fn initialise_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_env_filter(filter).with_writer(std::io::stderr).finish(),
    )
    .is_err()
    {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases_and_global_flags_parse() {
        let cli = Cli::try_parse_from(["secrets-akv", "list", "-v", "kv", "-q"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Ls(_)));

        let cli = Cli::try_parse_from(["secrets-akv", "-d", "remove", "akv://kv/db", "--force"]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Commands::Rm(args) => {
                assert!(args.force);
                assert_eq!(args.locator.url.as_deref(), Some("akv://kv/db"));
            }
            _ => panic!("expected rm"),
        }
    }

    #[test]
    fn get_value_subcommand_takes_its_own_target() {
        let cli = Cli::try_parse_from(["secrets-akv", "get", "value", "akv://kv/db", "-V", "v2"]).unwrap();
        match cli.command {
            Commands::Get(args) => match args.command {
                Some(get::GetCommands::Value(target)) => {
                    assert_eq!(target.locator.url.as_deref(), Some("akv://kv/db"));
                    assert_eq!(target.version.as_deref(), Some("v2"));
                }
                None => panic!("expected get value"),
            },
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn interactive_and_device_code_conflict() {
        assert!(Cli::try_parse_from(["secrets-akv", "get", "akv://kv/db", "-i", "-D"]).is_err());
    }
}
