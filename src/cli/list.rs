//! `ls`: secret names, optionally filtered by a glob.

use super::exit::{CommandFailure, CommandResult, ExitStatus, OrExit};
use super::target::{address_failure, AuthArgs, LocatorArgs, Session};
use crate::vault::{SecretVault, VaultError};
use clap::Args;
use glob::Pattern;

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub locator: LocatorArgs,

    /// Glob to filter secret names by (e.g. 'db-*'); the URL path also works
    #[arg(short = 's', long)]
    pub query: Option<String>,

    #[command(flatten)]
    pub auth: AuthArgs,
}

/// Names matching `query`, in listing order. No query matches everything.
pub fn filter_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    query: Option<&Pattern>,
) -> Vec<&'a str> {
    names.into_iter().filter(|name| query.map_or(true, |pattern| pattern.matches(name))).collect()
}

pub async fn handle_list_command(args: ListArgs) -> CommandResult {
    let parts = args.locator.parts(None)?;
    let vault = parts.vault().map_err(address_failure)?;
    let query = parts.key.or(args.query).filter(|query| !query.is_empty());
    let pattern = query.as_deref().map(Pattern::new).transpose().or_exit(ExitStatus::Error)?;

    let session = Session::load()?;
    let client = session.vault_client(&vault, args.auth).await?;
    let secrets = client.list_secret_properties().await.map_err(|err| {
        let status = match &err {
            VaultError::Credential(_) => ExitStatus::InvalidCredentials,
            _ => ExitStatus::ListFailed,
        };
        CommandFailure::new(status, err)
    })?;

    for name in filter_names(secrets.iter().map(|secret| secret.key.as_str()), pattern.as_ref()) {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_filters_names() {
        let names = ["db-password", "db-user", "api-key"];
        let pattern = Pattern::new("db-*").unwrap();

        assert_eq!(filter_names(names, Some(&pattern)), vec!["db-password", "db-user"]);
        assert_eq!(filter_names(names, None), names.to_vec());
    }
}
