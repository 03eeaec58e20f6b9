//! `set` and `set value`.

use super::duration::parse_time_spec;
use super::exit::{CommandFailure, CommandResult, ExitStatus, OrExit};
use super::target::{AuthArgs, LocatorArgs, Session};
use crate::config::LayeredEnvironment;
use crate::secrets::SecretString;
use crate::vault::{SecretPropertiesUpdate, SecretVault, SetSecretParameters, Tags, VaultError};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::debug;

#[derive(Debug, Args)]
pub struct SetArgs {
    #[command(subcommand)]
    pub command: Option<SetCommands>,

    #[command(flatten)]
    pub locator: LocatorArgs,

    #[command(flatten)]
    pub value: ValueArgs,

    /// Expiry: RFC 3339 timestamp or a duration from now (90d, 1y6mo, 12h)
    #[arg(short = 'e', long)]
    pub expires_at: Option<String>,

    /// Activation time: RFC 3339 timestamp or a duration from now
    #[arg(short = 'b', long, visible_alias = "starts-at")]
    pub not_before: Option<String>,

    /// Tag as key=value or key; repeatable, comma-separated lists allowed
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,

    /// Content type of the value
    #[arg(short = 'c', long)]
    pub content_type: Option<String>,

    #[command(flatten)]
    pub auth: AuthArgs,
}

#[derive(Debug, Subcommand)]
pub enum SetCommands {
    /// Set only the value of a secret
    Value(SetValueArgs),
}

#[derive(Debug, Args)]
pub struct SetValueArgs {
    #[command(flatten)]
    pub locator: LocatorArgs,

    /// Secret value
    #[arg(value_name = "VALUE")]
    pub positional: Option<String>,

    #[command(flatten)]
    pub value: ValueArgs,

    #[command(flatten)]
    pub auth: AuthArgs,
}

/// Where a new value comes from. The first one given wins, in field order.
#[derive(Debug, Clone, Default, Args)]
pub struct ValueArgs {
    /// Value of the secret
    #[arg(short = 'V', long)]
    pub value: Option<String>,

    /// Read the value from stdin (surrounding whitespace is trimmed)
    #[arg(short = 's', long)]
    pub stdin: bool,

    /// Read the value from a file
    #[arg(short = 'f', long)]
    pub value_file: Option<PathBuf>,

    /// Read the value from an environment variable
    #[arg(short = 'a', long)]
    pub value_variable: Option<String>,
}

impl ValueArgs {
    /// Empty sources count as absent.
    pub async fn read(&self, env: &LayeredEnvironment) -> anyhow::Result<Option<SecretString>> {
        if let Some(value) = self.value.as_deref().filter(|value| !value.is_empty()) {
            return Ok(Some(SecretString::new(value)));
        }

        if self.stdin {
            let mut buffer = String::new();
            tokio::io::stdin().read_to_string(&mut buffer).await.context("Error reading from stdin")?;
            let value = SecretString::new(buffer.trim());
            buffer.clear();
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }

        if let Some(path) = &self.value_file {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Error reading file {}", path.display()))?;
            if !contents.is_empty() {
                return Ok(Some(SecretString::new(contents)));
            }
        }

        if let Some(name) = &self.value_variable {
            if let Some(value) = env.non_empty(name) {
                return Ok(Some(SecretString::new(value)));
            }
            debug!(variable = %name, "Value variable is unset or empty");
        }

        Ok(None)
    }
}

/// Splits `--tag` values into a tag map. `key` alone maps to no value.
pub fn parse_tags(values: &[String]) -> anyhow::Result<Tags> {
    let mut tags = Tags::new();
    for entry in values.iter().flat_map(|value| value.split(',')) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, value) = match entry.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim().to_string())),
            None => (entry, None),
        };
        if name.is_empty() {
            anyhow::bail!("Invalid tag '{}': missing name", entry);
        }
        tags.insert(name.to_string(), value);
    }
    Ok(tags)
}

/// Attribute and tag changes requested on the command line.
fn requested_update(args: &SetArgs, now: DateTime<Utc>) -> anyhow::Result<SecretPropertiesUpdate> {
    let expires_at = args.expires_at.as_deref().map(|value| parse_time_spec(value, now)).transpose()?;
    let starts_at = args.not_before.as_deref().map(|value| parse_time_spec(value, now)).transpose()?;
    let tags = if args.tags.is_empty() { None } else { Some(parse_tags(&args.tags)?) };
    Ok(SecretPropertiesUpdate { content_type: args.content_type.clone(), enabled: None, expires_at, starts_at, tags })
}

pub async fn handle_set_command(args: SetArgs, quiet: bool) -> CommandResult {
    if let Some(SetCommands::Value(value_args)) = args.command {
        return set_value(value_args, quiet).await;
    }

    let address = args.locator.address(None)?;
    let update = requested_update(&args, Utc::now()).or_exit(ExitStatus::Error)?;
    let session = Session::load()?;
    let value = args.value.read(&session.env).await.or_exit(ExitStatus::Error)?;

    if value.is_none() && update.is_empty() {
        return Err(CommandFailure::msg(
            ExitStatus::Error,
            "Nothing to set. Provide a value (--value, --stdin, --value-file, --value-variable), --expires-at, --not-before, --tag or --content-type.",
        ));
    }

    let client = session.vault_client(&address.vault, args.auth).await?;
    let record = match value {
        Some(value) => {
            let params = SetSecretParameters {
                value,
                content_type: update.content_type,
                enabled: None,
                expires_at: update.expires_at,
                starts_at: update.starts_at,
                tags: update.tags,
            };
            client.set_secret(&address.key, &params).await
        }
        None => client.update_secret_properties(&address.key, None, &update).await,
    }
    .map_err(set_failure)?;

    report(record.version.as_deref(), quiet);
    Ok(())
}

async fn set_value(args: SetValueArgs, quiet: bool) -> CommandResult {
    let address = args.locator.address(None)?;
    let session = Session::load()?;

    let value = match args.positional.filter(|value| !value.is_empty()) {
        Some(value) => SecretString::new(value),
        None => args.value.read(&session.env).await.or_exit(ExitStatus::Error)?.ok_or_else(|| {
            CommandFailure::msg(
                ExitStatus::Error,
                "Value must be specified. Use --value, --stdin, --value-file, --value-variable, or provide it as an argument.",
            )
        })?,
    };

    let client = session.vault_client(&address.vault, args.auth).await?;
    let record = client
        .set_secret(&address.key, &SetSecretParameters::value(value))
        .await
        .map_err(set_failure)?;

    report(record.version.as_deref(), quiet);
    Ok(())
}

fn report(version: Option<&str>, quiet: bool) {
    if !quiet {
        eprintln!("{} version: {}", "Secret set successfully.".green(), version.unwrap_or_default());
    }
}

fn set_failure(err: VaultError) -> CommandFailure {
    let status = match &err {
        VaultError::Credential(_) => ExitStatus::InvalidCredentials,
        _ => ExitStatus::SetFailed,
    };
    CommandFailure::new(status, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn set_args(expires_at: Option<&str>, tags: &[&str]) -> SetArgs {
        SetArgs {
            command: None,
            locator: LocatorArgs::default(),
            value: ValueArgs::default(),
            expires_at: expires_at.map(str::to_string),
            not_before: None,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            content_type: None,
            auth: AuthArgs::default(),
        }
    }

    #[test]
    fn tags_accept_lists_and_bare_keys() {
        let tags = parse_tags(&["env=prod,owner=platform".into(), "auto-rotate=true".into(), "pinned".into()])
            .unwrap();

        assert_eq!(tags.get("env"), Some(&Some("prod".to_string())));
        assert_eq!(tags.get("owner"), Some(&Some("platform".to_string())));
        assert_eq!(tags.get("auto-rotate"), Some(&Some("true".to_string())));
        assert_eq!(tags.get("pinned"), Some(&None));
    }

    #[test]
    fn tag_without_name_is_rejected() {
        assert!(parse_tags(&["=value".into()]).is_err());
    }

    #[test]
    fn relative_expiry_is_anchored_at_now() {
        let now = Utc::now();
        let update = requested_update(&set_args(Some("90d"), &["a=b"]), now).unwrap();

        assert_eq!(update.expires_at, Some(now + Duration::days(90)));
        assert!(update.tags.is_some());
        assert!(!update.is_empty());
    }

    #[test]
    fn no_flags_is_an_empty_update() {
        assert!(requested_update(&set_args(None, &[]), Utc::now()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn value_sources_in_precedence_order() {
        let env = LayeredEnvironment::from_vars([("FROM_VAR", "var-value"), ("EMPTY", "")]);

        let args = ValueArgs { value: Some("flag".into()), value_variable: Some("FROM_VAR".into()), ..Default::default() };
        assert_eq!(args.read(&env).await.unwrap().unwrap().expose_secret(), "flag");

        let args = ValueArgs { value: Some(String::new()), value_variable: Some("FROM_VAR".into()), ..Default::default() };
        assert_eq!(args.read(&env).await.unwrap().unwrap().expose_secret(), "var-value");

        let args = ValueArgs { value_variable: Some("EMPTY".into()), ..Default::default() };
        assert!(args.read(&env).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn value_file_is_read_verbatim() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("value.txt");
        std::fs::write(&path, "line one\nline two\n").unwrap();

        let args = ValueArgs { value_file: Some(path), ..Default::default() };
        let value = args.read(&LayeredEnvironment::default()).await.unwrap().unwrap();

        assert_eq!(value.expose_secret(), "line one\nline two\n");
    }
}
