//! Output formatting for commands that print structured data.

use crate::vault::{SecretRecord, Tags};
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::ValueEnum;
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single-line JSON
    #[default]
    Json,
    /// Indented JSON
    Pretty,
    Yaml,
}

/// Print data in the specified OutputFormat
pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    println!("{}", render(data, format)?);
    Ok(())
}

pub fn render<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(data).context("Failed to serialize to JSON")?,
        OutputFormat::Pretty => {
            serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(data).context("Failed to serialize to YAML")?;
            yaml.trim_end().to_string()
        }
    };
    Ok(rendered)
}

/// What `get` prints for a secret, value included.
#[derive(Debug, Serialize)]
pub struct SecretView<'a> {
    pub key: &'a str,
    pub value: &'a str,
    #[serde(skip_serializing_if = "no_tags")]
    pub tags: &'a Tags,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'a str>,
}

fn no_tags(tags: &&Tags) -> bool {
    tags.is_empty()
}

impl<'a> From<&'a SecretRecord> for SecretView<'a> {
    fn from(record: &'a SecretRecord) -> Self {
        Self {
            key: &record.key,
            value: record.value.expose_secret(),
            tags: &record.tags,
            enabled: record.enabled,
            version: record.version.as_deref(),
            expires_at: record.expires_at.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            starts_at: record.starts_at.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            content_type: record.content_type.as_deref(),
        }
    }
}
