//! The overlay `.env` file.
//!
//! Reads go through `dotenvy` so quoting and `export` prefixes behave the
//! same as any other dotenv consumer. Edits are line based so comments and
//! unrelated entries survive `config set` and `config rm`.

use super::error::{ConfigError, Result};
use super::paths::write_private_file;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `KEY=value` settings file.
#[derive(Debug, Clone)]
pub struct OverlayFile {
    path: PathBuf,
}

impl OverlayFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// All entries in file order. A missing file yields no entries.
    pub fn load(&self) -> Result<Vec<(String, String)>> {
        if !self.exists() {
            debug!(path = %self.path.display(), "Overlay file not present");
            return Ok(Vec::new());
        }

        let iter = dotenvy::from_path_iter(&self.path)
            .map_err(|err| ConfigError::parse(&self.path, err.to_string()))?;

        iter.map(|item| item.map_err(|err| ConfigError::parse(&self.path, err.to_string())))
            .collect()
    }

    /// Value of `key`, last occurrence wins.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .load()?
            .into_iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value))
    }

    /// Sets `key`, replacing its existing line or appending a new one.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let contents = self.read_raw()?;
        let entry = format!("{}={}", key, quote_value(value));

        let mut replaced = false;
        let mut lines: Vec<String> = Vec::new();
        for line in contents.lines() {
            if line_key(line) == Some(key) {
                if !replaced {
                    lines.push(entry.clone());
                    replaced = true;
                }
            } else {
                lines.push(line.to_string());
            }
        }
        if !replaced {
            lines.push(entry);
        }

        self.write_lines(&lines)
    }

    /// Removes every line for `key`. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }

        let contents = self.read_raw()?;
        let before = contents.lines().count();
        let lines: Vec<String> = contents
            .lines()
            .filter(|line| line_key(line) != Some(key))
            .map(str::to_string)
            .collect();

        if lines.len() == before {
            return Ok(false);
        }
        self.write_lines(&lines)?;
        Ok(true)
    }

    fn read_raw(&self) -> Result<String> {
        if !self.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&self.path).map_err(|err| ConfigError::read(&self.path, err))
    }

    fn write_lines(&self, lines: &[String]) -> Result<()> {
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        write_private_file(&self.path, contents.as_bytes())
    }
}

/// Variable name declared on `line`, if it is an assignment.
fn line_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, _) = line.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.chars().any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\' | '$'));
    if !needs_quotes {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' | '$' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
