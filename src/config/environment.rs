//! Layered environment lookups.
//!
//! Credential configuration comes from two layers: the process environment
//! (base) and the overlay file in the configuration directory. The base layer
//! always wins, and the process environment itself is never modified.

use std::collections::HashMap;

/// Which layer supplied a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Process,
    Overlay,
}

/// Read-only view over the process environment plus an overlay.
#[derive(Debug, Clone, Default)]
pub struct LayeredEnvironment {
    base: HashMap<String, String>,
    overlay: HashMap<String, String>,
}

impl LayeredEnvironment {
    /// Snapshots the current process environment as the base layer.
    /// Variables that are not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        let base = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { base, overlay: HashMap::new() }
    }

    /// Builds an environment from explicit base variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let base = vars.into_iter().map(|(key, value)| (key.into(), value.into())).collect();
        Self { base, overlay: HashMap::new() }
    }

    /// Adds overlay entries. Within the overlay, later entries replace
    /// earlier ones; they never shadow base variables.
    pub fn with_overlay<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overlay.extend(vars.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    /// Value of `key`, base layer first.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup(key).map(|(value, _)| value)
    }

    /// Value of `key` together with the layer it came from.
    pub fn lookup(&self, key: &str) -> Option<(&str, Layer)> {
        if let Some(value) = self.base.get(key) {
            return Some((value.as_str(), Layer::Process));
        }
        self.overlay.get(key).map(|value| (value.as_str(), Layer::Overlay))
    }

    /// Value of `key` when present and not blank.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.trim().is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.non_empty(key).is_some()
    }

    /// `true` or `1`, case-insensitive.
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).map(is_truthy).unwrap_or(false)
    }
}

/// `true` or `1`, case-insensitive, surrounding whitespace ignored.
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
