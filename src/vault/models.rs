//! Secret data as exchanged with the vault.
//!
//! `Wire*` types mirror the REST API (camelCase, unix-second timestamps).
//! The public types are what the rest of the crate works with.

use crate::secrets::SecretString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag name to optional value.
pub type Tags = BTreeMap<String, Option<String>>;

/// Tag whose value `"true"` opts a secret into rotation on expiry.
pub const AUTO_ROTATE_TAG: &str = "auto-rotate";

/// One version of a secret, including its value.
#[derive(Debug, Clone)]
pub struct SecretRecord {
    pub key: String,
    pub value: SecretString,
    pub version: Option<String>,
    pub enabled: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub tags: Tags,
}

impl SecretRecord {
    /// `now` is at or past the expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Tag `auto-rotate` is exactly `"true"`.
    pub fn auto_rotate(&self) -> bool {
        matches!(self.tags.get(AUTO_ROTATE_TAG), Some(Some(value)) if value == "true")
    }
}

/// Listing entry; carries no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretProperties {
    pub key: String,
    pub enabled: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub managed: bool,
    pub tags: Tags,
}

/// A soft-deleted secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedSecret {
    pub key: String,
    pub recovery_id: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub scheduled_purge_at: Option<DateTime<Utc>>,
}

/// Inputs to creating a new secret version.
#[derive(Debug, Clone, Default)]
pub struct SetSecretParameters {
    pub value: SecretString,
    pub content_type: Option<String>,
    pub enabled: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub tags: Option<Tags>,
}

impl SetSecretParameters {
    /// Only a value; no attributes or tags.
    pub fn value(value: SecretString) -> Self {
        Self { value, ..Default::default() }
    }
}

/// Attribute and tag changes for an existing version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPropertiesUpdate {
    pub content_type: Option<String>,
    pub enabled: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub tags: Option<Tags>,
}

impl SecretPropertiesUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// REST representations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing)]
    pub created: Option<i64>,
    #[serde(default, skip_serializing)]
    pub updated: Option<i64>,
}

impl WireAttributes {
    fn from_parts(
        enabled: Option<bool>,
        starts_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        if enabled.is_none() && starts_at.is_none() && expires_at.is_none() {
            return None;
        }
        Some(Self {
            enabled,
            nbf: starts_at.map(|at| at.timestamp()),
            exp: expires_at.map(|at| at.timestamp()),
            ..Default::default()
        })
    }
}

fn from_unix(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
}

/// Splits `https://<vault>/secrets/<name>/<version>` into name and version.
pub(crate) fn parse_secret_id(id: &str) -> (String, Option<String>) {
    let path = url::Url::parse(id).map(|url| url.path().to_string()).unwrap_or_default();
    let mut segments = path.trim_matches('/').split('/').skip(1);
    let name = segments.next().unwrap_or_default().to_string();
    let version = segments.next().filter(|version| !version.is_empty()).map(str::to_string);
    (name, version)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireSecretBundle {
    #[serde(default)]
    pub value: Option<SecretString>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub attributes: WireAttributes,
    #[serde(default)]
    pub tags: Option<Tags>,
}

impl WireSecretBundle {
    pub fn into_record(self, requested_key: &str) -> SecretRecord {
        let (key, version) = match self.id.as_deref().map(parse_secret_id) {
            Some((name, version)) if !name.is_empty() => (name, version),
            _ => (requested_key.to_string(), None),
        };
        SecretRecord {
            key,
            value: self.value.unwrap_or_default(),
            version,
            enabled: self.attributes.enabled.unwrap_or(true),
            expires_at: from_unix(self.attributes.exp),
            starts_at: from_unix(self.attributes.nbf),
            created_at: from_unix(self.attributes.created),
            updated_at: from_unix(self.attributes.updated),
            content_type: self.content_type,
            tags: self.tags.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireSecretItem {
    pub id: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub attributes: WireAttributes,
    #[serde(default)]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub managed: Option<bool>,
}

impl From<WireSecretItem> for SecretProperties {
    fn from(item: WireSecretItem) -> Self {
        Self {
            key: parse_secret_id(&item.id).0,
            enabled: item.attributes.enabled.unwrap_or(true),
            expires_at: from_unix(item.attributes.exp),
            starts_at: from_unix(item.attributes.nbf),
            content_type: item.content_type,
            managed: item.managed.unwrap_or(false),
            tags: item.tags.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireSecretPage {
    #[serde(default)]
    pub value: Vec<WireSecretItem>,
    #[serde(default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDeletedSecret {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub recovery_id: Option<String>,
    #[serde(default)]
    pub deleted_date: Option<i64>,
    #[serde(default)]
    pub scheduled_purge_date: Option<i64>,
}

impl WireDeletedSecret {
    pub fn into_deleted(self, requested_key: &str) -> DeletedSecret {
        let key = self
            .id
            .as_deref()
            .map(|id| parse_secret_id(id).0)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| requested_key.to_string());
        DeletedSecret {
            key,
            recovery_id: self.recovery_id,
            deleted_at: from_unix(self.deleted_date),
            scheduled_purge_at: from_unix(self.scheduled_purge_date),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireSetSecret<'a> {
    pub value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<WireAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<&'a Tags>,
}

impl<'a> From<&'a SetSecretParameters> for WireSetSecret<'a> {
    fn from(params: &'a SetSecretParameters) -> Self {
        Self {
            value: params.value.expose_secret(),
            content_type: params.content_type.as_deref(),
            attributes: WireAttributes::from_parts(params.enabled, params.starts_at, params.expires_at),
            tags: params.tags.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireUpdateSecret<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<WireAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<&'a Tags>,
}

impl<'a> From<&'a SecretPropertiesUpdate> for WireUpdateSecret<'a> {
    fn from(update: &'a SecretPropertiesUpdate) -> Self {
        Self {
            content_type: update.content_type.as_deref(),
            attributes: WireAttributes::from_parts(update.enabled, update.starts_at, update.expires_at),
            tags: update.tags.as_ref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireErrorBody {
    pub error: WireError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with_tags(tags: &[(&str, Option<&str>)]) -> SecretRecord {
        let bundle: WireSecretBundle = serde_json::from_value(json!({
            "value": "v",
            "id": "https://kv.vault.azure.net/secrets/db/abc",
            "attributes": {"enabled": true, "exp": 1_700_000_000}
        }))
        .unwrap();
        let mut record = bundle.into_record("db");
        record.tags =
            tags.iter().map(|(name, value)| (name.to_string(), value.map(str::to_string))).collect();
        record
    }

    #[test]
    fn secret_id_splits_name_and_version() {
        assert_eq!(
            parse_secret_id("https://kv.vault.azure.net/secrets/db/abc123"),
            ("db".to_string(), Some("abc123".to_string()))
        );
        assert_eq!(parse_secret_id("https://kv.vault.azure.net/secrets/db"), ("db".to_string(), None));
    }

    #[test]
    fn bundle_converts_timestamps() {
        let record = record_with_tags(&[]);
        assert_eq!(record.key, "db");
        assert_eq!(record.version.as_deref(), Some("abc"));
        assert_eq!(record.expires_at.map(|at| at.timestamp()), Some(1_700_000_000));
        assert!(record.starts_at.is_none());
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let record = record_with_tags(&[]);
        let expires_at = record.expires_at.unwrap();

        assert!(record.is_expired_at(expires_at));
        assert!(!record.is_expired_at(expires_at - chrono::Duration::seconds(1)));
    }

    #[test]
    fn auto_rotate_requires_exact_true() {
        assert!(record_with_tags(&[("auto-rotate", Some("true"))]).auto_rotate());
        assert!(!record_with_tags(&[("auto-rotate", Some("True"))]).auto_rotate());
        assert!(!record_with_tags(&[("auto-rotate", None)]).auto_rotate());
        assert!(!record_with_tags(&[]).auto_rotate());
    }

    #[test]
    fn set_body_omits_unset_fields() {
        let params = SetSecretParameters::value(SecretString::new("s3cret"));
        let body = serde_json::to_value(WireSetSecret::from(&params)).unwrap();
        assert_eq!(body, json!({"value": "s3cret"}));
    }

    #[test]
    fn set_body_carries_attributes_and_null_tags() {
        let mut tags = Tags::new();
        tags.insert("owner".into(), Some("platform".into()));
        tags.insert("flag".into(), None);
        let params = SetSecretParameters {
            value: SecretString::new("v"),
            expires_at: DateTime::<Utc>::from_timestamp(1_800_000_000, 0),
            tags: Some(tags),
            ..Default::default()
        };

        let body = serde_json::to_value(WireSetSecret::from(&params)).unwrap();
        assert_eq!(
            body,
            json!({
                "value": "v",
                "attributes": {"exp": 1_800_000_000},
                "tags": {"flag": null, "owner": "platform"}
            })
        );
    }
}
