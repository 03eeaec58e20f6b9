//! Authentication records: the persisted result of an interactive sign-in.
//!
//! A record identifies the account that signed in, so later invocations can
//! construct an interactive credential without prompting. It holds no tokens.

use super::error::{CredentialError, CredentialKind};
use super::oauth::TokenResponse;
use crate::config::{write_private_file, ConfigError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const RECORD_VERSION: &str = "1.0";

/// Account details of a completed interactive sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRecord {
    #[serde(default)]
    pub authority: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub home_account_id: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    tid: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    upn: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    uid: String,
    utid: String,
}

impl AuthenticationRecord {
    /// True for the default record, meaning no cached sign-in.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Builds a record from a sign-in's token response.
    ///
    /// The id token is only read for account claims; its signature is not
    /// checked because it came straight from the token endpoint over TLS.
    pub fn from_sign_in(
        kind: CredentialKind,
        authority_host: &str,
        client_id: &str,
        response: &TokenResponse,
    ) -> Result<Self, CredentialError> {
        let id_token = response.id_token.as_deref().ok_or_else(|| {
            CredentialError::authentication_failed(kind, "token response did not include an id_token")
        })?;
        let claims: IdTokenClaims = decode_jwt_segment(id_token, 1)
            .ok_or_else(|| CredentialError::authentication_failed(kind, "id_token is malformed"))?;

        let tenant_id = claims.tid.clone().unwrap_or_default();
        let home_account_id = response
            .client_info
            .as_deref()
            .and_then(decode_base64_json::<ClientInfo>)
            .map(|info| format!("{}.{}", info.uid, info.utid))
            .or_else(|| Some(format!("{}.{}", claims.oid.as_deref()?, claims.tid.as_deref()?)))
            .unwrap_or_default();

        Ok(Self {
            authority: authority_host.to_string(),
            client_id: client_id.to_string(),
            home_account_id,
            tenant_id,
            username: claims.preferred_username.or(claims.upn).unwrap_or_default(),
            version: RECORD_VERSION.to_string(),
        })
    }
}

fn decode_jwt_segment<T: for<'de> Deserialize<'de>>(jwt: &str, index: usize) -> Option<T> {
    decode_base64_json(jwt.split('.').nth(index)?)
}

fn decode_base64_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The record file in the configuration directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached record. A missing or empty file yields the empty record.
    pub fn load(&self) -> Result<AuthenticationRecord, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cached authentication record");
                return Ok(AuthenticationRecord::default());
            }
            Err(err) => return Err(ConfigError::read(&self.path, err)),
        };

        if contents.trim().is_empty() {
            return Ok(AuthenticationRecord::default());
        }

        serde_json::from_str(&contents).map_err(|err| ConfigError::parse(&self.path, err.to_string()))
    }

    /// Replaces the cached record, owner-only.
    pub fn save(&self, record: &AuthenticationRecord) -> Result<(), ConfigError> {
        let contents = serde_json::to_vec_pretty(record)
            .map_err(|err| ConfigError::parse(&self.path, err.to_string()))?;
        write_private_file(&self.path, &contents)?;
        info!(path = %self.path.display(), username = %record.username, "Saved authentication record");
        Ok(())
    }
}
