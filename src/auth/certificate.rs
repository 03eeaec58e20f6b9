//! Client certificates for service principal authentication.
//!
//! The certificate and its RSA private key are read from one PEM file. An
//! `ENCRYPTED PRIVATE KEY` is decrypted with the configured password. The
//! identity platform accepts a signed JWT (client assertion) whose header
//! carries the SHA-256 thumbprint of the certificate.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use pkcs8::EncryptedPrivateKeyInfo;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use x509_parser::pem::Pem;
use zeroize::Zeroizing;

/// Assertions are valid for ten minutes.
const ASSERTION_LIFETIME_SECONDS: i64 = 600;

#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("failed to read certificate {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid PEM data: {0}")]
    Pem(String),

    #[error("no CERTIFICATE block found")]
    MissingCertificate,

    #[error("no PRIVATE KEY block found")]
    MissingPrivateKey,

    #[error("private key is encrypted; set client.certificate.password")]
    EncryptedKey,

    #[error("failed to decrypt private key: {0}")]
    Decrypt(String),

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("failed to sign client assertion: {0}")]
    Signing(String),
}

/// A certificate plus the key that signs client assertions.
pub struct ClientCertificate {
    thumbprint_s256: String,
    key: EncodingKey,
}

impl std::fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificate").field("thumbprint_s256", &self.thumbprint_s256).finish()
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: i64,
    iat: i64,
    exp: i64,
}

impl ClientCertificate {
    pub fn from_file(path: &Path, password: Option<&str>) -> Result<Self, CertificateError> {
        let data = std::fs::read(path).map_err(|source| CertificateError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_pem(&data, password)
    }

    /// Parses the first certificate and the first private key in `data`.
    /// `password` is only used for an encrypted PKCS#8 key.
    pub fn from_pem(data: &[u8], password: Option<&str>) -> Result<Self, CertificateError> {
        let mut certificate_der = None;
        let mut key_pem: Option<Zeroizing<String>> = None;

        for pem in Pem::iter_from_buffer(data) {
            let pem = pem.map_err(|err| CertificateError::Pem(err.to_string()))?;
            match pem.label.as_str() {
                "CERTIFICATE" if certificate_der.is_none() => certificate_der = Some(pem.contents),
                "PRIVATE KEY" | "RSA PRIVATE KEY" if key_pem.is_none() => {
                    key_pem = Some(Zeroizing::new(encode_pem(&pem.label, &pem.contents)));
                }
                "ENCRYPTED PRIVATE KEY" if key_pem.is_none() => {
                    let password = password.ok_or(CertificateError::EncryptedKey)?;
                    key_pem = Some(decrypt_key(&pem.contents, password)?);
                }
                _ => {}
            }
        }

        let certificate_der = certificate_der.ok_or(CertificateError::MissingCertificate)?;
        let key_pem = key_pem.ok_or(CertificateError::MissingPrivateKey)?;

        x509_parser::parse_x509_certificate(&certificate_der)
            .map_err(|err| CertificateError::InvalidCertificate(err.to_string()))?;

        let key = EncodingKey::from_rsa_pem(key_pem.as_bytes())
            .map_err(|err| CertificateError::InvalidKey(err.to_string()))?;

        Ok(Self { thumbprint_s256: URL_SAFE_NO_PAD.encode(Sha256::digest(&certificate_der)), key })
    }

    /// Base64url SHA-256 thumbprint of the DER certificate.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint_s256
    }

    /// Signs a client assertion for `client_id` addressed to `audience`
    /// (the token endpoint).
    pub fn client_assertion(&self, client_id: &str, audience: &str) -> Result<String, CertificateError> {
        let mut header = Header::new(Algorithm::PS256);
        header.x5t_s256 = Some(self.thumbprint_s256.clone());

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            aud: audience,
            iss: client_id,
            sub: client_id,
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: now,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECONDS,
        };

        jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|err| CertificateError::Signing(err.to_string()))
    }
}

/// Decrypts an `EncryptedPrivateKeyInfo` into an unencrypted PKCS#8 PEM.
fn decrypt_key(der: &[u8], password: &str) -> Result<Zeroizing<String>, CertificateError> {
    let info = EncryptedPrivateKeyInfo::try_from(der).map_err(|err| CertificateError::InvalidKey(err.to_string()))?;
    let document = info.decrypt(password).map_err(|err| CertificateError::Decrypt(err.to_string()))?;
    Ok(Zeroizing::new(encode_pem("PRIVATE KEY", document.as_bytes())))
}

fn encode_pem(label: &str, der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = format!("-----BEGIN {}-----\n", label);
    for chunk in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {}-----\n", label));
    pem
}
