//! Service principal credentials configured through `AZURE_*` variables.

use super::certificate::ClientCertificate;
use super::error::{CredentialError, CredentialKind};
use super::oauth::{post_form, Authority, TokenResponse};
use super::token::{AccessToken, TokenProvider};
use crate::config::LayeredEnvironment;
use crate::secrets::SecretString;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

enum ClientAuth {
    Secret(SecretString),
    Certificate(ClientCertificate),
}

/// Client credentials grant with either a client secret or a certificate.
pub struct EnvironmentCredential {
    http: reqwest::Client,
    authority: Authority,
    tenant_id: String,
    client_id: String,
    auth: ClientAuth,
}

impl EnvironmentCredential {
    /// Whether tenant, client id and a secret or certificate path are set.
    pub fn is_configured(env: &LayeredEnvironment) -> bool {
        env.contains("AZURE_TENANT_ID")
            && env.contains("AZURE_CLIENT_ID")
            && (env.contains("AZURE_CLIENT_SECRET") || env.contains("AZURE_CLIENT_CERTIFICATE_PATH"))
    }

    /// Builds the credential when fully configured.
    ///
    /// Returns `Ok(None)` when the variables are incomplete. A configured but
    /// unreadable certificate is an error. A client secret takes precedence
    /// over a certificate.
    pub fn from_env(
        env: &LayeredEnvironment,
        http: reqwest::Client,
    ) -> Result<Option<Self>, CredentialError> {
        if !Self::is_configured(env) {
            return Ok(None);
        }

        let (Some(tenant_id), Some(client_id)) =
            (env.non_empty("AZURE_TENANT_ID"), env.non_empty("AZURE_CLIENT_ID"))
        else {
            return Ok(None);
        };

        let auth = match (
            env.non_empty("AZURE_CLIENT_SECRET"),
            env.non_empty("AZURE_CLIENT_CERTIFICATE_PATH"),
        ) {
            (Some(secret), _) => {
                debug!("Using client secret from environment");
                ClientAuth::Secret(SecretString::new(secret))
            }
            (None, Some(path)) => {
                let password = env.non_empty("AZURE_CLIENT_CERTIFICATE_PASSWORD");
                debug!(path = path, password = password.is_some(), "Using client certificate from environment");
                let certificate = ClientCertificate::from_file(Path::new(path), password)
                    .map_err(|err| CredentialError::unavailable(CredentialKind::Environment, err.to_string()))?;
                ClientAuth::Certificate(certificate)
            }
            (None, None) => return Ok(None),
        };

        Ok(Some(Self {
            http,
            authority: Authority::from_env(env),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            auth,
        }))
    }

    pub fn uses_certificate(&self) -> bool {
        matches!(self.auth, ClientAuth::Certificate(_))
    }
}

#[async_trait]
impl TokenProvider for EnvironmentCredential {
    fn kind(&self) -> CredentialKind {
        CredentialKind::Environment
    }

    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let endpoint = self.authority.token_endpoint(&self.tenant_id);
        let scope = scopes.join(" ");

        let assertion;
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("scope", scope.as_str()),
        ];
        match &self.auth {
            ClientAuth::Secret(secret) => form.push(("client_secret", secret.expose_secret())),
            ClientAuth::Certificate(certificate) => {
                assertion = certificate
                    .client_assertion(&self.client_id, &endpoint)
                    .map_err(|err| CredentialError::authentication_failed(self.kind(), err.to_string()))?;
                form.push(("client_assertion_type", CLIENT_ASSERTION_TYPE));
                form.push(("client_assertion", assertion.as_str()));
            }
        }

        let response: TokenResponse = post_form(&self.http, &endpoint, &form)
            .await
            .map_err(|err| err.into_credential_error(self.kind()))?;

        Ok(response.access_token())
    }
}
