use async_trait::async_trait;
use courtside_core::config::IdpConfig;
use courtside_core::errors::ProviderError;
use courtside_core::registry::AgentCredential;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::exchange::IdentityProvider;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Real identity-provider client: exchanges the user's validated assertion
/// plus the agent's credential for a scoped delegated token at the issuer's
/// token endpoint.
#[derive(Clone, Debug)]
pub struct HttpTokenClient {
    http: reqwest::Client,
    token_url: String,
    audience: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl HttpTokenClient {
    pub fn new(issuer: &str, audience: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: format!("{}/v1/token", issuer.trim_end_matches('/')),
            audience,
        }
    }

    /// Builds a client when the config names an issuer; demo-only deployments
    /// have none and never exchange for real.
    pub fn from_config(idp: &IdpConfig) -> Option<Self> {
        idp.issuer.as_deref().map(|issuer| Self::new(issuer, idp.audience.clone()))
    }
}

#[async_trait]
impl IdentityProvider for HttpTokenClient {
    async fn exchange_token(
        &self,
        user_assertion: &str,
        credential: &AgentCredential,
        requested_scopes: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        let scope = requested_scopes.join(" ");
        let mut form = vec![
            ("grant_type", JWT_BEARER_GRANT.to_string()),
            ("assertion", user_assertion.to_string()),
            ("client_id", credential.client_id.clone()),
            ("client_assertion", credential.private_key.expose_secret().to_string()),
            ("scope", scope),
        ];
        if let Some(audience) = &self.audience {
            form.push(("audience", audience.clone()));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        if !status.is_success() {
            // Surface the provider's own wording verbatim for diagnostics.
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(parsed) if !parsed.error_description.is_empty() => {
                    format!("{}: {}", parsed.error, parsed.error_description)
                }
                Ok(parsed) if !parsed.error.is_empty() => parsed.error,
                _ => format!("token endpoint returned {status}"),
            };
            return Err(ProviderError::Exchange(message));
        }

        let token = serde_json::from_str::<TokenResponse>(&body)
            .map_err(|error| ProviderError::Exchange(format!("malformed token response: {error}")))?;

        Ok(token.scope.split_whitespace().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTokenClient;

    #[test]
    fn token_url_strips_trailing_slash() {
        let client = HttpTokenClient::new("https://example.okta.com/oauth2/default/", None);
        assert_eq!(client.token_url, "https://example.okta.com/oauth2/default/v1/token");
    }

    #[test]
    fn from_config_requires_an_issuer() {
        let idp = courtside_core::config::IdpConfig {
            issuer: None,
            audience: None,
            timeout_secs: 5,
        };
        assert!(HttpTokenClient::from_config(&idp).is_none());
    }
}
