//! The network half of a credential provider.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::error::AuthExchangeError;
use crate::token::TokenResponse;

/// Produces a fresh token. One call is one outbound exchange.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AuthExchangeError`] when no usable token was obtained.
    async fn exchange(&self) -> Result<TokenResponse, AuthExchangeError>;
}

/// RFC 6749 error body.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth2 `client_credentials` grant against a form-encoded token endpoint.
#[derive(Debug, Clone)]
pub struct ClientCredentialsExchange {
    provider: String,
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: SecretString,
    scope: String,
    redirect_uri: Option<String>,
}

impl ClientCredentialsExchange {
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        http: reqwest::Client,
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: SecretString,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            http,
            token_url,
            client_id: client_id.into(),
            client_secret,
            scope: scope.into(),
            redirect_uri: None,
        }
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: Option<String>) -> Self {
        self.redirect_uri = redirect_uri;
        self
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", self.scope.as_str()),
        ];
        if let Some(uri) = &self.redirect_uri {
            form.push(("redirect_uri", uri.as_str()));
        }
        form
    }

    fn rejected(&self, status: reqwest::StatusCode, body: &str) -> AuthExchangeError {
        let reason = match serde_json::from_str::<TokenErrorResponse>(body) {
            Ok(TokenErrorResponse {
                error,
                error_description: Some(description),
            }) => format!("{error}: {description}"),
            Ok(TokenErrorResponse { error, .. }) => error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_owned(),
        };
        AuthExchangeError::Rejected {
            provider: self.provider.clone(),
            status: status.as_u16(),
            reason,
        }
    }
}

#[async_trait]
impl TokenExchange for ClientCredentialsExchange {
    #[tracing::instrument(skip(self), fields(provider = %self.provider, url = %self.token_url))]
    async fn exchange(&self) -> Result<TokenResponse, AuthExchangeError> {
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&self.form())
            .send()
            .await
            .map_err(|e| AuthExchangeError::from_transport(&self.provider, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthExchangeError::from_transport(&self.provider, &e))?;

        if !status.is_success() {
            return Err(self.rejected(status, &body));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthExchangeError::invalid_response(&self.provider, e.to_string()))?;
        if token.access_token.expose_secret().is_empty() {
            return Err(AuthExchangeError::invalid_response(
                &self.provider,
                "empty access_token",
            ));
        }

        tracing::debug!(expires_in = token.expires_in, "token exchanged");
        Ok(token)
    }
}
