//! Credential providers: an exchange plus its token cache.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::time::Instant;

use crate::cache::TokenCache;
use crate::config::{DirectoryCredentialsConfig, ServiceCredentialsConfig};
use crate::error::AuthExchangeError;
use crate::exchange::{ClientCredentialsExchange, TokenExchange};
use crate::token::{CachedToken, RefreshPolicy};

pub const SERVICE_PROVIDER: &str = "service";
pub const DIRECTORY_PROVIDER: &str = "directory";

/// A source of bearer tokens for one backend.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn name(&self) -> &str;

    /// A token that is valid right now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthExchangeError`] when a refresh was needed and failed. A
    /// stale token is never returned instead.
    async fn bearer_token(&self) -> Result<SecretString, AuthExchangeError>;

    /// Forget the cached token, e.g. after the backend answered 401.
    fn invalidate(&self);
}

pub struct CachingCredentialProvider<E = ClientCredentialsExchange> {
    name: String,
    exchange: E,
    policy: RefreshPolicy,
    cache: TokenCache,
}

impl<E: TokenExchange> CachingCredentialProvider<E> {
    #[must_use]
    pub fn new(name: impl Into<String>, exchange: E, policy: RefreshPolicy) -> Self {
        Self {
            name: name.into(),
            exchange,
            policy,
            cache: TokenCache::new(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    async fn refresh(&self) -> Result<CachedToken, AuthExchangeError> {
        let issued_at = Instant::now();
        match self.exchange.exchange().await {
            Ok(response) => {
                let token = CachedToken::from_response(response, self.policy, issued_at);
                tracing::info!(
                    provider = %self.name,
                    valid_for = ?token.refresh_at().saturating_duration_since(issued_at),
                    "credential refreshed"
                );
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(
                    provider = %self.name,
                    transient = e.is_transient(),
                    error = %e,
                    "credential exchange failed"
                );
                Err(e)
            }
        }
    }
}

impl CachingCredentialProvider<ClientCredentialsExchange> {
    /// Provider for the ontology platform (refreshes ahead of expiry).
    ///
    /// # Errors
    ///
    /// Returns [`AuthExchangeError::Config`] for an unusable configuration.
    pub fn service(cfg: &ServiceCredentialsConfig) -> Result<Self, AuthExchangeError> {
        let exchange = ClientCredentialsExchange::new(
            SERVICE_PROVIDER,
            http_client(cfg.timeout())?,
            cfg.token_url()?,
            cfg.client_id.clone(),
            cfg.client_secret.clone(),
            cfg.scope.clone(),
        );
        Ok(Self::new(
            SERVICE_PROVIDER,
            exchange,
            RefreshPolicy::with_margin(cfg.refresh_margin()),
        ))
    }

    /// Provider for the directory platform (uses the full token lifetime by
    /// default).
    ///
    /// # Errors
    ///
    /// Returns [`AuthExchangeError::Config`] for an unusable configuration.
    pub fn directory(cfg: &DirectoryCredentialsConfig) -> Result<Self, AuthExchangeError> {
        let exchange = ClientCredentialsExchange::new(
            DIRECTORY_PROVIDER,
            http_client(cfg.timeout())?,
            cfg.token_url()?,
            cfg.client_id.clone(),
            cfg.client_secret.clone(),
            cfg.scope.clone(),
        )
        .with_redirect_uri(Some(cfg.redirect_uri()?.into()));
        Ok(Self::new(
            DIRECTORY_PROVIDER,
            exchange,
            RefreshPolicy::with_margin(cfg.refresh_margin()),
        ))
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, AuthExchangeError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AuthExchangeError::Config(format!("failed to build http client: {e}")))
}

#[async_trait]
impl<E: TokenExchange> CredentialProvider for CachingCredentialProvider<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn bearer_token(&self) -> Result<SecretString, AuthExchangeError> {
        let token = self.cache.get_or_refresh(|| self.refresh()).await?;
        Ok(token.value().clone())
    }

    fn invalidate(&self) {
        tracing::debug!(provider = %self.name, "credential invalidated");
        self.cache.invalidate();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::ExposeSecret;

    use super::*;
    use crate::token::{TokenResponse, MAX_TOKEN_LIFETIME};

    struct CountingExchange {
        calls: AtomicUsize,
        lifetime_secs: u64,
    }

    impl CountingExchange {
        fn new(lifetime_secs: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                lifetime_secs,
            }
        }
    }

    #[async_trait]
    impl TokenExchange for CountingExchange {
        async fn exchange(&self) -> Result<TokenResponse, AuthExchangeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenResponse {
                access_token: SecretString::from(format!("tok-{n}")),
                expires_in: self.lifetime_secs,
                token_type: Some("Bearer".to_owned()),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn service_margin_refreshes_300s_early() {
        let provider = CachingCredentialProvider::new(
            SERVICE_PROVIDER,
            CountingExchange::new(3600),
            RefreshPolicy::with_margin(Duration::from_secs(300)),
        );

        assert_eq!(provider.bearer_token().await.unwrap().expose_secret(), "tok-1");
        tokio::time::advance(Duration::from_secs(3299)).await;
        assert_eq!(provider.bearer_token().await.unwrap().expose_secret(), "tok-1");
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(provider.bearer_token().await.unwrap().expose_secret(), "tok-2");
        assert_eq!(provider.exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn directory_policy_uses_full_lifetime() {
        let provider = CachingCredentialProvider::new(
            DIRECTORY_PROVIDER,
            CountingExchange::new(3600),
            RefreshPolicy::exact(),
        );

        provider.bearer_token().await.unwrap();
        tokio::time::advance(Duration::from_secs(3599)).await;
        provider.bearer_token().await.unwrap();
        assert_eq!(provider.exchange.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        provider.bearer_token().await.unwrap();
        assert_eq!(provider.exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn providers_do_not_share_cache() {
        let service = CachingCredentialProvider::new(
            SERVICE_PROVIDER,
            CountingExchange::new(3600),
            RefreshPolicy::exact(),
        );
        let directory = CachingCredentialProvider::new(
            DIRECTORY_PROVIDER,
            CountingExchange::new(3600),
            RefreshPolicy::exact(),
        );

        service.bearer_token().await.unwrap();
        directory.bearer_token().await.unwrap();
        service.invalidate();
        service.bearer_token().await.unwrap();
        directory.bearer_token().await.unwrap();

        assert_eq!(service.exchange.calls.load(Ordering::SeqCst), 2);
        assert_eq!(directory.exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_expiry_is_served_until_the_cap() {
        let provider = CachingCredentialProvider::new(
            SERVICE_PROVIDER,
            CountingExchange::new(u64::MAX),
            RefreshPolicy::with_margin(Duration::from_secs(300)),
        );

        assert_eq!(provider.bearer_token().await.unwrap().expose_secret(), "tok-1");
        tokio::time::advance(MAX_TOKEN_LIFETIME - Duration::from_secs(301)).await;
        assert_eq!(provider.bearer_token().await.unwrap().expose_secret(), "tok-1");
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(provider.bearer_token().await.unwrap().expose_secret(), "tok-2");
    }

    #[test]
    fn constructors_validate_configuration() {
        let err = CachingCredentialProvider::directory(&DirectoryCredentialsConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, AuthExchangeError::Config(_)));

        let cfg = DirectoryCredentialsConfig {
            tenant_id: "contoso".to_owned(),
            ..DirectoryCredentialsConfig::default()
        };
        let err = CachingCredentialProvider::directory(&cfg).err().unwrap();
        assert!(matches!(err, AuthExchangeError::Config(ref m) if m.contains("redirect_uri")));

        let cfg = DirectoryCredentialsConfig {
            redirect_uri: Some("https://app.example.com/cb".to_owned()),
            ..cfg
        };
        let provider = CachingCredentialProvider::directory(&cfg).unwrap();
        assert_eq!(provider.name(), DIRECTORY_PROVIDER);
        assert_eq!(provider.policy(), RefreshPolicy::exact());
    }
}
