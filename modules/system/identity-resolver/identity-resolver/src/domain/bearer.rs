//! Bearer token validation.
//!
//! Signatures are always verified. Keys come either from a static secret or
//! from the identity platform's published key set; the key set is cached and
//! refetched when a token names a `kid` the cache does not know, at most once
//! per [`JWKS_MIN_REFETCH`].

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use super::DomainError;
use crate::config::{JwtConfig, JwtKeyConfig};

pub const JWKS_MIN_REFETCH: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    /// Object id of the caller in the identity platform.
    #[serde(default)]
    oid: Option<String>,
}

struct KeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

struct JwksKeys {
    http: reqwest::Client,
    url: Url,
    current: ArcSwapOption<KeySet>,
    refresh: Mutex<()>,
}

impl JwksKeys {
    fn cached(&self, kid: &str) -> Result<Option<DecodingKey>, DomainError> {
        self.current
            .load_full()
            .and_then(|set| set.keys.find(kid).map(DecodingKey::from_jwk))
            .transpose()
            .map_err(DomainError::from)
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, DomainError> {
        if let Some(key) = self.cached(kid)? {
            return Ok(key);
        }

        let _guard = self.refresh.lock().await;
        if let Some(key) = self.cached(kid)? {
            return Ok(key);
        }
        let recently_fetched = self
            .current
            .load_full()
            .is_some_and(|set| set.fetched_at.elapsed() < JWKS_MIN_REFETCH);
        if !recently_fetched {
            let keys = self.fetch().await?;
            self.current.store(Some(Arc::new(KeySet {
                keys,
                fetched_at: Instant::now(),
            })));
        }

        self.cached(kid)?
            .ok_or_else(|| DomainError::InvalidToken(format!("unknown signing key '{kid}'")))
    }

    async fn fetch(&self) -> Result<JwkSet, DomainError> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DomainError::KeysUnavailable(e.to_string()))?;
        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| DomainError::KeysUnavailable(e.to_string()))?;
        tracing::info!(url = %self.url, keys = keys.keys.len(), "signing keys fetched");
        Ok(keys)
    }
}

enum KeySource {
    Missing,
    Static(DecodingKey),
    Jwks(JwksKeys),
}

/// Validates bearer tokens and extracts the caller's subject id.
pub struct BearerDecoder {
    validation: Validation,
    keys: KeySource,
}

impl BearerDecoder {
    /// # Errors
    ///
    /// Returns [`DomainError::Config`] when no algorithm is configured or the
    /// key set URL is invalid.
    pub fn new(cfg: &JwtConfig) -> Result<Self, DomainError> {
        let Some(&first) = cfg.algorithms.first() else {
            return Err(DomainError::Config("jwt.algorithms is empty".to_owned()));
        };
        let mut validation = Validation::new(first);
        validation.algorithms.clone_from(&cfg.algorithms);
        validation.leeway = cfg.leeway_secs;
        if cfg.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(cfg.audience.as_slice());
        }
        if let Some(issuer) = &cfg.issuer {
            validation.set_issuer(&[issuer]);
        }

        let keys = match &cfg.key {
            None => {
                tracing::warn!("no jwt signing key configured; every bearer token will be rejected");
                KeySource::Missing
            }
            Some(JwtKeyConfig::Secret { secret }) => {
                KeySource::Static(DecodingKey::from_secret(secret.expose_secret().as_bytes()))
            }
            Some(JwtKeyConfig::Jwks { url }) => {
                let url = Url::parse(url)
                    .map_err(|e| DomainError::Config(format!("invalid jwks url '{url}': {e}")))?;
                let http = reqwest::Client::builder()
                    .timeout(cfg.jwks_timeout())
                    .build()
                    .map_err(|e| DomainError::Config(format!("failed to build http client: {e}")))?;
                KeySource::Jwks(JwksKeys {
                    http,
                    url,
                    current: ArcSwapOption::empty(),
                    refresh: Mutex::new(()),
                })
            }
        };

        Ok(Self { validation, keys })
    }

    /// Verify `token` and return its `oid` claim.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` if the token is malformed, badly signed, expired, or
    ///   fails the audience/issuer checks
    /// - `MissingSubject` if the verified token has no usable `oid`
    /// - `KeysUnavailable` if the key set could not be fetched
    /// - `Config` if no signing key is configured
    pub async fn subject(&self, token: &str) -> Result<String, DomainError> {
        let header = jsonwebtoken::decode_header(token)?;

        let fetched;
        let key = match &self.keys {
            KeySource::Missing => {
                return Err(DomainError::Config("no jwt signing key configured".to_owned()));
            }
            KeySource::Static(key) => key,
            KeySource::Jwks(jwks) => {
                let kid = header
                    .kid
                    .as_deref()
                    .ok_or_else(|| DomainError::InvalidToken("token header has no kid".to_owned()))?;
                fetched = jwks.key_for(kid).await?;
                &fetched
            }
        };

        let data = jsonwebtoken::decode::<Claims>(token, key, &self.validation)?;
        data.claims
            .oid
            .map(|oid| oid.trim().to_owned())
            .filter(|oid| !oid.is_empty())
            .ok_or(DomainError::MissingSubject)
    }
}
