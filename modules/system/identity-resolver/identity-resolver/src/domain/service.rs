use std::sync::Arc;
use std::time::Instant;

use idm_security::IdentityContext;
use ontology_client::OntologyClient;
use tracing::{debug, info, instrument, warn};

use super::{capability, BearerDecoder, DomainError, IdentityFetcher};
use crate::config::IdentityResolverConfig;

/// Identity resolution: token to subject, subject to record, record to
/// context.
pub struct Service {
    decoder: BearerDecoder,
    fetcher: IdentityFetcher,
}

impl Service {
    /// # Errors
    ///
    /// Returns [`DomainError::Config`] when the token validation settings are
    /// unusable.
    pub fn new(
        cfg: &IdentityResolverConfig,
        ontology: Arc<dyn OntologyClient>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            decoder: BearerDecoder::new(&cfg.jwt)?,
            fetcher: IdentityFetcher::new(ontology, cfg),
        })
    }

    /// Resolve the caller presenting `bearer_token`. Anything that prevents
    /// resolution yields an anonymous context.
    #[instrument(skip_all, fields(has_token = bearer_token.is_some()))]
    pub async fn resolve(&self, bearer_token: Option<&str>) -> IdentityContext {
        let Some(token) = bearer_token.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("no bearer token; anonymous");
            return IdentityContext::anonymous();
        };

        let subject = match self.decoder.subject(token).await {
            Ok(subject) => subject,
            Err(DomainError::KeysUnavailable(reason)) => {
                warn!(%reason, "signing keys unavailable; anonymous");
                return IdentityContext::anonymous();
            }
            Err(e) => {
                debug!(error = %e, "bearer token rejected; anonymous");
                return IdentityContext::anonymous();
            }
        };

        self.resolve_subject(&subject)
            .await
            .with_bearer_token(token.to_owned())
    }

    /// Resolve an already-trusted subject id. Store failures degrade to an
    /// anonymous context that still carries the elapsed time.
    #[instrument(skip(self))]
    pub async fn resolve_subject(&self, subject_id: &str) -> IdentityContext {
        let started = Instant::now();
        match self.fetcher.fetch(subject_id).await {
            Ok(Some(record)) => {
                let ctx = capability::resolve(record, started);
                info!(
                    valid = ctx.is_valid_user(),
                    kind = ?ctx.kind(),
                    elapsed_ms = ctx.resolution_time().as_millis(),
                    "identity resolved"
                );
                ctx
            }
            Ok(None) => {
                debug!("subject has no active user; anonymous");
                anonymous_after(started)
            }
            Err(e) => {
                warn!(error = %e, "identity lookup failed; anonymous");
                anonymous_after(started)
            }
        }
    }

    /// Strict variant of [`Self::resolve_subject`].
    ///
    /// # Errors
    ///
    /// Propagates store and record errors instead of degrading.
    pub async fn lookup(&self, subject_id: &str) -> Result<Option<IdentityContext>, DomainError> {
        let started = Instant::now();
        let record = self.fetcher.fetch(subject_id).await?;
        Ok(record.map(|r| capability::resolve(r, started)))
    }
}

fn anonymous_after(started: Instant) -> IdentityContext {
    IdentityContext::builder()
        .resolution_time(started.elapsed())
        .build()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use async_trait::async_trait;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use ontology_client::{InMemoryOntology, ObjectPage, OntologyError, Predicate, Record, SearchRequest};
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::{json, Value};

    use super::*;
    use crate::config::{JwtConfig, JwtKeyConfig};

    const SECRET: &str = "service-test-secret";

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn cfg() -> IdentityResolverConfig {
        IdentityResolverConfig {
            jwt: JwtConfig {
                algorithms: vec![Algorithm::HS256],
                key: Some(JwtKeyConfig::Secret {
                    secret: SecretString::from(SECRET.to_owned()),
                }),
                ..JwtConfig::default()
            },
            ..IdentityResolverConfig::default()
        }
    }

    fn token(oid: &str) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 600;
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &json!({"oid": oid, "exp": exp}),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn store() -> Arc<InMemoryOntology> {
        let store = Arc::new(InMemoryOntology::new());
        store.insert(
            "MyKomatsuUser",
            record(json!({"userId": "u-1", "entraId": "e-1", "homeRoleId": "r-1", "type": "Admin"})),
        );
        store.insert(
            "MyKomatsuRole",
            record(json!({"id": "r-1", "userId": "u-1", "customerId": "C1", "branchId": "B1"})),
        );
        store
    }

    struct Unreachable;

    #[async_trait]
    impl OntologyClient for Unreachable {
        async fn search(&self, _request: SearchRequest) -> Result<ObjectPage, OntologyError> {
            Err(OntologyError::Timeout)
        }

        async fn count(&self, _object_type: &str, _filter: Option<&Predicate>) -> Result<u64, OntologyError> {
            Err(OntologyError::Timeout)
        }
    }

    #[tokio::test]
    async fn resolves_valid_token_and_keeps_it() {
        let svc = Service::new(&cfg(), store()).unwrap();
        let bearer = token("e-1");

        let ctx = svc.resolve(Some(&bearer)).await;

        assert!(ctx.is_customer());
        assert!(ctx.is_admin());
        assert_eq!(ctx.customer_id(), Some("C1"));
        assert_eq!(
            ctx.bearer_token().map(ExposeSecret::expose_secret),
            Some(bearer.as_str())
        );
    }

    #[tokio::test]
    async fn missing_or_invalid_token_is_anonymous() {
        let svc = Service::new(&cfg(), store()).unwrap();

        for bearer in [None, Some(""), Some("garbage")] {
            let ctx = svc.resolve(bearer).await;
            assert!(!ctx.is_valid_user(), "token {bearer:?}");
            assert!(ctx.bearer_token().is_none());
        }
    }

    #[tokio::test]
    async fn unknown_subject_is_anonymous() {
        let svc = Service::new(&cfg(), store()).unwrap();

        let ctx = svc.resolve(Some(&token("e-404"))).await;

        assert!(!ctx.is_valid_user());
    }

    #[tokio::test]
    async fn store_failure_degrades_but_lookup_is_strict() {
        let svc = Service::new(&cfg(), Arc::new(Unreachable)).unwrap();

        assert!(!svc.resolve_subject("e-1").await.is_valid_user());
        assert!(matches!(
            svc.lookup("e-1").await,
            Err(DomainError::Store(OntologyError::Timeout))
        ));
    }

    #[tokio::test]
    async fn lookup_distinguishes_absent_subject() {
        let svc = Service::new(&cfg(), store()).unwrap();

        assert!(svc.lookup("e-404").await.unwrap().is_none());
        let ctx = svc.lookup("e-1").await.unwrap().unwrap();
        assert_eq!(ctx.subject_id(), Some("u-1"));
    }
}
