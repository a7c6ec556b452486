//! Local (in-process) client for the identity resolver.

use std::sync::Arc;

use async_trait::async_trait;
use identity_resolver_sdk::{IdentityContext, IdentityResolverClient, IdentityResolverError};

use super::{DomainError, Service};

/// Local client wrapping the service.
pub struct IdentityResolverLocalClient {
    svc: Arc<Service>,
}

impl IdentityResolverLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> IdentityResolverError {
    tracing::error!(operation = op, error = ?e, "identity_resolver call failed");
    e.into()
}

#[async_trait]
impl IdentityResolverClient for IdentityResolverLocalClient {
    async fn resolve(&self, bearer_token: Option<&str>) -> IdentityContext {
        self.svc.resolve(bearer_token).await
    }

    async fn resolve_subject(&self, subject_id: &str) -> IdentityContext {
        self.svc.resolve_subject(subject_id).await
    }

    async fn lookup(
        &self,
        subject_id: &str,
    ) -> Result<Option<IdentityContext>, IdentityResolverError> {
        self.svc
            .lookup(subject_id)
            .await
            .map_err(|e| log_and_convert("lookup", e))
    }
}
