//! Identity resolver module wiring.

use std::sync::Arc;

use identity_resolver_sdk::IdentityResolverClient;
use ontology_client::OntologyClient;
use tracing::info;

use crate::config::IdentityResolverConfig;
use crate::domain::{DomainError, IdentityResolverLocalClient, Service};
use crate::middleware::IdentityState;

/// Identity resolver module.
///
/// Owns the resolution service and hands out the public client and the
/// request middleware state built on top of it.
pub struct IdentityResolverModule {
    client: Arc<dyn IdentityResolverClient>,
    state: IdentityState,
}

impl IdentityResolverModule {
    /// # Errors
    ///
    /// Returns [`DomainError::Config`] when the token validation settings are
    /// unusable.
    #[tracing::instrument(skip_all, fields(user_object_type = %cfg.user_object_type))]
    pub fn init(
        cfg: &IdentityResolverConfig,
        ontology: Arc<dyn OntologyClient>,
    ) -> Result<Self, DomainError> {
        info!("Initializing identity_resolver");
        let svc = Arc::new(Service::new(cfg, ontology)?);
        let client: Arc<dyn IdentityResolverClient> = Arc::new(IdentityResolverLocalClient::new(svc));

        let override_param = cfg.subject_override();
        if let Some(param) = override_param {
            tracing::warn!(param, "subject override enabled; do not use in production");
        }
        let state = IdentityState::new(Arc::clone(&client)).with_subject_override(override_param);

        Ok(Self { client, state })
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn IdentityResolverClient> {
        Arc::clone(&self.client)
    }

    /// State for [`crate::middleware::identity_middleware`].
    #[must_use]
    pub fn middleware_state(&self) -> IdentityState {
        self.state.clone()
    }
}
