//! Customer directory module wiring.

use std::sync::Arc;

use axum::Router;
use ontology_client::OntologyClient;
use tracing::info;

use crate::api::rest::routes;
use crate::config::CustomerDirectoryConfig;
use crate::domain::service::CustomerDirectoryService;

/// Customer directory module.
pub struct CustomerDirectoryModule {
    service: Arc<CustomerDirectoryService>,
}

impl CustomerDirectoryModule {
    #[must_use]
    #[tracing::instrument(skip_all, fields(object_type = %cfg.object_type))]
    pub fn init(cfg: CustomerDirectoryConfig, ontology: Arc<dyn OntologyClient>) -> Self {
        info!(
            default_page_size = cfg.default_page_size,
            max_page_size = cfg.max_page_size,
            "Initializing customer_directory"
        );
        Self {
            service: Arc::new(CustomerDirectoryService::new(cfg, ontology)),
        }
    }

    #[must_use]
    pub fn service(&self) -> Arc<CustomerDirectoryService> {
        Arc::clone(&self.service)
    }

    /// Mount the REST routes on `router`.
    #[must_use]
    pub fn register_rest(&self, router: Router) -> Router {
        routes::register_routes(router, self.service())
    }
}
