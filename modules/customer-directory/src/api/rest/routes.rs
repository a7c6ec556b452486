use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};

use crate::api::rest::handlers;
use crate::domain::service::CustomerDirectoryService;

#[must_use]
pub fn register_routes(router: Router, service: Arc<CustomerDirectoryService>) -> Router {
    let customers = Router::new()
        // GET /customers - filtered, searched and sorted listing
        .route("/customers", get(handlers::list_customers))
        // GET /customers/deleted - soft-deleted organizations
        .route("/customers/deleted", get(handlers::list_deleted_customers))
        // GET /customers/orphans - organizations without a parent
        .route("/customers/orphans", get(handlers::list_orphan_customers))
        // GET /customers/{account_code} - one active organization
        .route("/customers/{account_code}", get(handlers::get_customer))
        .layer(Extension(service));

    router.merge(customers)
}
