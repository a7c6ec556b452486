use std::sync::Arc;

use axum::extract::{Extension, Path, RawQuery};
use axum::http::StatusCode;
use axum::Json;
use idm_security::IdentityContext;
use tracing::{debug, field::Empty, Span};

use crate::api::rest::dto::{
    parse_list_query, parse_paging, CustomerDto, CustomerListDto, DeletedCustomersDto,
};
use crate::api::rest::error::{ApiResult, Problem};
use crate::domain::schema::CUSTOMER_ORGANIZATION;
use crate::domain::service::CustomerDirectoryService;

fn require_caller(ctx: &IdentityContext, svc: &CustomerDirectoryService) -> ApiResult<()> {
    if svc.config().require_valid_user && !ctx.is_valid_user() {
        return Err(Problem::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "A valid user is required",
        ));
    }
    Span::current().record("subject", ctx.subject_id().unwrap_or_default());
    Ok(())
}

/// List customers visible to the caller
#[tracing::instrument(skip_all, fields(subject = Empty))]
pub async fn list_customers(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<CustomerDirectoryService>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<CustomerListDto>> {
    require_caller(&ctx, &svc)?;
    let query = parse_list_query(&CUSTOMER_ORGANIZATION, query.as_deref())?;
    debug!(page_num = query.page_num, clauses = query.clauses.len(), "listing customers");

    let listing = svc.list(&ctx, &query).await?;
    Ok(Json(listing.into()))
}

/// Get one active customer by account code
#[tracing::instrument(skip(ctx, svc), fields(subject = Empty))]
pub async fn get_customer(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<CustomerDirectoryService>>,
    Path(account_code): Path<String>,
) -> ApiResult<Json<CustomerDto>> {
    require_caller(&ctx, &svc)?;
    let customer = svc.get(account_code.trim()).await?;
    Ok(Json(CustomerDto { data: customer }))
}

/// List soft-deleted customers
#[tracing::instrument(skip_all, fields(subject = Empty))]
pub async fn list_deleted_customers(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<CustomerDirectoryService>>,
) -> ApiResult<Json<DeletedCustomersDto>> {
    require_caller(&ctx, &svc)?;
    let customers = svc.list_deleted().await?;
    Ok(Json(DeletedCustomersDto {
        customer_count: customers.len(),
        customer_obj: customers,
    }))
}

/// List customers without a parent organization
#[tracing::instrument(skip_all, fields(subject = Empty))]
pub async fn list_orphan_customers(
    Extension(ctx): Extension<IdentityContext>,
    Extension(svc): Extension<Arc<CustomerDirectoryService>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<CustomerListDto>> {
    require_caller(&ctx, &svc)?;
    let (page_num, page_size) = parse_paging(query.as_deref())?;
    let listing = svc.list_orphans(page_num, page_size).await?;
    Ok(Json(listing.into()))
}
