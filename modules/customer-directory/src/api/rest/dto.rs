use std::time::Duration;

use serde::Serialize;

use crate::domain::composer::SortSpec;
use crate::domain::error::DomainError;
use crate::domain::filter::parse_query_filters;
use crate::domain::model::{ChildCustomerSummary, Customer, CustomerSummary};
use crate::domain::schema::EntitySchema;
use crate::domain::service::{CustomerListing, ListQuery, ListTimings, ListedCustomers};

/// Build a [`ListQuery`] from the raw query string of `GET /customers`.
///
/// `parent` given once selects the children of that organization and is not
/// read as a filter; given twice it is an ordinary `operator, value` filter.
///
/// # Errors
///
/// - `InvalidRequest` for a malformed query string or paging value
/// - `InvalidSortAttribute` for an unknown `sort_by` field
/// - any filter clause error
pub fn parse_list_query(
    schema: &EntitySchema,
    raw: Option<&str>,
) -> Result<ListQuery, DomainError> {
    let mut pairs = decode_pairs(raw)?;

    let page_num = positive(&pairs, "page_num")?.unwrap_or(1);
    let page_size = positive(&pairs, "page_size")?;
    let search = single(&pairs, "search").map(str::to_owned);
    let sort = single(&pairs, "sort_by")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| SortSpec::parse(schema, s))
        .transpose()?;

    let mut parent = None;
    if pairs.iter().filter(|(k, _)| k == "parent").count() == 1 {
        parent = single(&pairs, "parent").map(str::to_owned);
        pairs.retain(|(k, _)| k != "parent");
    }

    let clauses = parse_query_filters(schema, &pairs)?;

    Ok(ListQuery {
        page_num,
        page_size,
        parent,
        clauses,
        search,
        sort,
    })
}

/// `page_num` and `page_size` of `GET /customers/orphans`.
///
/// # Errors
///
/// `InvalidRequest` for a malformed query string or paging value.
pub fn parse_paging(raw: Option<&str>) -> Result<(usize, Option<usize>), DomainError> {
    let pairs = decode_pairs(raw)?;
    Ok((
        positive(&pairs, "page_num")?.unwrap_or(1),
        positive(&pairs, "page_size")?,
    ))
}

fn decode_pairs(raw: Option<&str>) -> Result<Vec<(String, String)>, DomainError> {
    serde_urlencoded::from_str(raw.unwrap_or_default())
        .map_err(|e| DomainError::invalid_request(format!("malformed query string: {e}")))
}

fn single<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn positive(pairs: &[(String, String)], key: &str) -> Result<Option<usize>, DomainError> {
    let Some(raw) = single(pairs, key) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(Some(n)),
        _ => Err(DomainError::invalid_request(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Timings of one listing, each formatted as seconds with two decimals.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceDto {
    pub full_view: String,
    pub customer_count_fetch: String,
    pub customer_iterate: String,
}

impl From<ListTimings> for PerformanceDto {
    fn from(t: ListTimings) -> Self {
        Self {
            full_view: seconds(t.total),
            customer_count_fetch: seconds(t.count),
            customer_iterate: seconds(t.page),
        }
    }
}

fn seconds(d: Duration) -> String {
    format!("{:.2}s", d.as_secs_f64())
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CustomerObjDto {
    Summaries(Vec<CustomerSummary>),
    Children(Vec<ChildCustomerSummary>),
}

/// Response body of the listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerListDto {
    pub customer_count: u64,
    pub customer_obj: CustomerObjDto,
    pub performance: PerformanceDto,
}

impl From<CustomerListing> for CustomerListDto {
    fn from(listing: CustomerListing) -> Self {
        Self {
            customer_count: listing.total,
            customer_obj: match listing.items {
                ListedCustomers::Summaries(items) => CustomerObjDto::Summaries(items),
                ListedCustomers::Children(items) => CustomerObjDto::Children(items),
            },
            performance: listing.timings.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDto {
    pub data: Customer,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedCustomersDto {
    pub customer_count: usize,
    pub customer_obj: Vec<Customer>,
}
