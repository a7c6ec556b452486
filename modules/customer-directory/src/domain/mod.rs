//! Domain layer for the customer directory.

pub mod composer;
pub mod error;
pub mod filter;
pub mod model;
pub mod schema;
pub mod service;

pub use composer::{Composition, QueryComposer, SortSpec};
pub use error::DomainError;
pub use filter::{parse_query_filters, FilterClause, FilterCondition, FilterOperator};
pub use model::{ChildCustomerSummary, Customer, CustomerPermissions, CustomerSummary};
pub use schema::{EntitySchema, CUSTOMER_ORGANIZATION};
pub use service::{
    CustomerDirectoryService, CustomerListing, ListQuery, ListScope, ListTimings, ListedCustomers,
};
