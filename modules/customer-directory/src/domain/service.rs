use std::sync::Arc;
use std::time::{Duration, Instant};

use idm_security::IdentityContext;
use ontology_client::{ObjectQuery, OntologyClient, Predicate, Record};
use tracing::{debug, info, instrument};

use super::composer::{Composition, QueryComposer, SortSpec};
use super::filter::FilterClause;
use super::model::{ChildCustomerSummary, Customer, CustomerPermissions, CustomerSummary};
use super::schema::CUSTOMER_ORGANIZATION;
use super::DomainError;
use crate::config::CustomerDirectoryConfig;

/// A validated listing request.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// 1-based; `0` is read as `1`.
    pub page_num: usize,
    pub page_size: Option<usize>,
    /// List the children of this organization instead of composing.
    pub parent: Option<String>,
    pub clauses: Vec<FilterClause>,
    pub search: Option<String>,
    pub sort: Option<SortSpec>,
}

/// How the listed set was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    Parent(String),
    /// Customers owned by the caller's distributor.
    Distributor(String),
    Composed {
        applied: usize,
        fell_back_at: Option<usize>,
        search_field: Option<&'static str>,
    },
    Orphans,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListedCustomers {
    Summaries(Vec<CustomerSummary>),
    Children(Vec<ChildCustomerSummary>),
}

impl ListedCustomers {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Summaries(items) => items.len(),
            Self::Children(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListTimings {
    pub count: Duration,
    pub page: Duration,
    pub total: Duration,
}

/// One page of customers plus the size of the whole set.
#[derive(Debug, Clone)]
pub struct CustomerListing {
    pub total: u64,
    pub items: ListedCustomers,
    pub scope: ListScope,
    pub timings: ListTimings,
}

/// Customer organization directory.
pub struct CustomerDirectoryService {
    ontology: Arc<dyn OntologyClient>,
    cfg: CustomerDirectoryConfig,
    composer: QueryComposer,
}

impl CustomerDirectoryService {
    #[must_use]
    pub fn new(cfg: CustomerDirectoryConfig, ontology: Arc<dyn OntologyClient>) -> Self {
        Self {
            ontology,
            cfg,
            composer: QueryComposer::new(&CUSTOMER_ORGANIZATION),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CustomerDirectoryConfig {
        &self.cfg
    }

    fn all_objects(&self) -> ObjectQuery {
        ObjectQuery::new(Arc::clone(&self.ontology), &self.cfg.object_type)
    }

    fn soft_deleted(&self) -> Predicate {
        Predicate::eq(&self.cfg.soft_delete_property, self.cfg.delete_flag.as_str())
    }

    /// Organizations that are not soft-deleted.
    fn objects(&self) -> ObjectQuery {
        self.all_objects().filter(self.soft_deleted().negate())
    }

    fn property(name: &str) -> &'static str {
        CUSTOMER_ORGANIZATION.property(name).unwrap_or_default()
    }

    /// One page of customers visible to `ctx`.
    ///
    /// A parent scope lists that organization's children. Otherwise a
    /// distributor caller sees the customers it owns, and everyone else gets
    /// the composed query.
    ///
    /// # Errors
    ///
    /// - `Store` if the store cannot be queried
    /// - `MalformedRecord` if a listed record cannot be read
    #[instrument(
        skip(self, ctx, query),
        fields(page_num = query.page_num, clauses = query.clauses.len())
    )]
    pub async fn list(
        &self,
        ctx: &IdentityContext,
        query: &ListQuery,
    ) -> Result<CustomerListing, DomainError> {
        let started = Instant::now();
        let page_size = self.cfg.page_size(query.page_size);
        let page_num = query.page_num.max(1);

        if let Some(parent) = query.parent.as_deref().and_then(present) {
            let set = self
                .objects()
                .filter(Predicate::eq(Self::property("parent"), parent));
            return self
                .page(set, ListScope::Parent(parent.to_owned()), page_size, page_num, started)
                .await;
        }

        if let Some(distributor) = ctx.distributor_id() {
            let set = self
                .objects()
                .filter(Predicate::eq(Self::property("db_code"), distributor));
            return self
                .page(
                    set,
                    ListScope::Distributor(distributor.to_owned()),
                    page_size,
                    page_num,
                    started,
                )
                .await;
        }

        let Composition {
            query: set,
            applied,
            fell_back_at,
            search_field,
        } = self
            .composer
            .compose(
                self.objects(),
                &query.clauses,
                query.search.as_deref(),
                query.sort.as_ref(),
            )
            .await?;
        let scope = ListScope::Composed {
            applied,
            fell_back_at,
            search_field,
        };
        self.page(set, scope, page_size, page_num, started).await
    }

    /// Organizations without a parent.
    ///
    /// # Errors
    ///
    /// - `Store` if the store cannot be queried
    /// - `MalformedRecord` if a listed record cannot be read
    #[instrument(skip(self))]
    pub async fn list_orphans(
        &self,
        page_num: usize,
        page_size: Option<usize>,
    ) -> Result<CustomerListing, DomainError> {
        let started = Instant::now();
        let parent = Self::property("parent");
        let set = self.objects().filter(Predicate::Or {
            value: vec![Predicate::eq(parent, ""), Predicate::is_null(parent)],
        });
        self.page(
            set,
            ListScope::Orphans,
            self.cfg.page_size(page_size),
            page_num.max(1),
            started,
        )
        .await
    }

    /// The active organization with `account_code`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no active organization has that account code
    /// - `Store` if the store cannot be queried
    /// - `MalformedRecord` if the record cannot be read
    #[instrument(skip(self))]
    pub async fn get(&self, account_code: &str) -> Result<Customer, DomainError> {
        let record = self
            .objects()
            .filter(Predicate::eq(
                Self::property("customer_account_code"),
                account_code,
            ))
            .first()
            .await?
            .ok_or_else(|| DomainError::not_found(account_code))?;
        Ok(Customer::from_record(record)?)
    }

    /// Every soft-deleted organization.
    ///
    /// # Errors
    ///
    /// - `Store` if the store cannot be queried
    /// - `MalformedRecord` if a record cannot be read
    #[instrument(skip(self))]
    pub async fn list_deleted(&self) -> Result<Vec<Customer>, DomainError> {
        let records = self.all_objects().filter(self.soft_deleted()).fetch_all().await?;
        debug!(count = records.len(), "deleted customers fetched");
        records
            .into_iter()
            .map(|r| Customer::from_record(r).map_err(DomainError::from))
            .collect()
    }

    async fn page(
        &self,
        set: ObjectQuery,
        scope: ListScope,
        page_size: usize,
        page_num: usize,
        started: Instant,
    ) -> Result<CustomerListing, DomainError> {
        let count_started = Instant::now();
        let total = set.count().await?;
        let count = count_started.elapsed();

        let page_started = Instant::now();
        let records = set.nth_page(page_size, page_num).await?;
        let page = page_started.elapsed();

        let permissions = CustomerPermissions::granted();
        let items = match scope {
            ListScope::Parent(_) | ListScope::Orphans => ListedCustomers::Children(
                convert(records, |c| ChildCustomerSummary::new(c, permissions))?,
            ),
            ListScope::Distributor(_) | ListScope::Composed { .. } => ListedCustomers::Summaries(
                convert(records, |c| CustomerSummary::new(c, permissions))?,
            ),
        };

        let timings = ListTimings {
            count,
            page,
            total: started.elapsed(),
        };
        info!(
            ?scope,
            total,
            returned = items.len(),
            elapsed_ms = timings.total.as_millis(),
            "customers listed"
        );
        Ok(CustomerListing {
            total,
            items,
            scope,
            timings,
        })
    }
}

fn convert<T>(records: Vec<Record>, f: impl Fn(Customer) -> T) -> Result<Vec<T>, DomainError> {
    records
        .into_iter()
        .map(|r| Customer::from_record(r).map(&f).map_err(DomainError::from))
        .collect()
}

/// Trimmed value unless blank or the literal `None`.
fn present(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && value != "None").then_some(value)
}
