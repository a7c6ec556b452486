//! Lazily evaluated object set.
//!
//! An [`ObjectQuery`] is a value: narrowing or ordering it returns a new
//! query and leaves the original untouched, so callers can try a narrowing,
//! inspect its size, and keep or discard it.

use std::fmt;
use std::sync::Arc;

use crate::client::{ObjectPage, OntologyClient, SearchRequest};
use crate::error::OntologyError;
use crate::predicate::{OrderBy, Predicate};
use crate::Record;

/// Page size used when draining a whole result set.
pub const DRAIN_PAGE_SIZE: usize = 500;

#[derive(Clone)]
pub struct ObjectQuery {
    client: Arc<dyn OntologyClient>,
    object_type: String,
    filters: Vec<Predicate>,
    order: Option<OrderBy>,
}

impl fmt::Debug for ObjectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectQuery")
            .field("object_type", &self.object_type)
            .field("filters", &self.filters)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl ObjectQuery {
    pub fn new(client: Arc<dyn OntologyClient>, object_type: impl Into<String>) -> Self {
        Self {
            client,
            object_type: object_type.into(),
            filters: Vec::new(),
            order: None,
        }
    }

    #[must_use]
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Narrow by `predicate`, in addition to every earlier filter.
    #[must_use]
    pub fn filter(&self, predicate: Predicate) -> Self {
        let mut next = self.clone();
        next.filters.push(predicate);
        next
    }

    #[must_use]
    pub fn order_by(&self, order: OrderBy) -> Self {
        let mut next = self.clone();
        next.order = Some(order);
        next
    }

    #[must_use]
    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    /// The conjunction of all filters.
    #[must_use]
    pub fn predicate(&self) -> Option<Predicate> {
        Predicate::all(self.filters.iter().cloned())
    }

    /// # Errors
    ///
    /// Returns [`OntologyError`] when the store cannot be queried.
    pub async fn count(&self) -> Result<u64, OntologyError> {
        self.client
            .count(&self.object_type, self.predicate().as_ref())
            .await
    }

    /// # Errors
    ///
    /// Returns [`OntologyError`] when the store cannot be queried.
    pub async fn is_empty(&self) -> Result<bool, OntologyError> {
        Ok(self.count().await? == 0)
    }

    /// # Errors
    ///
    /// Returns [`OntologyError`] when the store cannot be queried.
    pub async fn fetch_page(
        &self,
        page_size: usize,
        page_token: Option<String>,
    ) -> Result<ObjectPage, OntologyError> {
        self.client
            .search(SearchRequest {
                object_type: self.object_type.clone(),
                filter: self.predicate(),
                order_by: self.order.clone(),
                page_size,
                page_token,
            })
            .await
    }

    /// The `page_num`-th page (1-based), reached by following page tokens.
    /// Past the last page the result is empty.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError`] when the store cannot be queried.
    pub async fn nth_page(
        &self,
        page_size: usize,
        page_num: usize,
    ) -> Result<Vec<Record>, OntologyError> {
        let mut token = None;
        for _ in 1..page_num.max(1) {
            let page = self.fetch_page(page_size, token).await?;
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => return Ok(Vec::new()),
            }
        }
        Ok(self.fetch_page(page_size, token).await?.data)
    }

    /// # Errors
    ///
    /// Returns [`OntologyError`] when the store cannot be queried.
    pub async fn first(&self) -> Result<Option<Record>, OntologyError> {
        Ok(self.fetch_page(1, None).await?.data.into_iter().next())
    }

    /// Every matching object, draining all pages.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError`] when the store cannot be queried.
    pub async fn fetch_all(&self) -> Result<Vec<Record>, OntologyError> {
        let mut out = Vec::new();
        let mut token = None;
        loop {
            let page = self.fetch_page(DRAIN_PAGE_SIZE, token).await?;
            out.extend(page.data);
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => return Ok(out),
            }
        }
    }
}
