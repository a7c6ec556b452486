//! In-process object store for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::client::{ObjectPage, OntologyClient, SearchRequest};
use crate::error::OntologyError;
use crate::predicate::Predicate;
use crate::Record;

/// Objects held in memory, grouped by object type.
///
/// Page tokens are plain offsets. Every search and count is counted so tests
/// can assert on round trips.
#[derive(Debug, Default)]
pub struct InMemoryOntology {
    objects: RwLock<HashMap<String, Vec<Record>>>,
    searches: AtomicUsize,
    counts: AtomicUsize,
}

impl InMemoryOntology {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, object_type: &str, record: Record) {
        self.objects
            .write()
            .entry(object_type.to_owned())
            .or_default()
            .push(record);
    }

    pub fn extend<I>(&self, object_type: &str, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        self.objects
            .write()
            .entry(object_type.to_owned())
            .or_default()
            .extend(records);
    }

    #[must_use]
    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn count_calls(&self) -> usize {
        self.counts.load(Ordering::Relaxed)
    }

    fn matching(&self, object_type: &str, filter: Option<&Predicate>) -> Vec<Record> {
        self.objects
            .read()
            .get(object_type)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.is_none_or(|p| p.matches(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl OntologyClient for InMemoryOntology {
    async fn search(&self, request: SearchRequest) -> Result<ObjectPage, OntologyError> {
        self.searches.fetch_add(1, Ordering::Relaxed);

        let offset = match request.page_token.as_deref() {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| OntologyError::Status {
                    status: 400,
                    message: format!("invalid page token '{token}'"),
                })?,
        };

        let mut rows = self.matching(&request.object_type, request.filter.as_ref());
        if let Some(order) = &request.order_by {
            rows.sort_by(|a, b| order.compare(a, b));
        }

        let page_size = request.page_size.max(1);
        let end = offset.saturating_add(page_size).min(rows.len());
        let data = rows.get(offset..end).map(<[Record]>::to_vec).unwrap_or_default();
        let next_page_token = (end < rows.len()).then(|| end.to_string());

        Ok(ObjectPage {
            data,
            next_page_token,
        })
    }

    async fn count(
        &self,
        object_type: &str,
        filter: Option<&Predicate>,
    ) -> Result<u64, OntologyError> {
        self.counts.fetch_add(1, Ordering::Relaxed);
        Ok(self.matching(object_type, filter).len() as u64)
    }
}
