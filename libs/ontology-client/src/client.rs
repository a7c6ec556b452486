use async_trait::async_trait;
use serde::Deserialize;

use crate::error::OntologyError;
use crate::predicate::{OrderBy, Predicate};
use crate::Record;

/// One page of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub object_type: String,
    pub filter: Option<Predicate>,
    pub order_by: Option<OrderBy>,
    pub page_size: usize,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPage {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Remote object-query capability of the ontology store.
#[async_trait]
pub trait OntologyClient: Send + Sync {
    /// # Errors
    ///
    /// Returns [`OntologyError`] when the store cannot be queried.
    async fn search(&self, request: SearchRequest) -> Result<ObjectPage, OntologyError>;

    /// Number of objects of `object_type` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError`] when the store cannot be queried.
    async fn count(
        &self,
        object_type: &str,
        filter: Option<&Predicate>,
    ) -> Result<u64, OntologyError>;
}
