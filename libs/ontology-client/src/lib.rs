#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Object queries against the ontology store.
//!
//! The store is reached through [`OntologyClient`]; [`ObjectQuery`] is the
//! immutable, lazily evaluated object set built on top of it. Two clients
//! exist: [`FoundryOntologyClient`] over HTTP and [`InMemoryOntology`] for
//! tests and local runs.

pub mod client;
pub mod config;
pub mod error;
pub mod foundry;
pub mod memory;
pub mod predicate;
pub mod query;

/// A stored object as a flat property map.
pub type Record = serde_json::Map<String, serde_json::Value>;

pub use client::{ObjectPage, OntologyClient, SearchRequest};
pub use config::OntologyConfig;
pub use error::OntologyError;
pub use foundry::FoundryOntologyClient;
pub use memory::InMemoryOntology;
pub use predicate::{OrderBy, Predicate, SortDirection};
pub use query::ObjectQuery;
