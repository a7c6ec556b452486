//! Customer Directory Module
//!
//! Lists customer organizations from the ontology store. Caller filters are
//! applied one at a time and dropped once one would empty the result; search
//! and sorting follow. Distributor callers only ever see their own customers.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod module;

pub use config::CustomerDirectoryConfig;
pub use domain::{CustomerDirectoryService, DomainError, ListQuery};
pub use module::CustomerDirectoryModule;
