//! Identity Resolver Module
//!
//! Validates the inbound bearer token, fetches the caller's user and role
//! records from the ontology store and classifies them into an
//! [`identity_resolver_sdk::IdentityContext`].
//!
//! Exposes the `IdentityResolverClient` implementation and an axum
//! middleware that attaches the resolved context to every request.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod middleware;
pub mod module;

pub use config::{IdentityResolverConfig, JwtConfig, JwtKeyConfig, PropertyNames};
pub use middleware::{identity_middleware, IdentityState};
pub use module::IdentityResolverModule;
