//! Identity Resolver SDK
//!
//! This crate provides the public API for the `identity_resolver` module:
//!
//! - [`IdentityResolverClient`] - Public API trait for consumers
//! - [`IdentityResolverError`] - Error types
//!
//! The resolved value itself, [`IdentityContext`], lives in `idm_security`
//! and is re-exported here.
//!
//! ## Usage
//!
//! ```ignore
//! use identity_resolver_sdk::IdentityResolverClient;
//!
//! let ctx = resolver.resolve(Some("eyJ0eXAi...")).await;
//! if ctx.is_distributor() { /* scope by ctx.distributor_id() */ }
//! ```

pub mod api;
pub mod error;

pub use api::IdentityResolverClient;
pub use error::IdentityResolverError;
pub use idm_security::{IdentityContext, PrincipalKind};
