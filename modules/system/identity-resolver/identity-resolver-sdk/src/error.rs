//! Error types for the identity resolver module.

use thiserror::Error;

/// Errors of the strict lookup path.
///
/// The degrading entry points of [`crate::IdentityResolverClient`] never
/// return these; they log them and yield an anonymous context instead.
#[derive(Debug, Error)]
pub enum IdentityResolverError {
    /// The bearer token failed validation or carried no subject.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The ontology store could not be queried.
    #[error("identity lookup failed: {0}")]
    LookupFailed(String),

    /// The store returned a record the resolver could not read.
    #[error("malformed identity record: {0}")]
    MalformedRecord(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
