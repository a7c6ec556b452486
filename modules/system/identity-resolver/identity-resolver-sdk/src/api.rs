//! Public API trait for the identity resolver.

use async_trait::async_trait;
use idm_security::IdentityContext;

use crate::error::IdentityResolverError;

/// Public API trait for the identity resolver.
///
/// `resolve` and `resolve_subject` always produce a context: a caller whose
/// identity cannot be established is anonymous, which downstream
/// authorization decides how to treat. `lookup` is the strict variant for
/// callers that need to tell "not found" from "store down".
#[async_trait]
pub trait IdentityResolverClient: Send + Sync {
    /// Resolve the caller from a raw bearer token (without the `Bearer `
    /// prefix). `None` or an invalid token yields an anonymous context.
    async fn resolve(&self, bearer_token: Option<&str>) -> IdentityContext;

    /// Resolve a subject id taken from an already validated token.
    async fn resolve_subject(&self, subject_id: &str) -> IdentityContext;

    /// Look up a subject id.
    ///
    /// Returns `Ok(None)` when no active user matches.
    ///
    /// # Errors
    ///
    /// - `LookupFailed` if the ontology store cannot be queried
    /// - `MalformedRecord` if the stored user or roles cannot be read
    async fn lookup(
        &self,
        subject_id: &str,
    ) -> Result<Option<IdentityContext>, IdentityResolverError>;
}
