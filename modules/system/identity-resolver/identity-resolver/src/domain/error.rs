//! Domain errors for the identity resolver.

use identity_resolver_sdk::IdentityResolverError;
use ontology_client::OntologyError;

/// Internal domain errors.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("bearer token rejected: {0}")]
    InvalidToken(String),

    #[error("bearer token carries no subject")]
    MissingSubject,

    #[error("signing keys unavailable: {0}")]
    KeysUnavailable(String),

    #[error("identity store query failed: {0}")]
    Store(#[from] OntologyError),

    #[error("malformed identity record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    #[error("invalid identity resolver configuration: {0}")]
    Config(String),
}

impl From<jsonwebtoken::errors::Error> for DomainError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidToken(e.to_string())
    }
}

impl From<DomainError> for IdentityResolverError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidToken(msg) => Self::Unauthorized(msg),
            DomainError::MissingSubject => Self::Unauthorized("missing subject".to_owned()),
            DomainError::Store(e) => Self::LookupFailed(e.to_string()),
            DomainError::MalformedRecord(e) => Self::MalformedRecord(e.to_string()),
            DomainError::KeysUnavailable(reason) | DomainError::Config(reason) => {
                Self::Internal(reason)
            }
        }
    }
}
