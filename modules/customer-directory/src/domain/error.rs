use ontology_client::OntologyError;
use thiserror::Error;

/// Domain-level errors for customer directory operations
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown filter attribute: {attribute}")]
    UnknownFilterAttribute { attribute: String },

    #[error("Unsupported filter operator: {operator}")]
    UnsupportedOperator { operator: String },

    #[error("Invalid value for filter '{attribute}': {reason}")]
    InvalidFilterValue { attribute: String, reason: String },

    #[error("Invalid sort_by value: {attribute}")]
    InvalidSortAttribute { attribute: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("No customer found with account code: {account_code}")]
    NotFound { account_code: String },

    #[error("Customer store query failed: {0}")]
    Store(#[from] OntologyError),

    #[error("Malformed customer record: {0}")]
    MalformedRecord(#[from] serde_json::Error),
}

impl DomainError {
    pub fn unknown_filter_attribute(attribute: impl Into<String>) -> Self {
        Self::UnknownFilterAttribute {
            attribute: attribute.into(),
        }
    }

    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
        }
    }

    pub fn invalid_filter_value(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilterValue {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_sort_attribute(attribute: impl Into<String>) -> Self {
        Self::InvalidSortAttribute {
            attribute: attribute.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn not_found(account_code: impl Into<String>) -> Self {
        Self::NotFound {
            account_code: account_code.into(),
        }
    }

    /// Caused by caller input rather than by the store.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::MalformedRecord(_))
    }
}
