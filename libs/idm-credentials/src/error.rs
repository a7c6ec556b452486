//! Credential exchange errors.

use thiserror::Error;

/// A token could not be obtained. Never papered over with a stale token.
#[derive(Debug, Error)]
pub enum AuthExchangeError {
    /// The token endpoint could not be reached.
    #[error("{provider}: token endpoint unreachable: {reason}")]
    Connectivity { provider: String, reason: String },

    /// The exchange did not complete within the configured timeout.
    #[error("{provider}: token exchange timed out")]
    Timeout { provider: String },

    /// The token endpoint answered with a non-success status.
    #[error("{provider}: token endpoint rejected the grant ({status}): {reason}")]
    Rejected {
        provider: String,
        status: u16,
        reason: String,
    },

    /// The token endpoint answered 2xx with an unusable body.
    #[error("{provider}: invalid token response: {reason}")]
    InvalidResponse { provider: String, reason: String },

    /// The provider configuration cannot produce a valid request.
    #[error("invalid credential configuration: {0}")]
    Config(String),
}

impl AuthExchangeError {
    #[must_use]
    pub fn from_transport(provider: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_owned(),
            }
        } else {
            Self::Connectivity {
                provider: provider.to_owned(),
                reason: err.to_string(),
            }
        }
    }

    pub fn invalid_response(provider: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.to_owned(),
            reason: reason.into(),
        }
    }

    /// True when retrying later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connectivity { .. } | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::InvalidResponse { .. } | Self::Config(_) => false,
        }
    }
}
