use idm_credentials::AuthExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OntologyError {
    #[error("ontology store unreachable: {0}")]
    Transport(String),

    #[error("ontology request timed out")]
    Timeout,

    #[error("ontology store answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected ontology response: {0}")]
    Decode(String),

    #[error(transparent)]
    Credentials(#[from] AuthExchangeError),

    #[error("invalid ontology configuration: {0}")]
    Config(String),
}

impl OntologyError {
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// Timeouts from either the store or the token endpoint.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Credentials(AuthExchangeError::Timeout { .. })
        )
    }
}
