#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Bearer credentials for the two backends this service talks to.
//!
//! Each backend is a separate trust domain with its own
//! [`CredentialProvider`]. A provider owns one [`TokenCache`] and only goes
//! to the network when the cached token has crossed its refresh threshold:
//!
//! - the ontology ("service") provider refreshes `300s` before expiry,
//! - the directory provider refreshes exactly at expiry.
//!
//! ```ignore
//! let provider = CachingCredentialProvider::service(&cfg.credentials.service)?;
//! let token = provider.bearer_token().await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod exchange;
pub mod provider;
pub mod token;

pub use cache::TokenCache;
pub use config::{DirectoryCredentialsConfig, ServiceCredentialsConfig};
pub use error::AuthExchangeError;
pub use exchange::{ClientCredentialsExchange, TokenExchange};
pub use provider::{CachingCredentialProvider, CredentialProvider};
pub use token::{CachedToken, RefreshPolicy, TokenResponse, MAX_TOKEN_LIFETIME};
