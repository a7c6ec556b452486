//! Domain layer for the identity resolver.

pub mod bearer;
pub mod capability;
pub mod error;
pub mod fetcher;
pub mod local_client;
pub mod service;

pub use bearer::BearerDecoder;
pub use error::DomainError;
pub use fetcher::IdentityFetcher;
pub use local_client::IdentityResolverLocalClient;
pub use service::Service;
