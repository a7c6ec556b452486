//! Layered server configuration: defaults, then the YAML file, then `MK__*`
//! environment variables.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use customer_directory::CustomerDirectoryConfig;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use identity_resolver::IdentityResolverConfig;
use idm_credentials::{DirectoryCredentialsConfig, ServiceCredentialsConfig};
use ontology_client::OntologyConfig;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "MK__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialsConfig,
    pub ontology: OntologyConfig,
    pub identity: IdentityResolverConfig,
    pub customers: CustomerDirectoryConfig,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or a value does not fit
    /// its field.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Upper bound for handling one request.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is not set.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsConfig {
    pub service: ServiceCredentialsConfig,

    /// Directory platform credentials; the provider is only built when set.
    pub directory: Option<DirectoryCredentialsConfig>,
}
