//! Configuration for the two credential providers.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::error::AuthExchangeError;

fn join_url(base: &str, path: &str) -> Result<Url, AuthExchangeError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&raw).map_err(|e| AuthExchangeError::Config(format!("invalid token url '{raw}': {e}")))
}

/// Client credentials for the ontology platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceCredentialsConfig {
    /// Platform base URL, e.g. `https://stack.example.com`.
    pub hostname: String,

    pub client_id: String,

    pub client_secret: SecretString,

    pub scope: String,

    /// Seconds before expiry at which the token is refreshed.
    pub refresh_margin_secs: u64,

    /// Timeout for one token exchange.
    pub timeout_secs: u64,
}

impl Default for ServiceCredentialsConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            client_id: String::new(),
            client_secret: SecretString::from(String::new()),
            scope: "api:read-data".to_owned(),
            refresh_margin_secs: 300,
            timeout_secs: 30,
        }
    }
}

impl ServiceCredentialsConfig {
    /// `{hostname}/multipass/api/oauth2/token`
    ///
    /// # Errors
    ///
    /// Returns [`AuthExchangeError::Config`] when the hostname is not a valid URL.
    pub fn token_url(&self) -> Result<Url, AuthExchangeError> {
        join_url(&self.hostname, "multipass/api/oauth2/token")
    }

    #[must_use]
    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Service principal credentials for the directory platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryCredentialsConfig {
    pub authority: String,

    pub tenant_id: String,

    pub client_id: String,

    pub client_secret: SecretString,

    pub scope: String,

    /// Redirect URI registered for the application. The directory grant
    /// always carries it.
    pub redirect_uri: Option<String>,

    /// Seconds before expiry at which the token is refreshed. `0` uses the
    /// token for its whole lifetime.
    pub refresh_margin_secs: u64,

    pub timeout_secs: u64,
}

impl Default for DirectoryCredentialsConfig {
    fn default() -> Self {
        Self {
            authority: "https://login.microsoftonline.com".to_owned(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: SecretString::from(String::new()),
            scope: "https://graph.microsoft.com/.default".to_owned(),
            redirect_uri: None,
            refresh_margin_secs: 0,
            timeout_secs: 30,
        }
    }
}

impl DirectoryCredentialsConfig {
    /// `{authority}/{tenant_id}/oauth2/v2.0/token`
    ///
    /// # Errors
    ///
    /// Returns [`AuthExchangeError::Config`] when the tenant id is empty or the
    /// authority is not a valid URL.
    pub fn token_url(&self) -> Result<Url, AuthExchangeError> {
        let tenant = self.tenant_id.trim();
        if tenant.is_empty() {
            return Err(AuthExchangeError::Config(
                "directory tenant_id is not set".to_owned(),
            ));
        }
        join_url(&self.authority, &format!("{tenant}/oauth2/v2.0/token"))
    }

    /// The configured redirect URI, checked to be an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthExchangeError::Config`] when the value is missing, blank
    /// or not a valid URL.
    pub fn redirect_uri(&self) -> Result<Url, AuthExchangeError> {
        let raw = self
            .redirect_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| {
                AuthExchangeError::Config("directory redirect_uri is not set".to_owned())
            })?;
        Url::parse(raw).map_err(|e| {
            AuthExchangeError::Config(format!("invalid directory redirect_uri '{raw}': {e}"))
        })
    }

    #[must_use]
    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn service_token_url_tolerates_trailing_slash() {
        let cfg = ServiceCredentialsConfig {
            hostname: "https://stack.example.com/".to_owned(),
            ..ServiceCredentialsConfig::default()
        };

        assert_eq!(
            cfg.token_url().unwrap().as_str(),
            "https://stack.example.com/multipass/api/oauth2/token"
        );
    }

    #[test]
    fn service_token_url_requires_hostname() {
        let err = ServiceCredentialsConfig::default().token_url().unwrap_err();
        assert!(matches!(err, AuthExchangeError::Config(_)));
    }

    #[test]
    fn directory_token_url_uses_tenant() {
        let cfg = DirectoryCredentialsConfig {
            tenant_id: "contoso".to_owned(),
            ..DirectoryCredentialsConfig::default()
        };

        assert_eq!(
            cfg.token_url().unwrap().as_str(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
    }

    #[test]
    fn directory_token_url_rejects_missing_tenant() {
        let err = DirectoryCredentialsConfig::default().token_url().unwrap_err();
        assert!(matches!(err, AuthExchangeError::Config(_)));
    }

    #[test]
    fn directory_redirect_uri_is_required() {
        for value in [None, Some(""), Some("  "), Some("not a url")] {
            let cfg = DirectoryCredentialsConfig {
                redirect_uri: value.map(str::to_owned),
                ..DirectoryCredentialsConfig::default()
            };
            let err = cfg.redirect_uri().unwrap_err();
            assert!(matches!(err, AuthExchangeError::Config(_)), "{value:?}");
        }

        let cfg = DirectoryCredentialsConfig {
            redirect_uri: Some(" https://app.example.com/cb ".to_owned()),
            ..DirectoryCredentialsConfig::default()
        };
        assert_eq!(cfg.redirect_uri().unwrap().as_str(), "https://app.example.com/cb");
    }

    #[test]
    fn defaults_match_provider_refresh_rules() {
        assert_eq!(
            ServiceCredentialsConfig::default().refresh_margin(),
            Duration::from_secs(300)
        );
        assert_eq!(
            DirectoryCredentialsConfig::default().refresh_margin(),
            Duration::ZERO
        );
    }

    #[test]
    fn deserializes_secret_and_rejects_unknown_keys() {
        let cfg: ServiceCredentialsConfig = serde_json::from_str(
            r#"{"hostname":"https://h","client_id":"id","client_secret":"s3cret"}"#,
        )
        .unwrap();
        assert_eq!(cfg.scope, "api:read-data");
        assert!(!format!("{cfg:?}").contains("s3cret"));

        let bad = serde_json::from_str::<ServiceCredentialsConfig>(r#"{"hostnme":"x"}"#);
        assert!(bad.is_err());
    }
}
