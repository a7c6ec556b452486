//! Configuration for the identity resolver.

use std::time::Duration;

use idm_security::{HOME_ROLE_ID_PROPERTY, USER_ID_PROPERTY};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use serde::Deserialize;

/// Configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityResolverConfig {
    /// Object type holding users.
    pub user_object_type: String,

    /// Object type holding roles.
    pub role_object_type: String,

    pub properties: PropertyNames,

    /// Value of the soft-delete property that marks a user as deleted.
    pub delete_flag: String,

    /// Accept a subject id from the query string instead of the token.
    /// Development only.
    pub allow_subject_override: bool,

    /// Query parameter read when `allow_subject_override` is set.
    pub subject_override_param: String,

    pub jwt: JwtConfig,
}

impl Default for IdentityResolverConfig {
    fn default() -> Self {
        Self {
            user_object_type: "MyKomatsuUser".to_owned(),
            role_object_type: "MyKomatsuRole".to_owned(),
            properties: PropertyNames::default(),
            delete_flag: "Y".to_owned(),
            allow_subject_override: false,
            subject_override_param: "entra_id".to_owned(),
            jwt: JwtConfig::default(),
        }
    }
}

impl IdentityResolverConfig {
    /// The override parameter, if overriding is enabled.
    #[must_use]
    pub fn subject_override(&self) -> Option<&str> {
        self.allow_subject_override
            .then_some(self.subject_override_param.as_str())
            .filter(|p| !p.is_empty())
    }
}

/// Property names used by the user and role lookups.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyNames {
    /// User property matched against the token subject.
    pub subject: String,

    /// User property compared with `delete_flag`.
    pub soft_delete: String,

    /// User property holding the user's id.
    pub user_id: String,

    /// User property holding the id of the user's home role.
    pub home_role_id: String,

    /// Role property holding the owning user's id.
    pub role_user_id: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            subject: "entraId".to_owned(),
            soft_delete: "softDeleteFlag".to_owned(),
            user_id: USER_ID_PROPERTY.to_owned(),
            home_role_id: HOME_ROLE_ID_PROPERTY.to_owned(),
            role_user_id: "userId".to_owned(),
        }
    }
}

/// Inbound bearer token validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JwtConfig {
    /// Expected `iss`, e.g. `https://sts.windows.net/{tenant}/`.
    pub issuer: Option<String>,

    /// Accepted `aud` values. Empty disables the audience check.
    pub audience: Vec<String>,

    pub algorithms: Vec<Algorithm>,

    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    pub leeway_secs: u64,

    /// Signing key source. Without one every token is rejected.
    pub key: Option<JwtKeyConfig>,

    /// Timeout for fetching the key set.
    pub jwks_timeout_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: Vec::new(),
            algorithms: vec![Algorithm::RS256],
            leeway_secs: 60,
            key: None,
            jwks_timeout_secs: 10,
        }
    }
}

impl JwtConfig {
    #[must_use]
    pub fn jwks_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum JwtKeyConfig {
    /// Keys published by the identity platform, selected by `kid`.
    Jwks { url: String },
    /// Shared secret for HMAC algorithms.
    Secret { secret: SecretString },
}
