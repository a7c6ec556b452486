//! Token types and the refresh threshold rule.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use tokio::time::Instant;

/// Longest lifetime a cached token is trusted for, whatever the provider
/// reports.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Successful response of an OAuth2 token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecretString,

    /// Lifetime in seconds.
    pub expires_in: u64,

    #[serde(default)]
    pub token_type: Option<String>,
}

/// When a cached token stops being handed out.
///
/// A token is refreshed once `now >= expires_at - safety_margin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    safety_margin: Duration,
}

impl RefreshPolicy {
    #[must_use]
    pub const fn with_margin(safety_margin: Duration) -> Self {
        Self { safety_margin }
    }

    /// Use the token for its full lifetime.
    #[must_use]
    pub const fn exact() -> Self {
        Self::with_margin(Duration::ZERO)
    }

    #[must_use]
    pub const fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    /// Instant after which a token issued at `issued_at` must be refreshed.
    ///
    /// `lifetime` is capped at [`MAX_TOKEN_LIFETIME`].
    #[must_use]
    pub fn refresh_at(&self, issued_at: Instant, lifetime: Duration) -> Instant {
        later(issued_at, lifetime.min(MAX_TOKEN_LIFETIME).saturating_sub(self.safety_margin))
    }
}

fn later(at: Instant, by: Duration) -> Instant {
    at.checked_add(by).unwrap_or(at)
}

/// A bearer token with its expiry. Replaced on refresh, never mutated.
#[derive(Debug, Clone)]
pub struct CachedToken {
    value: SecretString,
    expires_at: Instant,
    refresh_at: Instant,
}

impl CachedToken {
    /// Lifetimes above [`MAX_TOKEN_LIFETIME`] are capped.
    #[must_use]
    pub fn new(
        value: SecretString,
        lifetime: Duration,
        policy: RefreshPolicy,
        issued_at: Instant,
    ) -> Self {
        Self {
            value,
            expires_at: later(issued_at, lifetime.min(MAX_TOKEN_LIFETIME)),
            refresh_at: policy.refresh_at(issued_at, lifetime),
        }
    }

    #[must_use]
    pub fn from_response(response: TokenResponse, policy: RefreshPolicy, issued_at: Instant) -> Self {
        Self::new(
            response.access_token,
            Duration::from_secs(response.expires_in),
            policy,
            issued_at,
        )
    }

    #[must_use]
    pub fn value(&self) -> &SecretString {
        &self.value
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    #[must_use]
    pub fn refresh_at(&self) -> Instant {
        self.refresh_at
    }

    /// Whether the token may still be handed out at `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}
