//! Request middleware attaching an [`IdentityContext`] to every request.
//!
//! The middleware never rejects a request. Callers without a usable token get
//! an anonymous context; handlers decide what anonymous callers may see.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use identity_resolver_sdk::{IdentityContext, IdentityResolverClient};

/// Shared state for [`identity_middleware`].
#[derive(Clone)]
pub struct IdentityState {
    pub resolver: Arc<dyn IdentityResolverClient>,
    /// Query parameter that replaces the token subject. `None` disables it.
    pub subject_override_param: Option<String>,
}

impl IdentityState {
    #[must_use]
    pub fn new(resolver: Arc<dyn IdentityResolverClient>) -> Self {
        Self {
            resolver,
            subject_override_param: None,
        }
    }

    #[must_use]
    pub fn with_subject_override(mut self, param: Option<&str>) -> Self {
        self.subject_override_param = param.map(str::to_owned);
        self
    }

    fn override_subject(&self, uri: &Uri) -> Option<String> {
        let param = self.subject_override_param.as_deref()?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(uri.query()?).ok()?;
        pairs
            .into_iter()
            .find(|(key, _)| key == param)
            .map(|(_, value)| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }
}

/// Resolve the caller and insert its [`IdentityContext`] into the request
/// extensions.
pub async fn identity_middleware(
    State(state): State<IdentityState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = if let Some(subject) = state.override_subject(req.uri()) {
        tracing::warn!(%subject, "identity taken from query override");
        state.resolver.resolve_subject(&subject).await
    } else {
        state.resolver.resolve(extract_bearer_token(req.headers())).await
    };

    req.extensions_mut().insert::<IdentityContext>(ctx);
    next.run(req).await
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(str::trim))
        .filter(|t| !t.is_empty())
}
