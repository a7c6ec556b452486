use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::error::DomainError;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// RFC 9457 problem document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

pub type ApiResult<T> = Result<T, Problem>;

impl Problem {
    #[must_use]
    pub fn new(status: StatusCode, title: &str, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.to_owned(),
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}

/// Convert domain errors to HTTP Problem responses
#[must_use]
pub fn domain_error_to_problem(err: DomainError) -> Problem {
    if err.is_client_error() {
        tracing::debug!(error = %err, "request rejected");
    }
    match err {
        DomainError::UnknownFilterAttribute { .. }
        | DomainError::UnsupportedOperator { .. }
        | DomainError::InvalidFilterValue { .. } => {
            Problem::new(StatusCode::BAD_REQUEST, "Invalid Filter", err.to_string())
        }

        DomainError::InvalidSortAttribute { .. } => {
            Problem::new(StatusCode::BAD_REQUEST, "Invalid Sort Attribute", err.to_string())
        }

        DomainError::InvalidRequest { message } => {
            Problem::new(StatusCode::BAD_REQUEST, "Invalid Request", message)
        }

        DomainError::NotFound { .. } => {
            Problem::new(StatusCode::NOT_FOUND, "Customer Not Found", err.to_string())
        }

        DomainError::Store(ref source) if source.is_timeout() => {
            tracing::error!(error = %source, "customer store timed out");
            Problem::new(
                StatusCode::GATEWAY_TIMEOUT,
                "Upstream Timeout",
                "The customer store did not answer in time",
            )
        }

        DomainError::Store(source) => {
            tracing::error!(error = %source, "customer store query failed");
            Problem::new(
                StatusCode::BAD_GATEWAY,
                "Upstream Error",
                "The customer store could not be queried",
            )
        }

        DomainError::MalformedRecord(source) => {
            tracing::error!(error = %source, "customer store returned a malformed record");
            Problem::new(
                StatusCode::BAD_GATEWAY,
                "Upstream Error",
                "The customer store returned an unreadable record",
            )
        }
    }
}

/// Implement Into<Problem> for `DomainError` so `?` works in handlers
impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(e)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use ontology_client::OntologyError;

    use super::*;

    #[test]
    fn caller_mistakes_are_bad_requests() {
        for err in [
            DomainError::invalid_sort_attribute("nope"),
            DomainError::unsupported_operator("ends_with"),
            DomainError::unknown_filter_attribute("color"),
            DomainError::invalid_filter_value("status", "'maybe' is not a boolean"),
            DomainError::invalid_request("page_num must be a positive integer"),
        ] {
            assert_eq!(Problem::from(err).status, 400);
        }
    }

    #[test]
    fn only_client_errors_map_to_4xx() {
        for err in [
            DomainError::invalid_filter_value("parent", "missing value"),
            DomainError::not_found("A-1"),
            DomainError::Store(OntologyError::Timeout),
            DomainError::MalformedRecord(serde_json::from_str::<u8>("x").unwrap_err()),
        ] {
            let client = err.is_client_error();
            let status = Problem::from(err).status_code();
            assert_eq!(status.is_client_error(), client, "{status}");
            assert_eq!(status.is_server_error(), !client, "{status}");
        }
    }

    #[test]
    fn store_failures_map_to_gateway_statuses() {
        let timeout = Problem::from(DomainError::Store(OntologyError::Timeout));
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let status = Problem::from(DomainError::Store(OntologyError::Status {
            status: 500,
            message: "boom".to_owned(),
        }));
        assert_eq!(status.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!status.detail.contains("boom"));
    }

    #[test]
    fn problem_response_uses_problem_content_type() {
        let response = Problem::from(DomainError::not_found("A-1")).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            PROBLEM_CONTENT_TYPE
        );
    }
}
