//! HTTP client for the ontology store's v2 object search API.

use std::sync::Arc;

use async_trait::async_trait;
use idm_credentials::CredentialProvider;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::client::{ObjectPage, OntologyClient, SearchRequest};
use crate::config::OntologyConfig;
use crate::error::OntologyError;
use crate::predicate::{OrderBy, Predicate};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Predicate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_by: Option<OrderByBody<'a>>,
    page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Serialize)]
struct OrderByBody<'a> {
    fields: [&'a OrderBy; 1],
}

#[derive(Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    data: Vec<AggregateGroup>,
}

#[derive(Deserialize)]
struct AggregateGroup {
    #[serde(default)]
    metrics: Vec<AggregateMetric>,
}

#[derive(Deserialize)]
struct AggregateMetric {
    name: String,
    value: f64,
}

/// Object queries over HTTP, authenticated with the service credential.
pub struct FoundryOntologyClient {
    http: reqwest::Client,
    objects_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl FoundryOntologyClient {
    /// # Errors
    ///
    /// Returns [`OntologyError::Config`] for an unusable configuration.
    pub fn new(
        cfg: &OntologyConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, OntologyError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| OntologyError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            objects_url: cfg.objects_url()?,
            credentials,
        })
    }

    fn endpoint(&self, object_type: &str, action: &str) -> Result<Url, OntologyError> {
        self.objects_url
            .join(&format!("{object_type}/{action}"))
            .map_err(|e| OntologyError::Config(format!("invalid object type '{object_type}': {e}")))
    }

    async fn post<B, R>(&self, url: Url, body: &B) -> Result<R, OntologyError>
    where
        B: Serialize + Sync + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let token = self.credentials.bearer_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| OntologyError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.credentials.invalidate();
            }
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %message, "ontology request failed");
            return Err(OntologyError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| OntologyError::Decode(e.to_string()))
    }
}

#[async_trait]
impl OntologyClient for FoundryOntologyClient {
    #[tracing::instrument(skip_all, fields(object_type = %request.object_type, page_size = request.page_size))]
    async fn search(&self, request: SearchRequest) -> Result<ObjectPage, OntologyError> {
        let url = self.endpoint(&request.object_type, "search")?;
        let body = SearchBody {
            filter: request.filter.as_ref(),
            order_by: request
                .order_by
                .as_ref()
                .map(|order| OrderByBody { fields: [order] }),
            page_size: request.page_size,
            page_token: request.page_token.as_deref(),
        };
        let page: ObjectPage = self.post(url, &body).await?;
        tracing::debug!(rows = page.data.len(), more = page.next_page_token.is_some(), "search done");
        Ok(page)
    }

    #[tracing::instrument(skip(self, filter))]
    async fn count(
        &self,
        object_type: &str,
        filter: Option<&Predicate>,
    ) -> Result<u64, OntologyError> {
        let url = self.endpoint(object_type, "aggregate")?;
        let mut body = json!({
            "aggregation": [{"type": "count", "name": "count"}],
            "groupBy": [],
        });
        if let Some(filter) = filter {
            body["where"] = serde_json::to_value(filter)
                .map_err(|e| OntologyError::Decode(e.to_string()))?;
        }

        let response: AggregateResponse = self.post(url, &body).await?;
        let value = response
            .data
            .iter()
            .flat_map(|group| group.metrics.iter())
            .find(|metric| metric.name == "count")
            .map_or(0.0, |metric| metric.value);

        if !value.is_finite() || value < 0.0 {
            return Err(OntologyError::Decode(format!("invalid count {value}")));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = value as u64;
        Ok(count)
    }
}
