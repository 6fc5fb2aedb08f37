//! HTTP client for a Solr-compatible `select` handler.

use crate::traits::{BackendResult, SearchBackend};
use dsapi_core::{BackendError, Dialect, SearchResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

#[derive(Deserialize)]
struct SelectEnvelope {
    response: SelectResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectResponse {
    num_found: u64,
    #[serde(default)]
    start: u64,
    #[serde(default)]
    docs: Vec<JsonValue>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: String,
}

/// Pooled HTTP connections are owned by the `reqwest::Client`; a dropped
/// request future hands its connection back or closes it.
#[derive(Clone)]
pub struct SolrBackend {
    client: Client,
    base_url: String,
}

impl SolrBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| BackendError::unavailable(format!("http client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn select_url(&self, index: &str) -> String {
        format!("{}/{}/select", self.base_url, index)
    }
}

fn classify(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::timeout(e.to_string())
    } else {
        BackendError::unavailable(e.to_string())
    }
}

#[async_trait::async_trait]
impl SearchBackend for SolrBackend {
    fn name(&self) -> &'static str {
        "solr"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Solr
    }

    async fn search(
        &self,
        index: &str,
        query: &str,
        offset: u64,
        limit: u64,
    ) -> BackendResult<SearchResult> {
        let resp = self
            .client
            .get(self.select_url(index))
            .query(&[("q", query), ("wt", "json")])
            .query(&[("start", offset), ("rows", limit)])
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if status.is_success() {
            let body: SelectEnvelope = resp
                .json()
                .await
                .map_err(|e| BackendError::malformed(format!("undecodable response: {e}")))?;
            return Ok(SearchResult {
                num_found: body.response.num_found,
                start: body.response.start,
                docs: body.response.docs,
            });
        }

        let text = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.msg)
            .unwrap_or(text);
        tracing::debug!(index, %status, detail = %detail, "backend rejected search");
        match status {
            StatusCode::BAD_REQUEST => Err(BackendError::malformed(detail)),
            StatusCode::NOT_FOUND => Err(BackendError::unavailable(format!(
                "index `{index}` not found"
            ))),
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => Err(
                BackendError::unavailable(format!("HTTP {}: {detail}", s.as_u16())),
            ),
            s => Err(BackendError::malformed(format!("HTTP {}: {detail}", s.as_u16()))),
        }
    }
}
