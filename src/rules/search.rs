//! Keyword search backends for rule retrieval.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchHit {
    /// Backend relevance score; only comparable within one result list.
    pub score: f32,

    /// Selected fields of the matched document.
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SearchHit {
    /// String value of `name`, if selected and a string.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// A ranked text search over the rule corpus.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Up to `top_k` documents for `query`, best first. May be empty.
    async fn search(&self, query: &str, top_k: usize, fields: &[&str])
    -> ProviderResult<Vec<SearchHit>>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    top: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    select: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Azure AI Search index queried through the REST `docs/search` API.
#[derive(Debug, Clone)]
pub struct AzureSearchClient {
    client: Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl AzureSearchClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        index: &str,
        api_version: &str,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> ProviderResult<Self> {
        if endpoint.is_empty() || api_key.is_empty() {
            return Err(ProviderError::Config(
                "Azure AI Search needs an endpoint and an API key".to_string(),
            ));
        }

        if accept_invalid_certs {
            tracing::warn!(target: "search", "TLS certificate verification is disabled for {endpoint}");
        }

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| ProviderError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: search_url(endpoint, index, api_version),
            api_key: api_key.to_string(),
            timeout,
        })
    }
}

fn search_url(endpoint: &str, index: &str, api_version: &str) -> String {
    format!(
        "{}/indexes/{index}/docs/search?api-version={api_version}",
        endpoint.trim_end_matches('/')
    )
}

fn into_hit(mut document: serde_json::Map<String, serde_json::Value>) -> SearchHit {
    let score = document
        .remove("@search.score")
        .and_then(|v| v.as_f64())
        .unwrap_or_default() as f32;
    document.retain(|key, _| !key.starts_with("@search."));
    SearchHit {
        score,
        fields: document,
    }
}

#[async_trait]
impl SearchService for AzureSearchClient {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        fields: &[&str],
    ) -> ProviderResult<Vec<SearchHit>> {
        let request = SearchRequest {
            search: query,
            top: top_k,
            select: (!fields.is_empty()).then(|| fields.join(",")),
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest("search", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                service: "search",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol {
                service: "search",
                reason: e.to_string(),
            })?;

        Ok(parsed.value.into_iter().map(into_hit).collect())
    }
}
