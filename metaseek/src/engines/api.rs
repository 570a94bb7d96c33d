//! Structured search API adapter.
//!
//! Talks to a Brave-style JSON search API. The payload is treated as an
//! untrusted, partially optional structure: every field decodes into an
//! `Option`, and alternate field names are resolved by a small ordered
//! first-present-wins lookup rather than ad hoc chained fallbacks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::Engine;
use crate::config::EnginesConfig;
use crate::fetch::Fetcher;
use crate::records::{EngineResponse, SearchHit};

/// Brave-style structured search API engine.
pub struct ApiEngine {
    config: EnginesConfig,
    fetcher: Arc<Fetcher>,
}

#[derive(Debug, Deserialize)]
struct ApiPayload {
    web: Option<ApiWebSection>,
    results: Option<Vec<ApiResult>>,
}

#[derive(Debug, Deserialize)]
struct ApiWebSection {
    results: Option<Vec<ApiResult>>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    title: Option<String>,
    url: Option<String>,
    link: Option<String>,
    description: Option<String>,
    snippet: Option<String>,
}

impl ApiEngine {
    /// Creates the adapter. Missing credentials leave it constructible but
    /// unavailable.
    #[must_use]
    pub fn new(config: EnginesConfig, fetcher: Arc<Fetcher>) -> Self {
        Self { config, fetcher }
    }

    fn hits_from_payload(&self, payload: &ApiPayload) -> Vec<SearchHit> {
        let results = payload
            .web
            .as_ref()
            .and_then(|w| w.results.as_ref())
            .or(payload.results.as_ref());
        let Some(results) = results else {
            return Vec::new();
        };

        results
            .iter()
            .filter_map(|r| {
                // Alternate field names across API versions, first present wins.
                let url = [&r.url, &r.link].into_iter().find_map(|f| f.as_deref())?;
                if !self.config.domain_allowed(url) {
                    return None;
                }
                let title = r.title.as_deref().unwrap_or("");
                let snippet = [&r.description, &r.snippet]
                    .into_iter()
                    .find_map(|f| f.as_deref())
                    .unwrap_or("");
                SearchHit::new(title, url, snippet)
            })
            .take(self.config.max_results)
            .collect()
    }
}

#[async_trait]
impl Engine for ApiEngine {
    fn name(&self) -> &str {
        "brave"
    }

    fn prefix(&self) -> &str {
        "BRAVE"
    }

    fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn search(&self, query: &str) -> EngineResponse {
        let Some(api_key) = self.config.api_key.clone().filter(|k| !k.is_empty()) else {
            return EngineResponse::unavailable("api key unset");
        };

        debug!(query, endpoint = %self.config.api_endpoint, "structured api search");

        let count = self.config.max_results.to_string();
        let result = self
            .fetcher
            .get_full(
                &self.config.api_endpoint,
                &[("q", query), ("count", &count)],
                &[("X-Subscription-Token", api_key.as_str()), ("Accept", "application/json")],
            )
            .await;

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => return EngineResponse::fault(e.to_string()),
        };
        if !fetched.is_success() {
            let detail = fetched.text.chars().take(200).collect::<String>();
            return EngineResponse::failure(fetched.status_code, detail);
        }

        match serde_json::from_str::<ApiPayload>(&fetched.text) {
            Ok(payload) => EngineResponse::success(self.hits_from_payload(&payload)),
            Err(e) => EngineResponse::failure(fetched.status_code, format!("payload decode: {e}")),
        }
    }
}
