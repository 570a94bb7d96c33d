//! Generic web-search scrape adapter.
//!
//! Fetches an HTML results endpoint and runs the search extraction
//! pipeline over it. Carries no credentials, so it is always available;
//! its failure modes are bot walls and markup drift.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::Engine;
use crate::config::EnginesConfig;
use crate::extract::{extract_search_hits, Document};
use crate::fetch::Fetcher;
use crate::records::EngineResponse;

/// HTML results-page scrape engine.
pub struct ScrapeEngine {
    config: EnginesConfig,
    fetcher: Arc<Fetcher>,
}

impl ScrapeEngine {
    /// Creates the adapter.
    #[must_use]
    pub fn new(config: EnginesConfig, fetcher: Arc<Fetcher>) -> Self {
        Self { config, fetcher }
    }
}

#[async_trait]
impl Engine for ScrapeEngine {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    fn prefix(&self) -> &str {
        "DDG"
    }

    async fn search(&self, query: &str) -> EngineResponse {
        debug!(query, endpoint = %self.config.scrape_endpoint, "html scrape search");

        let fetched = match self
            .fetcher
            .get_with_query(&self.config.scrape_endpoint, &[("q", query)])
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => return EngineResponse::fault(e.to_string()),
        };

        if !fetched.is_success() {
            let detail = fetched.text.chars().take(200).collect::<String>();
            return EngineResponse::failure(fetched.status_code, detail);
        }

        let doc = Document::parse(&fetched.text, &fetched.final_url);
        let hits = extract_search_hits(&doc)
            .into_iter()
            .filter(|h| self.config.domain_allowed(&h.url))
            .take(self.config.max_results)
            .collect();
        EngineResponse::success(hits)
    }
}
