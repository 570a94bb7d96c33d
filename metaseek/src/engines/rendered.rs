//! Headless-browser-rendered search adapter.
//!
//! The heaviest cascade level: renders the results page in the shared
//! browser session, then runs the same search extraction pipeline over the
//! rendered markup. Only functional with the `browser` feature; without it
//! the adapter stays constructible and classifies as unavailable.

use async_trait::async_trait;

use super::Engine;
use crate::config::EnginesConfig;
use crate::records::EngineResponse;

/// Headless-render search engine over the shared browser session.
pub struct RenderedEngine {
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    config: EnginesConfig,
}

impl RenderedEngine {
    /// Creates the adapter.
    #[must_use]
    pub fn new(config: EnginesConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Engine for RenderedEngine {
    fn name(&self) -> &str {
        "rendered"
    }

    fn prefix(&self) -> &str {
        "RENDER"
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "browser")
    }

    #[cfg(feature = "browser")]
    async fn search(&self, query: &str) -> EngineResponse {
        use crate::extract::{extract_search_hits, Document};
        use tracing::debug;

        debug!(query, "rendered search");

        let session = match crate::session::acquire().await {
            Ok(session) => session,
            Err(e) => return EngineResponse::fault(e.to_string()),
        };

        let target = format!(
            "{}?q={}",
            self.config.scrape_endpoint,
            urlencode(query)
        );
        let html = match session.render(&target).await {
            Ok(html) => html,
            Err(e) => {
                // A dead session is recreated on the next acquire.
                crate::session::reset().await;
                return EngineResponse::fault(e.to_string());
            }
        };

        let doc = Document::parse(&html, &target);
        let hits = extract_search_hits(&doc)
            .into_iter()
            .filter(|h| self.config.domain_allowed(&h.url))
            .take(self.config.max_results)
            .collect();
        EngineResponse::success(hits)
    }

    #[cfg(not(feature = "browser"))]
    async fn search(&self, _query: &str) -> EngineResponse {
        EngineResponse::unavailable("browser feature disabled")
    }
}

#[cfg(feature = "browser")]
fn urlencode(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.as_bytes()).collect()
}
