//! Image search aggregation.
//!
//! Tiers, most trustworthy first:
//! 1. booru-style structured APIs, launched only for tag-like queries and
//!    allowed to short-circuit the rest when they alone fill the budget;
//! 2. an HTML image-search surface;
//! 3. a generic page-scrape fallback over the top web results.
//!
//! Given a page URL instead of a query, the aggregator switches to
//! single-page extraction mode.

use std::sync::Arc;

use tracing::{debug, info};

use super::{merge_tiers, run_settled};
use crate::config::MetaseekConfig;
use crate::engines::BooruEngine;
use crate::extract::{extract_images, extract_search_hits, Document};
use crate::fetch::Fetcher;
use crate::records::ImageRecord;

/// Concurrent image-search aggregator.
pub struct ImageAggregator {
    config: MetaseekConfig,
    fetcher: Arc<Fetcher>,
    booru: Arc<BooruEngine>,
}

/// Whether a query looks like a booru tag list: few short tokens, each
/// `[a-z0-9_]`-only.
fn is_tag_query(query: &str) -> bool {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    !tokens.is_empty()
        && tokens.len() <= 3
        && tokens.iter().all(|t| {
            t.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        })
}

impl ImageAggregator {
    /// Builds the aggregator from configuration.
    #[must_use]
    pub fn new(config: MetaseekConfig) -> Self {
        let fetcher = Arc::new(Fetcher::new(config.fetch.clone()));
        let booru = Arc::new(BooruEngine::new(config.engines.clone(), Arc::clone(&fetcher)));
        Self {
            config,
            fetcher,
            booru,
        }
    }

    /// Aggregates images for a query, or for a single page when `input` is
    /// a URL.
    pub async fn aggregate(&self, input: &str) -> Vec<ImageRecord> {
        let input = input.trim();
        if input.starts_with("http://") || input.starts_with("https://") {
            return self.extract_from_page(input.to_string()).await;
        }
        self.aggregate_query(input).await
    }

    async fn aggregate_query(&self, query: &str) -> Vec<ImageRecord> {
        let caps = &self.config.images;

        // Specialized tier first: when the structured APIs alone fill the
        // budget, the general-purpose strategies are never launched.
        let booru_records = if is_tag_query(query) {
            self.booru.search_images(query, caps.per_strategy_cap).await
        } else {
            Vec::new()
        };
        if booru_records.len() >= caps.short_circuit_at {
            info!(query, count = booru_records.len(), "booru tier short-circuited image fan-out");
            return merge_tiers(vec![booru_records], |r: &ImageRecord| r.url.clone(), caps.global_cap);
        }

        let surface = {
            let this = self.clone_shallow();
            let query = query.to_string();
            async move { this.image_surface(&query).await }
        };
        let fallback = {
            let this = self.clone_shallow();
            let query = query.to_string();
            async move { this.page_fallback(&query).await }
        };

        let strategies: Vec<(&'static str, futures::future::BoxFuture<'static, Vec<ImageRecord>>)> = vec![
            ("image-surface", Box::pin(surface)),
            ("page-fallback", Box::pin(fallback)),
        ];
        let mut settled = run_settled(strategies, caps.strategy_timeout()).await;

        let mut tiers = vec![booru_records];
        tiers.append(&mut settled);
        merge_tiers(tiers, |r: &ImageRecord| r.url.clone(), caps.global_cap)
    }

    /// A cheap handle for moving into spawned strategies.
    fn clone_shallow(&self) -> StrategyHandle {
        StrategyHandle {
            config: self.config.clone(),
            fetcher: Arc::clone(&self.fetcher),
        }
    }

    async fn extract_from_page(&self, page_url: String) -> Vec<ImageRecord> {
        let handle = self.clone_shallow();
        let cap = self.config.images.global_cap;
        let timeout = self.config.images.strategy_timeout();
        let strategies: Vec<(&'static str, futures::future::BoxFuture<'static, Vec<ImageRecord>>)> = vec![(
            "single-page",
            Box::pin(async move { handle.page_images(&page_url, cap).await }),
        )];
        let settled = run_settled(strategies, timeout).await;
        settled.into_iter().next().unwrap_or_default()
    }
}

/// The owned subset of aggregator state that strategies take with them.
struct StrategyHandle {
    config: MetaseekConfig,
    fetcher: Arc<Fetcher>,
}

impl StrategyHandle {
    async fn page_images(&self, page_url: &str, cap: usize) -> Vec<ImageRecord> {
        let Ok(fetched) = self.fetcher.get(page_url).await else {
            return Vec::new();
        };
        if !fetched.is_success() {
            return Vec::new();
        }
        let doc = Document::parse(&fetched.text, &fetched.final_url);
        extract_images(&doc, cap)
    }

    /// Tier 2: the HTML image-search surface.
    async fn image_surface(&self, query: &str) -> Vec<ImageRecord> {
        debug!(query, "image surface strategy");
        let Ok(fetched) = self
            .fetcher
            .get_with_query(&self.config.engines.image_scrape_endpoint, &[("q", query)])
            .await
        else {
            return Vec::new();
        };
        if !fetched.is_success() {
            return Vec::new();
        }
        let doc = Document::parse(&fetched.text, &fetched.final_url);
        extract_images(&doc, self.config.images.per_strategy_cap)
    }

    /// Tier 3: images scraped from the top web results for the query.
    async fn page_fallback(&self, query: &str) -> Vec<ImageRecord> {
        debug!(query, "page fallback strategy");
        let Ok(results_page) = self
            .fetcher
            .get_with_query(&self.config.engines.scrape_endpoint, &[("q", query)])
            .await
        else {
            return Vec::new();
        };
        if !results_page.is_success() {
            return Vec::new();
        }

        let first_hit = {
            let doc = Document::parse(&results_page.text, &results_page.final_url);
            extract_search_hits(&doc).into_iter().next()
        };
        let Some(hit) = first_hit else {
            return Vec::new();
        };
        self.page_images(&hit.url, self.config.images.per_strategy_cap).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AggregatorConfig, EnginesConfig, FetchConfig};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_all_strategies_failing_settles_empty() {
        // Every tier points at an unresolvable host: booru, the image
        // surface, and the page fallback all settle with nothing and the
        // aggregator returns an empty list instead of an error.
        let aggregator = ImageAggregator::new(MetaseekConfig {
            fetch: FetchConfig::new().with_timeout_ms(200),
            images: AggregatorConfig::new().with_strategy_timeout_ms(500),
            engines: EnginesConfig {
                booru_endpoint: "http://nonexistent.invalid/index.php".to_string(),
                image_scrape_endpoint: "http://nonexistent.invalid/images".to_string(),
                scrape_endpoint: "http://nonexistent.invalid/html".to_string(),
                ..EnginesConfig::default()
            },
            ..MetaseekConfig::default()
        });
        let images = aggregator.aggregate("golden_retriever outdoors").await;
        assert_eq!(images, Vec::new());
    }

    #[test]
    fn test_tag_query_classification() {
        assert!(is_tag_query("landscape"));
        assert!(is_tag_query("golden_retriever outdoors"));
        assert!(!is_tag_query("What does a golden retriever look like?"));
        assert!(!is_tag_query("Mixed Case"));
        assert!(!is_tag_query(""));
        assert!(!is_tag_query("one two three four"));
    }
}
