//! Engine adapters: uniform wrappers around external search sources.
//!
//! Each adapter exposes `(query) -> EngineResponse` and never returns an
//! error: every failure mode is encoded in the response's synthetic status
//! and message, so a single misbehaving adapter can never abort the cascade.

mod api;
mod booru;
mod rendered;
mod scrape;

pub use api::ApiEngine;
pub use booru::BooruEngine;
pub use rendered::RenderedEngine;
pub use scrape::ScrapeEngine;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::warn;

use crate::config::{EnginesConfig, FetchConfig};
use crate::fetch::Fetcher;
use crate::records::EngineResponse;

/// A uniform wrapper around one external search source.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Adapter name, used in attempt logs and `resolved_by`.
    fn name(&self) -> &str;

    /// Source prefix for canonical error codes, e.g. `BRAVE`.
    fn prefix(&self) -> &str;

    /// Whether the adapter is configured well enough to try at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Runs one search attempt. Infallible by signature: failures are
    /// encoded in the response.
    async fn search(&self, query: &str) -> EngineResponse;
}

/// Runs one guarded attempt: unavailability check, per-attempt deadline,
/// and panic isolation. Returns the response and the attempt duration.
pub async fn guarded_search(
    engine: &dyn Engine,
    query: &str,
    attempt_timeout: Duration,
) -> (EngineResponse, u64) {
    let started = Instant::now();

    let response = if engine.is_available() {
        let attempt = AssertUnwindSafe(engine.search(query)).catch_unwind();
        match tokio::time::timeout(attempt_timeout, attempt).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                warn!(engine = engine.name(), "engine panicked during search");
                EngineResponse::fault("engine panicked")
            }
            Err(_) => EngineResponse::timeout(u64::try_from(attempt_timeout.as_millis()).unwrap_or(u64::MAX)),
        }
    } else {
        EngineResponse::unavailable(format!("{} adapter", engine.name()))
    };

    let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    (response, elapsed)
}

/// Builds the cascade's engine list from configuration, in the configured
/// priority order. Unknown names are skipped with a warning; engines whose
/// credentials are unset stay in the list and classify as unavailable when
/// attempted.
#[must_use]
pub fn build_engines(engines: &EnginesConfig, fetch: &FetchConfig) -> Vec<Arc<dyn Engine>> {
    let fetcher = Arc::new(Fetcher::new(fetch.clone()));

    let mut built: Vec<Arc<dyn Engine>> = Vec::new();
    for name in &engines.order {
        match name.as_str() {
            "brave" => built.push(Arc::new(ApiEngine::new(engines.clone(), Arc::clone(&fetcher)))),
            "duckduckgo" => {
                built.push(Arc::new(ScrapeEngine::new(engines.clone(), Arc::clone(&fetcher))));
            }
            "rendered" => built.push(Arc::new(RenderedEngine::new(engines.clone()))),
            other => warn!(engine = other, "unknown engine name in cascade order, skipping"),
        }
    }
    built
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::StaticEngine;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_guarded_search_times_out() {
        let engine = StaticEngine::slow("sloth", "SLOTH", Duration::from_secs(5));
        let (response, _) = guarded_search(&engine, "q", Duration::from_millis(20)).await;
        assert_eq!(response.status, 408);
    }

    #[tokio::test]
    async fn test_guarded_search_unavailable() {
        let engine = StaticEngine::unavailable("ghost", "GHOST");
        let (response, _) = guarded_search(&engine, "q", Duration::from_secs(1)).await;
        assert_eq!(response.status, 0);
        assert!(response.error.as_deref().is_some_and(|e| e.contains("not configured")));
    }

    #[tokio::test]
    async fn test_guarded_search_isolates_panics() {
        let engine = StaticEngine::panicking("bomb", "BOMB");
        let (response, _) = guarded_search(&engine, "q", Duration::from_secs(1)).await;
        assert_eq!(response.status, 0);
        assert!(response.error.as_deref().is_some_and(|e| e.contains("panicked")));
    }

    #[test]
    fn test_build_engines_skips_unknown_names() {
        let config = EnginesConfig::new().with_order(["duckduckgo", "nonsense", "brave"]);
        let engines = build_engines(&config, &FetchConfig::default());
        let names: Vec<&str> = engines.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["duckduckgo", "brave"]);
    }
}
