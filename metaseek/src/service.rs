//! The top-level facade tying the cascade and the aggregators together.

use crate::aggregate::{ImageAggregator, VideoAggregator};
use crate::cascade::Cascade;
use crate::config::MetaseekConfig;
use crate::records::{ImageRecord, SearchOutcome, VideoRecord};

/// One handle over the whole system: web search with fallback, image
/// aggregation, and in-page video discovery.
///
/// Construction is cheap; HTTP clients are created per component and the
/// browser session, when enabled, launches lazily on first use.
pub struct Metaseek {
    cascade: Cascade,
    images: ImageAggregator,
    videos: VideoAggregator,
}

impl Metaseek {
    /// Builds the facade from configuration.
    #[must_use]
    pub fn new(config: MetaseekConfig) -> Self {
        Self {
            cascade: Cascade::from_config(&config),
            images: ImageAggregator::new(config.clone()),
            videos: VideoAggregator::new(config),
        }
    }

    /// Builds the facade with default configuration, reading engine
    /// credentials from the environment.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(MetaseekConfig::from_env())
    }

    /// Runs a web search through the fallback cascade.
    ///
    /// Always returns an outcome; exhaustion is reported in the attempt log
    /// rather than as an error.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        self.cascade.execute(query).await
    }

    /// Aggregates images for a query, or extracts them from a single page
    /// when `input` is a URL.
    pub async fn search_images(&self, input: &str) -> Vec<ImageRecord> {
        self.images.aggregate(input).await
    }

    /// Discovers video sources on one page.
    pub async fn discover_videos(&self, page_url: &str) -> Vec<VideoRecord> {
        self.videos.aggregate(page_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnginesConfig;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_no_engines_yields_unavailable_outcome() {
        let service = Metaseek::new(MetaseekConfig {
            engines: EnginesConfig::new().with_order(Vec::<String>::new()),
            ..MetaseekConfig::default()
        });
        let outcome = service.search("anything").await;
        assert!(outcome.results.is_empty());
        assert_eq!(
            outcome.log.error.map(|e| e.code).as_deref(),
            Some("CASCADE_UNAVAILABLE")
        );
    }
}
