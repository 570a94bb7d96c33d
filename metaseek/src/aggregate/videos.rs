//! In-page video discovery aggregation.
//!
//! Fetches the page once, then runs every extraction strategy tier
//! concurrently over the raw markup. With the `browser` feature enabled,
//! network-level media responses intercepted by the rendering session join
//! as one more concurrent strategy.

use tracing::debug;

use super::{merge_tiers, run_settled};
use crate::config::MetaseekConfig;
use crate::extract::{video_strategies, Document};
use crate::fetch::Fetcher;
use crate::records::{sort_video_candidates, VideoRecord};

/// Concurrent video-discovery aggregator.
pub struct VideoAggregator {
    config: MetaseekConfig,
    fetcher: Fetcher,
}

impl VideoAggregator {
    /// Builds the aggregator from configuration.
    #[must_use]
    pub fn new(config: MetaseekConfig) -> Self {
        let fetcher = Fetcher::new(config.fetch.clone());
        Self { config, fetcher }
    }

    /// Discovers video sources on one page.
    ///
    /// The output is deduplicated, capped, and stably ordered by
    /// container-format preference with quality as the tie-break.
    pub async fn aggregate(&self, page_url: &str) -> Vec<VideoRecord> {
        let caps = &self.config.videos;

        let raw = match self.fetcher.get(page_url).await {
            Ok(fetched) if fetched.is_success() => fetched.text,
            Ok(fetched) => {
                debug!(page_url, status = fetched.status_code, "video page fetch non-success");
                String::new()
            }
            Err(e) => {
                debug!(page_url, error = %e, "video page fetch failed");
                String::new()
            }
        };

        let mut strategies: Vec<(&'static str, futures::future::BoxFuture<'static, Vec<VideoRecord>>)> =
            Vec::new();
        for kind in video_strategies() {
            let kind = *kind;
            let raw = raw.clone();
            let page_url = page_url.to_string();
            let cap = caps.per_strategy_cap;
            strategies.push((
                strategy_name(kind),
                Box::pin(async move {
                    // Html is not Send, so each strategy parses its own DOM.
                    let doc = Document::parse(&raw, &page_url);
                    kind.run(&doc, cap)
                }),
            ));
        }

        #[cfg(feature = "browser")]
        {
            let page_url = page_url.to_string();
            let cap = caps.per_strategy_cap;
            strategies.push((
                "network-intercept",
                Box::pin(async move { intercepted_media(&page_url, cap).await }),
            ));
        }

        let settled = run_settled(strategies, caps.strategy_timeout()).await;
        let mut merged = merge_tiers(settled, |r: &VideoRecord| r.url.clone(), caps.global_cap);
        sort_video_candidates(&mut merged);
        merged
    }
}

fn strategy_name(kind: crate::extract::VideoStrategyKind) -> &'static str {
    use crate::extract::VideoStrategyKind as K;
    match kind {
        K::NativeElements => "native-elements",
        K::PageMeta => "page-meta",
        K::LinkedData => "linked-data",
        K::DataAttrs => "data-attrs",
        K::ScriptBattery => "script-battery",
        K::EmbedIframes => "embed-iframes",
    }
}

/// Renders the page in the shared session and collects media response URLs
/// seen on the wire.
#[cfg(feature = "browser")]
async fn intercepted_media(page_url: &str, cap: usize) -> Vec<VideoRecord> {
    let Ok(session) = crate::session::acquire().await else {
        return Vec::new();
    };
    match session.capture_media(page_url).await {
        Ok(urls) => urls
            .into_iter()
            .take(cap)
            .map(VideoRecord::new)
            .collect(),
        Err(_) => {
            crate::session::reset().await;
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AggregatorConfig, FetchConfig};
    use pretty_assertions::assert_eq;

    fn aggregator() -> VideoAggregator {
        VideoAggregator::new(MetaseekConfig {
            fetch: FetchConfig::new().with_timeout_ms(200),
            videos: AggregatorConfig::new().with_strategy_timeout_ms(500),
            ..MetaseekConfig::default()
        })
    }

    #[tokio::test]
    async fn test_unreachable_page_settles_empty() {
        // A scheme-valid but unresolvable host: every strategy settles with
        // an empty set and the aggregator returns an empty list.
        let videos = aggregator().aggregate("http://nonexistent.invalid/watch").await;
        assert_eq!(videos, Vec::new());
    }
}
