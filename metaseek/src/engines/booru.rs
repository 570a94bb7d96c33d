//! Booru-style image API adapter.
//!
//! Queries a tag-indexed image board API (safebooru dapi shape) and decodes
//! its loosely typed JSON posts into image records. Used as the specialized
//! first tier of the image aggregator, not as a cascade level.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::config::EnginesConfig;
use crate::fetch::Fetcher;
use crate::records::ImageRecord;

/// Booru-style image search adapter.
pub struct BooruEngine {
    config: EnginesConfig,
    fetcher: Arc<Fetcher>,
}

#[derive(Debug, Deserialize)]
struct BooruPost {
    file_url: Option<String>,
    sample_url: Option<String>,
    image: Option<String>,
    directory: Option<String>,
    tags: Option<String>,
    source: Option<String>,
}

impl BooruPost {
    /// Asset address: explicit URLs first, then the image/directory pair
    /// some deployments return instead.
    fn asset_url(&self, endpoint: &str) -> Option<String> {
        if let Some(url) = [&self.file_url, &self.sample_url]
            .into_iter()
            .find_map(|f| f.as_deref().filter(|u| !u.is_empty()))
        {
            return Some(url.to_string());
        }
        let image = self.image.as_deref().filter(|i| !i.is_empty())?;
        let directory = self.directory.as_deref().unwrap_or("");
        let base = url::Url::parse(endpoint).ok()?;
        let host = base.host_str()?;
        Some(format!("{}://{host}/images/{directory}/{image}", base.scheme()))
    }
}

impl BooruEngine {
    /// Creates the adapter.
    #[must_use]
    pub fn new(config: EnginesConfig, fetcher: Arc<Fetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Searches posts by whitespace-separated tags. Failures degrade to an
    /// empty list; the aggregator treats that as one settled empty strategy.
    pub async fn search_images(&self, tags: &str, limit: usize) -> Vec<ImageRecord> {
        let tags = tags.split_whitespace().collect::<Vec<_>>().join(" ");
        let limit_param = limit.to_string();
        debug!(tags, endpoint = %self.config.booru_endpoint, "booru image search");

        let fetched = match self
            .fetcher
            .get_with_query(
                &self.config.booru_endpoint,
                &[
                    ("page", "dapi"),
                    ("s", "post"),
                    ("q", "index"),
                    ("json", "1"),
                    ("limit", &limit_param),
                    ("tags", &tags),
                ],
            )
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                debug!(error = %e, "booru fetch failed");
                return Vec::new();
            }
        };
        if !fetched.is_success() {
            debug!(status = fetched.status_code, "booru non-success status");
            return Vec::new();
        }

        let Ok(posts) = serde_json::from_str::<Vec<BooruPost>>(&fetched.text) else {
            return Vec::new();
        };

        posts
            .iter()
            .filter_map(|post| {
                let url = post.asset_url(&self.config.booru_endpoint)?;
                let alt = post.tags.clone().unwrap_or_default();
                let source = post.source.clone().unwrap_or_default();
                ImageRecord::validated(&url, &alt, &source)
            })
            .take(limit)
            .collect()
    }
}
