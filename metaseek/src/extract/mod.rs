//! Extraction pipelines for search results, images, and video sources.
//!
//! Each pipeline is an ordered list of strategies sharing the signature
//! `(&Document) -> Vec<R>`, iterated by one of two tiny drivers:
//!
//! * [`first_non_empty`]: try strategies in order, stop at the first that
//!   yields any record. Used for search results, where strategies compete
//!   over the same markup.
//! * [`accumulate_capped`]: run every strategy and append, deduplicating,
//!   up to a cap. Used for images and videos, where strategies surface
//!   complementary candidates on the same page.
//!
//! Upstream markup is unstable; a strategy that matched last month may yield
//! nothing today. Tiered fallback inside extraction mirrors the tiered
//! fallback across engines for exactly that reason.

mod image;
mod search;
mod video;

pub use image::extract_images;
pub use search::extract_search_hits;
pub use video::{extract_videos, video_strategies, VideoStrategyKind};

use scraper::Html;
use url::Url;

use crate::canonical;

/// One parsed document plus the raw markup and resolution base.
///
/// Strategies that walk the DOM use [`Document::dom`]; the inline-script
/// batteries run over [`Document::raw`] directly.
pub struct Document {
    raw: String,
    dom: Html,
    base: Option<Url>,
}

impl Document {
    /// Parses raw markup, remembering the page URL for relative-link
    /// resolution.
    #[must_use]
    pub fn parse(raw: &str, page_url: &str) -> Self {
        Self {
            raw: raw.to_string(),
            dom: Html::parse_document(raw),
            base: Url::parse(page_url).ok(),
        }
    }

    /// The raw markup.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed DOM.
    #[must_use]
    pub fn dom(&self) -> &Html {
        &self.dom
    }

    /// The page address, when it parsed.
    #[must_use]
    pub fn page_url(&self) -> &str {
        self.base.as_ref().map_or("", Url::as_str)
    }

    /// Resolves a possibly relative address against the page URL. Returns
    /// `None` for empty input or unresolvable references.
    #[must_use]
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        if href.starts_with("http://") || href.starts_with("https://") {
            return Some(href.to_string());
        }
        self.base.as_ref()?.join(href).ok().map(Into::into)
    }
}

/// Runs strategies in order, returning the first non-empty yield.
pub fn first_non_empty<R>(doc: &Document, strategies: &[&dyn Fn(&Document) -> Vec<R>]) -> Vec<R> {
    for strategy in strategies {
        let records = strategy(doc);
        if !records.is_empty() {
            return records;
        }
    }
    Vec::new()
}

/// Runs every strategy, appending records that are not duplicates of what is
/// already collected, up to `cap`.
pub fn accumulate_capped<R, K>(
    doc: &Document,
    strategies: &[&dyn Fn(&Document) -> Vec<R>],
    cap: usize,
    key: K,
) -> Vec<R>
where
    K: Fn(&R) -> String,
{
    let mut collected: Vec<R> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for strategy in strategies {
        if collected.len() >= cap {
            break;
        }
        for record in strategy(doc) {
            if collected.len() >= cap {
                break;
            }
            let url = canonical::unescape_url(&key(&record));
            if canonical::is_duplicate(&url, &seen) {
                continue;
            }
            seen.push(url);
            collected.push(record);
        }
    }
    collected
}
