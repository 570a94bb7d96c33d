//! Record types produced by engines, extractors, and the cascade.
//!
//! All records are created fresh per request and live only for the duration
//! of one orchestration call. Nothing here is persisted.

use serde::{Deserialize, Serialize};

use crate::canonical;

/// One search result from any engine adapter.
///
/// Invariant: never constructed with a relative or empty `url`, and `title`
/// is non-empty after entity decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title, entity-decoded.
    pub title: String,
    /// Absolute, scheme-qualified address.
    pub url: String,
    /// Result snippet; may be empty.
    pub snippet: String,
}

impl SearchHit {
    /// Builds a hit, enforcing the URL and title invariants.
    ///
    /// Returns `None` for relative or non-HTTP URLs and for titles that are
    /// empty after decoding.
    #[must_use]
    pub fn new(title: &str, url: &str, snippet: &str) -> Option<Self> {
        let url = url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return None;
        }
        let title = canonical::clean_title(title, url);
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title,
            url: url.to_string(),
            snippet: canonical::decode_entities(&canonical::strip_tags(snippet)).trim().to_string(),
        })
    }
}

/// Hosts that serve thumbnail proxies rather than the asset itself.
const THUMBNAIL_PROXY_HOSTS: &[&str] = &["encrypted-tbn", "gstatic.com", "thumbs.example-cdn"];

/// Filename/path tokens that mark non-content images.
const PLACEHOLDER_TOKENS: &[&str] = &["1x1", "pixel", "blank", "placeholder", "spacer", "transparent"];

/// An image discovered on a page or returned by an image API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Address of the image asset.
    pub url: String,
    /// Alt text, possibly empty.
    #[serde(default)]
    pub alt: String,
    /// Page the image was found on or embedded by; empty when unknown.
    #[serde(default)]
    pub source: String,
}

impl ImageRecord {
    /// Creates an image record without validity checks. Use
    /// [`ImageRecord::validated`] at extraction boundaries.
    #[must_use]
    pub fn new(url: impl Into<String>, alt: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt: alt.into(),
            source: source.into(),
        }
    }

    /// Creates an image record only when the URL passes the content-image
    /// validity filter.
    #[must_use]
    pub fn validated(url: &str, alt: &str, source: &str) -> Option<Self> {
        if is_probable_content_image(url) {
            Some(Self::new(url, alt, source))
        } else {
            None
        }
    }
}

/// Validity filter for image URLs.
///
/// Excludes tracking pixels, placeholders, inline data URIs, vector icons,
/// and known CDN thumbnail-proxy hosts.
#[must_use]
pub fn is_probable_content_image(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() || !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with("data:") || lower.contains(".svg") {
        return false;
    }
    if PLACEHOLDER_TOKENS.iter().any(|t| lower.contains(t)) {
        return false;
    }
    if THUMBNAIL_PROXY_HOSTS.iter().any(|h| lower.contains(h)) {
        return false;
    }
    true
}

/// Container-format preference used to order video candidates: progressive
/// files first, adaptive-streaming manifests next, unknown last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContainerClass {
    /// A directly playable file (mp4, webm, mov, ogg).
    Progressive,
    /// An adaptive-streaming manifest (m3u8, mpd).
    Adaptive,
    /// Anything else, including embed pages.
    Unknown,
}

/// A video source discovered on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Address of the video source.
    pub url: String,
    /// MIME-like tag inferred from extension or explicit metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Resolution token such as `1080p`, when discoverable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Poster image address, when discoverable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

impl VideoRecord {
    /// Creates a record, inferring `kind` from the URL extension when no
    /// explicit tag is supplied.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let kind = infer_video_kind(&url);
        Self {
            url,
            kind,
            quality: None,
            poster: None,
        }
    }

    /// Sets an explicit MIME-like tag.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the quality token.
    #[must_use]
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// Sets the poster image.
    #[must_use]
    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    /// Container-format preference class for ordering.
    #[must_use]
    pub fn container_class(&self) -> ContainerClass {
        let lower = self.url.to_lowercase();
        let kind = self.kind.as_deref().unwrap_or("");
        if kind.contains("mpegurl") || kind.contains("dash") || lower.contains(".m3u8") || lower.contains(".mpd") {
            ContainerClass::Adaptive
        } else if kind.starts_with("video/")
            || [".mp4", ".webm", ".mov", ".ogg", ".ogv"].iter().any(|ext| lower.contains(ext))
        {
            ContainerClass::Progressive
        } else {
            ContainerClass::Unknown
        }
    }

    /// Numeric resolution parsed from the quality token, 0 when absent.
    #[must_use]
    pub fn quality_value(&self) -> u32 {
        self.quality
            .as_deref()
            .and_then(|q| q.trim_end_matches('p').parse::<u32>().ok())
            .unwrap_or(0)
    }
}

fn infer_video_kind(url: &str) -> Option<String> {
    let lower = url.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or(&lower);
    for (ext, kind) in [
        (".mp4", "video/mp4"),
        (".webm", "video/webm"),
        (".mov", "video/quicktime"),
        (".ogv", "video/ogg"),
        (".ogg", "video/ogg"),
        (".m3u8", "application/x-mpegURL"),
        (".mpd", "application/dash+xml"),
    ] {
        if path.ends_with(ext) {
            return Some(kind.to_string());
        }
    }
    None
}

/// Stable sort by container-format preference, quality descending as the
/// tie-break.
pub fn sort_video_candidates(records: &mut [VideoRecord]) {
    records.sort_by(|a, b| {
        a.container_class()
            .cmp(&b.container_class())
            .then_with(|| b.quality_value().cmp(&a.quality_value()))
    });
}

/// The uniform response of one engine adapter invocation.
///
/// `status` is synthetic: 0 for a network-layer failure, the HTTP code where
/// one was observed, 408 for a timed-out attempt. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResponse {
    /// Extracted hits; empty on failure.
    pub results: Vec<SearchHit>,
    /// Synthetic status code.
    pub status: u16,
    /// Failure detail, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EngineResponse {
    /// A successful response carrying extracted hits.
    #[must_use]
    pub fn success(results: Vec<SearchHit>) -> Self {
        Self {
            results,
            status: 200,
            error: None,
        }
    }

    /// A failed response with an observed HTTP status.
    #[must_use]
    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            status,
            error: Some(error.into()),
        }
    }

    /// A network-layer fault (status 0).
    #[must_use]
    pub fn fault(error: impl Into<String>) -> Self {
        Self::failure(0, error)
    }

    /// A synthetic timeout (status 408).
    #[must_use]
    pub fn timeout(attempt_timeout_ms: u64) -> Self {
        Self::failure(408, format!("attempt timed out after {attempt_timeout_ms}ms"))
    }

    /// An adapter that is not configured or reachable at all.
    #[must_use]
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            status: 0,
            error: Some(format!("not configured: {}", detail.into())),
        }
    }

    /// Whether the response carries at least one hit.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.results.is_empty()
    }
}

/// One entry of the cascade's audit trail. Immutable, appended once per
/// attempt, in call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Engine adapter name.
    pub engine: String,
    /// Whether this attempt produced at least one hit.
    pub success: bool,
    /// Synthetic status of the response.
    pub status: u16,
    /// Wall-clock duration of the attempt.
    pub response_time_ms: u64,
    /// Retry ordinal within the level (0 for the first attempt).
    pub retry_count: usize,
    /// Classified error code, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Terminal failure detail on cascade exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeFailure {
    /// Last classified canonical code, e.g. `DDG_TIMEOUT`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Engine that produced the last classified failure.
    pub engine: String,
    /// Cascade level (1-based) of that engine.
    pub level: usize,
}

/// The full audit trail of one cascade execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CascadeLog {
    /// RFC 3339 timestamp of when the cascade started.
    pub started_at: String,
    /// Engine that resolved the query, absent on exhaustion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    /// Total wall-clock time of the cascade.
    pub total_time_ms: u64,
    /// One entry per attempt, success or not, in call order.
    pub attempts: Vec<Attempt>,
    /// Terminal failure detail, present only on exhaustion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CascadeFailure>,
}

/// Result of one cascade execution: hits plus the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Hits from the first engine that produced any.
    pub results: Vec<SearchHit>,
    /// Per-attempt audit trail.
    pub log: CascadeLog,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_search_hit_rejects_relative_url() {
        assert!(SearchHit::new("Title", "/relative/path", "").is_none());
        assert!(SearchHit::new("Title", "", "").is_none());
    }

    #[test]
    fn test_search_hit_rejects_empty_title() {
        assert!(SearchHit::new("  <b></b> ", "https://example.com", "").is_none());
    }

    #[test]
    fn test_search_hit_decodes_fields() {
        let hit = SearchHit::new("Tom &amp; Jerry", "https://example.com", "<b>snippet</b>")
            .expect("valid hit");
        assert_eq!(hit.title, "Tom & Jerry");
        assert_eq!(hit.snippet, "snippet");
    }

    #[test]
    fn test_content_image_filter() {
        assert!(is_probable_content_image("https://cdn.example.com/photo.jpg"));
        assert!(!is_probable_content_image("data:image/gif;base64,R0lGOD"));
        assert!(!is_probable_content_image("https://cdn.example.com/icon.svg"));
        assert!(!is_probable_content_image("https://t.example.com/1x1.gif"));
        assert!(!is_probable_content_image("https://encrypted-tbn0.gstatic.com/images?q=tbn:x"));
        assert!(!is_probable_content_image("//protocol-relative.example.com/a.jpg"));
    }

    #[test]
    fn test_video_kind_inference() {
        assert_eq!(VideoRecord::new("https://x.example/clip.mp4").kind.as_deref(), Some("video/mp4"));
        assert_eq!(
            VideoRecord::new("https://x.example/master.m3u8").kind.as_deref(),
            Some("application/x-mpegURL")
        );
        assert_eq!(VideoRecord::new("https://x.example/embed/42").kind, None);
    }

    #[test]
    fn test_video_sort_order() {
        let mut records = vec![
            VideoRecord::new("https://x.example/embed/42"),
            VideoRecord::new("https://x.example/master.m3u8"),
            VideoRecord::new("https://x.example/clip-720.mp4").with_quality("720p"),
            VideoRecord::new("https://x.example/clip-1080.mp4").with_quality("1080p"),
        ];
        sort_video_candidates(&mut records);
        let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://x.example/clip-1080.mp4",
                "https://x.example/clip-720.mp4",
                "https://x.example/master.m3u8",
                "https://x.example/embed/42",
            ]
        );
    }

    #[test]
    fn test_engine_response_constructors() {
        assert_eq!(EngineResponse::timeout(5000).status, 408);
        assert_eq!(EngineResponse::fault("connection refused").status, 0);
        let unavailable = EngineResponse::unavailable("api key unset");
        assert_eq!(unavailable.status, 0);
        assert!(unavailable.error.as_deref().is_some_and(|e| e.contains("not configured")));
    }
}
