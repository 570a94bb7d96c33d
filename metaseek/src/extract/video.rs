//! In-page video source extraction strategies.
//!
//! Candidates accumulate across strategies; the ad/tracker token filter is
//! applied before insertion, never as a post-hoc pass, and URL escape
//! sequences are decoded before duplicate comparison. The final list is
//! stably ordered by container-format preference with quality as the
//! tie-break.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde_json::Value;

use super::Document;
use crate::canonical;
use crate::records::{sort_video_candidates, VideoRecord};

/// URL tokens that mark ad, tracker, or analytics endpoints. Candidates
/// matching any of these are rejected before insertion.
const AD_TOKENS: &[&str] = &[
    "doubleclick",
    "googlesyndication",
    "adservice",
    "adsystem",
    "adserver",
    "analytics",
    "tracker",
    "popunder",
    "/ads/",
    "pixel.",
];

/// Iframe hosts known to embed playable video.
const EMBED_HOSTS: &[&str] = &[
    "youtube.com/embed",
    "youtube-nocookie.com/embed",
    "player.vimeo.com/video",
    "dailymotion.com/embed",
    "streamable.com/",
];

static QUALITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{3,4})p\b").expect("valid regex"));

static EXT_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s"'<>\\]+?\.(?:mp4|webm|m3u8|mpd|mov|ogv)(?:\?[^\s"'<>\\]*)?"#)
        .expect("valid regex")
});

static PLAYER_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["']?file["']?\s*:\s*["']([^"']+)["']"#).expect("valid regex")
});

static PLAYER_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bsrc\s*[:=]\s*["'](https?:[^"']+)["']"#).expect("valid regex")
});

static BASE64_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"atob\(\s*["']([A-Za-z0-9+/=]{12,})["']\s*\)"#).expect("valid regex")
});

/// The ordered strategy tiers of the video pipeline, most trustworthy first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStrategyKind {
    /// Native `<video>`/`<source>` elements with poster capture.
    NativeElements,
    /// Page-level video metadata tags.
    PageMeta,
    /// Structured linked-data video objects.
    LinkedData,
    /// Data-attribute video references.
    DataAttrs,
    /// Inline-script textual patterns.
    ScriptBattery,
    /// Known video-embedding iframe hosts.
    EmbedIframes,
}

impl VideoStrategyKind {
    /// Runs this strategy against a document, up to `cap` candidates.
    #[must_use]
    pub fn run(self, doc: &Document, cap: usize) -> Vec<VideoRecord> {
        let mut collector = Collector::new(doc, cap);
        match self {
            Self::NativeElements => native_elements(doc, &mut collector),
            Self::PageMeta => page_meta(doc, &mut collector),
            Self::LinkedData => linked_data(doc, &mut collector),
            Self::DataAttrs => data_attrs(doc, &mut collector),
            Self::ScriptBattery => script_battery(doc, &mut collector),
            Self::EmbedIframes => embed_iframes(doc, &mut collector),
        }
        collector.into_records()
    }
}

/// All strategies in fixed priority order.
#[must_use]
pub const fn video_strategies() -> &'static [VideoStrategyKind] {
    &[
        VideoStrategyKind::NativeElements,
        VideoStrategyKind::PageMeta,
        VideoStrategyKind::LinkedData,
        VideoStrategyKind::DataAttrs,
        VideoStrategyKind::ScriptBattery,
        VideoStrategyKind::EmbedIframes,
    ]
}

/// Extracts video candidates from one page: every strategy in order, capped,
/// then the format/quality sort.
#[must_use]
pub fn extract_videos(doc: &Document, cap: usize) -> Vec<VideoRecord> {
    let mut collector = Collector::new(doc, cap);
    native_elements(doc, &mut collector);
    page_meta(doc, &mut collector);
    linked_data(doc, &mut collector);
    data_attrs(doc, &mut collector);
    script_battery(doc, &mut collector);
    embed_iframes(doc, &mut collector);

    let mut records = collector.into_records();
    sort_video_candidates(&mut records);
    records
}

/// Accumulates candidates with the pre-insertion ad filter, escape-decoded
/// dedup, and the cap.
struct Collector<'a> {
    doc: &'a Document,
    cap: usize,
    records: Vec<VideoRecord>,
    seen: Vec<String>,
}

impl<'a> Collector<'a> {
    fn new(doc: &'a Document, cap: usize) -> Self {
        Self {
            doc,
            cap,
            records: Vec::new(),
            seen: Vec::new(),
        }
    }

    fn push(&mut self, href: &str) -> bool {
        self.push_record_from(href).is_some()
    }

    fn push_record_from(&mut self, href: &str) -> Option<usize> {
        if self.records.len() >= self.cap {
            return None;
        }
        // JSON backslash escapes are decoded into the stored address; the
        // percent-level unescape is for duplicate comparison only.
        let candidate = canonical::decode_json_escapes(href.trim());
        let url = self.doc.resolve(&candidate)?;
        let lower = url.to_lowercase();
        if AD_TOKENS.iter().any(|t| lower.contains(t)) {
            return None;
        }
        let dedup_key = canonical::unescape_url(&url);
        if canonical::is_duplicate(&dedup_key, &self.seen) {
            return None;
        }
        self.seen.push(dedup_key);
        let mut record = VideoRecord::new(url);
        if let Some(quality) = quality_token(&record.url) {
            record = record.with_quality(quality);
        }
        self.records.push(record);
        Some(self.records.len() - 1)
    }

    /// Back-fills a poster onto the most recently added poster-less record.
    fn backfill_poster(&mut self, poster: &str) {
        if let Some(record) = self.records.iter_mut().rev().find(|r| r.poster.is_none()) {
            if let Some(url) = self.doc.resolve(poster) {
                record.poster = Some(url);
            }
        }
    }

    fn set_last_poster(&mut self, poster: &str) {
        if let Some(url) = self.doc.resolve(poster) {
            if let Some(record) = self.records.last_mut() {
                record.poster = Some(url);
            }
        }
    }

    fn set_last_quality(&mut self, quality: &str) {
        if let Some(record) = self.records.last_mut() {
            if record.quality.is_none() {
                record.quality = quality_token(quality).or_else(|| {
                    quality.trim().parse::<u32>().ok().map(|n| format!("{n}p"))
                });
            }
        }
    }

    fn into_records(self) -> Vec<VideoRecord> {
        self.records
    }
}

fn quality_token(text: &str) -> Option<String> {
    QUALITY_RE
        .captures(text)
        .map(|caps| format!("{}p", &caps[1]))
}

fn select<'a>(doc: &'a Document, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css).map_or_else(|_| Vec::new(), |sel| doc.dom().select(&sel).collect())
}

/// Native video/source elements, capturing the poster.
fn native_elements(doc: &Document, out: &mut Collector<'_>) {
    for video in select(doc, "video") {
        let poster = video.value().attr("poster");
        if let Some(src) = video.value().attr("src") {
            if out.push(src) {
                if let Some(poster) = poster {
                    out.set_last_poster(poster);
                }
            }
        }
        let Ok(source_sel) = Selector::parse("source[src]") else {
            continue;
        };
        for source in video.select(&source_sel) {
            let Some(src) = source.value().attr("src") else {
                continue;
            };
            if out.push(src) {
                if let Some(poster) = poster {
                    out.set_last_poster(poster);
                }
                // Explicit metadata beats URL sniffing for type and quality.
                if let Some(kind) = source.value().attr("type") {
                    if let Some(record) = out.records.last_mut() {
                        record.kind = Some(kind.to_string());
                    }
                }
                let label = ["label", "size", "res"]
                    .iter()
                    .find_map(|name| source.value().attr(name));
                if let Some(label) = label {
                    out.set_last_quality(label);
                }
            }
        }
    }
}

/// Page-level video metadata tags.
fn page_meta(doc: &Document, out: &mut Collector<'_>) {
    for el in select(
        doc,
        r#"meta[property="og:video"], meta[property="og:video:url"], meta[property="og:video:secure_url"], meta[name="twitter:player:stream"]"#,
    ) {
        if let Some(content) = el.value().attr("content") {
            out.push(content);
        }
    }
}

/// Data-attribute video references.
fn data_attrs(doc: &Document, out: &mut Collector<'_>) {
    for el in select(doc, "[data-video-src], [data-video-url], [data-mp4], [data-video]") {
        let value = el.value();
        let href = ["data-video-src", "data-video-url", "data-mp4", "data-video"]
            .iter()
            .find_map(|name| value.attr(name));
        if let Some(href) = href {
            out.push(href);
        }
    }
}

/// Structured linked-data video objects, back-filling posters from thumbnail
/// metadata.
fn linked_data(doc: &Document, out: &mut Collector<'_>) {
    for el in select(doc, r#"script[type="application/ld+json"]"#) {
        let body = el.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&body) else {
            continue;
        };
        walk_for_videos(&value, out);
    }
}

fn walk_for_videos(value: &Value, out: &mut Collector<'_>) {
    match value {
        Value::Object(map) => {
            let is_video_object = map
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case("VideoObject"));
            if is_video_object {
                // Multiple optional field names, first present wins.
                let url = ["contentUrl", "embedUrl", "url"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(Value::as_str));
                if let Some(url) = url {
                    out.push(url);
                }
                let thumbnail = match map.get("thumbnailUrl") {
                    Some(Value::String(s)) => Some(s.as_str()),
                    Some(Value::Array(items)) => items.first().and_then(Value::as_str),
                    _ => None,
                };
                if let Some(thumbnail) = thumbnail {
                    out.backfill_poster(thumbnail);
                }
            }
            for nested in map.values() {
                walk_for_videos(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_for_videos(item, out);
            }
        }
        _ => {}
    }
}

/// Inline-script textual patterns covering common player-configuration
/// shapes and explicit file-extension matches.
fn script_battery(doc: &Document, out: &mut Collector<'_>) {
    let scripts: Vec<String> = select(doc, "script")
        .iter()
        .map(|el| el.text().collect::<String>())
        .collect();

    for script in &scripts {
        for caps in PLAYER_FILE_RE.captures_iter(script) {
            out.push(&caps[1]);
        }
        for caps in PLAYER_SRC_RE.captures_iter(script) {
            let candidate = &caps[1];
            if EXT_URL_RE.is_match(candidate) {
                out.push(candidate);
            }
        }
        for found in EXT_URL_RE.find_iter(script) {
            out.push(found.as_str());
        }
        // Some players stash the source as a base64 token that must be
        // decoded before the extension match can apply.
        for caps in BASE64_TOKEN_RE.captures_iter(script) {
            let Ok(decoded) = BASE64.decode(&caps[1]) else {
                continue;
            };
            let Ok(decoded) = String::from_utf8(decoded) else {
                continue;
            };
            for found in EXT_URL_RE.find_iter(&decoded) {
                out.push(found.as_str());
            }
        }
    }
}

/// Iframes pointing at known video-embedding hosts.
fn embed_iframes(doc: &Document, out: &mut Collector<'_>) {
    for el in select(doc, "iframe[src]") {
        let Some(src) = el.value().attr("src") else {
            continue;
        };
        let absolute = if src.starts_with("//") {
            format!("https:{src}")
        } else {
            src.to_string()
        };
        if EMBED_HOSTS.iter().any(|h| absolute.contains(h)) {
            out.push(&absolute);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_native_video_with_poster() {
        let page = r#"<video src="https://cdn.example.com/clip.mp4" poster="/stills/clip-poster.jpg"></video>"#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://cdn.example.com/clip.mp4");
        assert_eq!(videos[0].kind.as_deref(), Some("video/mp4"));
        assert_eq!(videos[0].poster.as_deref(), Some("https://example.com/stills/clip-poster.jpg"));
    }

    #[test]
    fn test_source_elements_carry_type_and_label() {
        let page = r#"<video poster="/p.jpg">
            <source src="https://cdn.example.com/clip-hd.mp4" type="video/mp4" label="1080p">
            <source src="https://cdn.example.com/clip-sd.webm" type="video/webm" label="480p">
        </video>"#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].quality.as_deref(), Some("1080p"));
        assert_eq!(videos[1].quality.as_deref(), Some("480p"));
    }

    #[test]
    fn test_ad_urls_excluded_before_insertion() {
        let page = r#"
            <video src="https://cdn.example.com/clip.mp4"></video>
            <script>var ad = "https://adserver.example.net/spots/promo.mp4";</script>
        "#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://cdn.example.com/clip.mp4");
    }

    #[test]
    fn test_script_battery_player_config() {
        let page = r#"<script>
            jwplayer("player").setup({ file: "https://cdn.example.com/episode-042.mp4" });
        </script>"#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://cdn.example.com/episode-042.mp4");
    }

    #[test]
    fn test_script_battery_base64_token() {
        // "https://cdn.example.com/secret-clip.mp4"
        let page = r#"<script>
            var s = atob("aHR0cHM6Ly9jZG4uZXhhbXBsZS5jb20vc2VjcmV0LWNsaXAubXA0");
        </script>"#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://cdn.example.com/secret-clip.mp4");
    }

    #[test]
    fn test_escaped_urls_dedup_against_plain() {
        let page = r#"
            <video src="https://cdn.example.com/the-same-clip-file.mp4"></video>
            <script>var v = {"file": "https:\/\/cdn.example.com\/the-same-clip-file.mp4"};</script>
        "#;
        let doc = Document::parse(page, "https://example.com/watch");
        assert_eq!(extract_videos(&doc, 10).len(), 1);
    }

    #[test]
    fn test_encoded_query_values_survive_in_record_url() {
        let page = r#"<video src="https://cdn.example.com/clip.mp4?next=%2Fplaylist%3Fid%3D7"></video>"#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos.len(), 1);
        assert_eq!(
            videos[0].url,
            "https://cdn.example.com/clip.mp4?next=%2Fplaylist%3Fid%3D7"
        );
    }

    #[test]
    fn test_linked_data_poster_backfill() {
        let page = r#"<script type="application/ld+json">
            {"@type": "VideoObject",
             "contentUrl": "https://cdn.example.com/talk.mp4",
             "thumbnailUrl": "https://cdn.example.com/talk-thumb.jpg"}
        </script>"#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].poster.as_deref(), Some("https://cdn.example.com/talk-thumb.jpg"));
    }

    #[test]
    fn test_embed_iframe_hosts() {
        let page = r#"
            <iframe src="https://player.vimeo.com/video/12345"></iframe>
            <iframe src="https://surveys.example.com/widget"></iframe>
        "#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://player.vimeo.com/video/12345");
    }

    #[test]
    fn test_final_ordering_progressive_before_adaptive() {
        let page = r#"
            <iframe src="https://player.vimeo.com/video/9"></iframe>
            <script>var hls = "https://cdn.example.com/stream/master.m3u8";</script>
            <video src="https://cdn.example.com/direct-720p.mp4"></video>
        "#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        let urls: Vec<&str> = videos.iter().map(|v| v.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/direct-720p.mp4",
                "https://cdn.example.com/stream/master.m3u8",
                "https://player.vimeo.com/video/9",
            ]
        );
    }

    #[test]
    fn test_quality_parsed_from_url_token() {
        let page = r#"<video src="https://cdn.example.com/movie-1080p.mp4"></video>"#;
        let doc = Document::parse(page, "https://example.com/watch");
        let videos = extract_videos(&doc, 10);
        assert_eq!(videos[0].quality.as_deref(), Some("1080p"));
    }
}
