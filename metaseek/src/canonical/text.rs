//! Text hygiene for scraped titles and snippets.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static NUMERIC_ENTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(x?[0-9a-fA-F]+);").expect("valid regex"));

/// Titles that are a hostname glued directly onto a URL with no separator,
/// e.g. `www.example.comhttps://www.example.com/page`.
static GLUED_HOST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.-]+\.[a-zA-Z]{2,}https?://").expect("valid regex"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Decodes the HTML entities that show up in scraped result markup.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ");

    NUMERIC_ENTITY_RE
        .replace_all(&named, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let parsed = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
                u32::from_str_radix(hex, 16)
            } else {
                body.parse::<u32>()
            };
            parsed
                .ok()
                .and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Removes all markup tags, leaving the text content.
#[must_use]
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Whether a candidate title is itself just a URL.
#[must_use]
pub fn is_bare_url(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("http://") || trimmed.starts_with("https://") || GLUED_HOST_RE.is_match(trimmed)
}

/// Cleans a scraped title: strips tags, decodes entities, collapses
/// whitespace.
///
/// Some sources concatenate the display hostname directly in front of the
/// link URL with no separator, producing titles like
/// `docs.example.comhttps://docs.example.com/guide`. When that artifact (or a
/// bare URL) is detected, the title is replaced with the result's own
/// hostname, which is the only trustworthy text left.
#[must_use]
pub fn clean_title(raw: &str, result_url: &str) -> String {
    let text = decode_entities(&strip_tags(raw));
    let text = WHITESPACE_RE.replace_all(text.trim(), " ").into_owned();

    if GLUED_HOST_RE.is_match(&text) || is_bare_url(&text) {
        return Url::parse(result_url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or(text);
    }
    text
}

/// Decodes the backslash escaping JSON payloads put in front of slashes.
///
/// Safe for display and fetching, unlike [`unescape_url`].
#[must_use]
pub fn decode_json_escapes(url: &str) -> String {
    url.replace("\\/", "/")
        .replace("\\u002f", "/")
        .replace("\\u002F", "/")
}

/// Decodes the URL escape sequences commonly found in inline scripts and
/// JSON payloads, so that duplicate comparison sees one spelling.
///
/// Comparison-only: percent-decoding a delimiter inside a query value
/// changes the address, so the output must never be stored or fetched.
#[must_use]
pub fn unescape_url(url: &str) -> String {
    decode_json_escapes(url)
        .replace("&amp;", "&")
        .replace("%2F", "/")
        .replace("%2f", "/")
        .replace("%3A", ":")
        .replace("%3a", ":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry &#39;s &lt;b&gt;"), "Tom & Jerry 's <b>");
        assert_eq!(decode_entities("caf&#233; &#x2014; bar"), "café — bar");
    }

    #[test]
    fn test_decode_entities_leaves_invalid_refs() {
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Hello</b> <i>world</i>"), "Hello world");
    }

    #[test]
    fn test_clean_title_collapses_whitespace() {
        assert_eq!(
            clean_title("  Rust\n  <em>async</em>  book ", "https://example.com"),
            "Rust async book"
        );
    }

    #[test]
    fn test_clean_title_repairs_glued_hostname() {
        let glued = "docs.example.comhttps://docs.example.com/guide";
        assert_eq!(clean_title(glued, "https://docs.example.com/guide"), "docs.example.com");
    }

    #[test]
    fn test_clean_title_replaces_bare_url() {
        assert_eq!(
            clean_title("https://example.com/page", "https://example.com/page"),
            "example.com"
        );
    }

    #[test]
    fn test_unescape_url() {
        assert_eq!(
            unescape_url("https:\\/\\/cdn.example.com\\/v\\/clip.mp4"),
            "https://cdn.example.com/v/clip.mp4"
        );
        assert_eq!(unescape_url("https%3A%2F%2Fx.example%2Fa.mp4"), "https://x.example/a.mp4");
    }
}
