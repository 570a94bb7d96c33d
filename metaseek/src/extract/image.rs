//! Single-page image extraction strategies.
//!
//! Unlike the search pipeline, these strategies accumulate: preview
//! metadata, responsive candidates, lazy-load attributes, CSS backgrounds,
//! inline elements, and structured data surface complementary images on the
//! same page, so each appends to one shared capped list.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde_json::Value;

use super::{accumulate_capped, Document};
use crate::records::ImageRecord;

/// Minimum declared pixel size for an inline `<img>` to count as content.
const MIN_DECLARED_SIZE: u32 = 80;

/// Filename tokens that mark chrome rather than content.
const CHROME_TOKENS: &[&str] = &["logo", "icon", "sprite", "avatar", "badge", "button"];

static BACKGROUND_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"background-image\s*:\s*url\(['"]?([^'")]+)['"]?\)"#).expect("valid regex")
});

/// Extracts images from one page, accumulating across all strategies up to
/// `cap`.
#[must_use]
pub fn extract_images(doc: &Document, cap: usize) -> Vec<ImageRecord> {
    accumulate_capped(
        doc,
        &[
            &preview_meta,
            &srcset_candidates,
            &lazy_load_attrs,
            &css_backgrounds,
            &inline_imgs,
            &linked_data,
        ],
        cap,
        |record: &ImageRecord| record.url.clone(),
    )
}

fn select<'a>(doc: &'a Document, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css).map_or_else(|_| Vec::new(), |sel| doc.dom().select(&sel).collect())
}

fn push_resolved(doc: &Document, out: &mut Vec<ImageRecord>, href: &str, alt: &str) {
    if let Some(url) = doc.resolve(href) {
        if let Some(record) = ImageRecord::validated(&url, alt, doc.page_url()) {
            out.push(record);
        }
    }
}

/// Primary preview-image metadata tags.
fn preview_meta(doc: &Document) -> Vec<ImageRecord> {
    let mut out = Vec::new();
    for el in select(
        doc,
        r#"meta[property="og:image"], meta[property="og:image:secure_url"], meta[name="twitter:image"]"#,
    ) {
        if let Some(content) = el.value().attr("content") {
            push_resolved(doc, &mut out, content, "");
        }
    }
    out
}

/// Highest-resolution entry of each responsive-image candidate list.
fn srcset_candidates(doc: &Document) -> Vec<ImageRecord> {
    let mut out = Vec::new();
    for el in select(doc, "img[srcset], source[srcset]") {
        let Some(srcset) = el.value().attr("srcset") else {
            continue;
        };
        if let Some(best) = best_srcset_entry(srcset) {
            let alt = el.value().attr("alt").unwrap_or("");
            push_resolved(doc, &mut out, &best, alt);
        }
    }
    out
}

/// Picks the entry with the largest width descriptor; entries without one
/// count as width 0.
fn best_srcset_entry(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let width = parts
                .next()
                .and_then(|d| d.trim_end_matches(['w', 'x']).parse::<u32>().ok())
                .unwrap_or(0);
            Some((url.to_string(), width))
        })
        .max_by_key(|(_, width)| *width)
        .map(|(url, _)| url)
}

/// Lazy-load attribute variants.
fn lazy_load_attrs(doc: &Document) -> Vec<ImageRecord> {
    let mut out = Vec::new();
    for el in select(doc, "img[data-src], img[data-lazy-src], img[data-original]") {
        let value = el.value();
        // Multiple optional attribute names, first present wins.
        let href = ["data-src", "data-lazy-src", "data-original"]
            .iter()
            .find_map(|name| value.attr(name));
        if let Some(href) = href {
            push_resolved(doc, &mut out, href, value.attr("alt").unwrap_or(""));
        }
    }
    out
}

/// CSS `background-image` declarations, inline or in style blocks.
fn css_backgrounds(doc: &Document) -> Vec<ImageRecord> {
    let mut out = Vec::new();
    for caps in BACKGROUND_IMAGE_RE.captures_iter(doc.raw()) {
        push_resolved(doc, &mut out, &caps[1], "");
    }
    out
}

/// Inline `<img>` elements, rejecting declared sizes under 80px and chrome
/// filenames.
fn inline_imgs(doc: &Document) -> Vec<ImageRecord> {
    let mut out = Vec::new();
    for el in select(doc, "img[src]") {
        let value = el.value();
        let Some(src) = value.attr("src") else {
            continue;
        };
        let too_small = ["width", "height"].iter().any(|attr| {
            value
                .attr(attr)
                .and_then(|v| v.trim_end_matches("px").parse::<u32>().ok())
                .is_some_and(|px| px < MIN_DECLARED_SIZE)
        });
        if too_small {
            continue;
        }
        let lower = src.to_lowercase();
        if CHROME_TOKENS.iter().any(|t| lower.contains(t)) {
            continue;
        }
        push_resolved(doc, &mut out, src, value.attr("alt").unwrap_or(""));
    }
    out
}

/// Structured linked-data blocks, walking nested objects and arrays for
/// image-bearing fields.
fn linked_data(doc: &Document) -> Vec<ImageRecord> {
    let mut out = Vec::new();
    for el in select(doc, r#"script[type="application/ld+json"]"#) {
        let body = el.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&body) else {
            continue;
        };
        walk_for_images(doc, &value, &mut out);
    }
    out
}

fn walk_for_images(doc: &Document, value: &Value, out: &mut Vec<ImageRecord>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if matches!(key.as_str(), "image" | "thumbnailUrl" | "contentUrl" | "logo") {
                    collect_image_strings(doc, nested, out);
                } else {
                    walk_for_images(doc, nested, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_for_images(doc, item, out);
            }
        }
        _ => {}
    }
}

fn collect_image_strings(doc: &Document, value: &Value, out: &mut Vec<ImageRecord>) {
    match value {
        Value::String(s) => push_resolved(doc, out, s, ""),
        Value::Array(items) => {
            for item in items {
                collect_image_strings(doc, item, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("url") {
                push_resolved(doc, out, s, "");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preview_meta_first() {
        let page = r#"<head><meta property="og:image" content="/hero-image-large.jpg"></head>"#;
        let doc = Document::parse(page, "https://example.com/article");
        let images = extract_images(&doc, 10);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://example.com/hero-image-large.jpg");
        assert_eq!(images[0].source, "https://example.com/article");
    }

    #[test]
    fn test_strategies_accumulate() {
        let page = r#"
            <meta property="og:image" content="https://cdn.example.com/preview-hero-shot.jpg">
            <img src="https://cdn.example.com/inline-content-photo.jpg" alt="a dog">
        "#;
        let doc = Document::parse(page, "https://example.com/");
        let images = extract_images(&doc, 10);
        assert_eq!(images.len(), 2);
        assert_eq!(images[1].alt, "a dog");
    }

    #[test]
    fn test_srcset_highest_resolution_wins() {
        let page = r#"<img srcset="/small-picture-file.jpg 320w, /large-picture-file.jpg 1280w, /mid-picture-file.jpg 640w">"#;
        let doc = Document::parse(page, "https://example.com/");
        let images = extract_images(&doc, 10);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://example.com/large-picture-file.jpg");
    }

    #[test]
    fn test_lazy_attrs_first_present_wins() {
        let page = r#"<img data-lazy-src="/lazy-loaded-photo.jpg">"#;
        let doc = Document::parse(page, "https://example.com/");
        let images = extract_images(&doc, 10);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://example.com/lazy-loaded-photo.jpg");
    }

    #[test]
    fn test_css_background() {
        let page = r#"<div style="background-image: url('/css-banner-image.png')"></div>"#;
        let doc = Document::parse(page, "https://example.com/");
        let images = extract_images(&doc, 10);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://example.com/css-banner-image.png");
    }

    #[test]
    fn test_inline_rejects_small_and_chrome() {
        let page = r#"
            <img src="https://cdn.example.com/site-logo-header.png">
            <img src="https://cdn.example.com/tiny-thumb-picture.jpg" width="32" height="32">
            <img src="https://cdn.example.com/real-content-photo.jpg" width="800">
        "#;
        let doc = Document::parse(page, "https://example.com/");
        let images = extract_images(&doc, 10);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://cdn.example.com/real-content-photo.jpg");
    }

    #[test]
    fn test_linked_data_nested_walk() {
        let page = r#"<script type="application/ld+json">
            {"@graph": [{"@type": "Article",
              "image": {"url": "https://cdn.example.com/structured-article-img.jpg"},
              "publisher": {"thumbnailUrl": ["https://cdn.example.com/publisher-thumb-img.jpg"]}}]}
        </script>"#;
        let doc = Document::parse(page, "https://example.com/");
        let images = extract_images(&doc, 10);
        let urls: Vec<&str> = images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/structured-article-img.jpg",
                "https://cdn.example.com/publisher-thumb-img.jpg",
            ]
        );
    }

    #[test]
    fn test_cap_is_enforced() {
        let page = r#"
            <img src="https://cdn.example.com/picture-number-one.jpg">
            <img src="https://cdn.example.com/picture-number-two.jpg">
            <img src="https://cdn.example.com/picture-number-three.jpg">
        "#;
        let doc = Document::parse(page, "https://example.com/");
        assert_eq!(extract_images(&doc, 2).len(), 2);
    }
}
