//! Search-result extraction strategies.

use scraper::{ElementRef, Selector};
use url::Url;

use super::{first_non_empty, Document};
use crate::canonical;
use crate::records::SearchHit;

/// Extracts search hits from a results page, first non-empty strategy wins.
///
/// Strategy order:
/// 1. result blocks pairing a result link with its adjacent snippet;
/// 2. result links alone (empty snippet);
/// 3. recovery from independently matched citation and heading elements,
///    for markup where the link no longer wraps the title.
#[must_use]
pub fn extract_search_hits(doc: &Document) -> Vec<SearchHit> {
    first_non_empty(
        doc,
        &[&result_blocks, &result_links, &citation_recovery],
    )
}

fn select<'a>(doc: &'a Document, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css).map_or_else(|_| Vec::new(), |sel| doc.dom().select(&sel).collect())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Unwraps the redirect indirection some result pages put in front of the
/// target address (a `uddg`-style query parameter holding the real URL).
fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let Ok(parsed) = Url::parse(&absolute) else {
        return absolute;
    };
    for key in ["uddg", "u", "url"] {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == key) {
            if target.starts_with("http://") || target.starts_with("https://") {
                return target.into_owned();
            }
        }
    }
    absolute
}

fn hit_from_anchor(anchor: ElementRef<'_>, snippet: &str) -> Option<SearchHit> {
    let href = anchor.value().attr("href")?;
    let url = unwrap_redirect(href);
    SearchHit::new(&element_text(anchor), &url, snippet)
}

/// Primary: result blocks with a link and an adjacent snippet element.
fn result_blocks(doc: &Document) -> Vec<SearchHit> {
    let link_sel = match Selector::parse("a.result__a") {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };
    let snippet_sel = match Selector::parse("a.result__snippet, .result__snippet") {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };

    let mut hits = Vec::new();
    for block in select(doc, ".result") {
        let Some(anchor) = block.select(&link_sel).next() else {
            continue;
        };
        let snippet = block
            .select(&snippet_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if let Some(hit) = hit_from_anchor(anchor, &snippet) {
            hits.push(hit);
        }
    }
    hits
}

/// Secondary: result links alone, snippets left empty.
fn result_links(doc: &Document) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for anchor in select(doc, "a.result__a, h2 a[href], h3 a[href]") {
        if let Some(hit) = hit_from_anchor(anchor, "") {
            hits.push(hit);
        }
    }
    hits
}

/// Tertiary: pair independently matched citation and heading elements.
///
/// Used for one engine family whose markup stopped wrapping titles in the
/// result link. Candidate titles that are themselves bare URLs, or the
/// glued hostname-then-URL artifact, are repaired via the canonicalizer.
fn citation_recovery(doc: &Document) -> Vec<SearchHit> {
    let cites = select(doc, "cite");
    let headings = select(doc, "h3, h2");

    let mut hits = Vec::new();
    for (cite, heading) in cites.iter().zip(headings.iter()) {
        let cite_text = element_text(*cite);
        let url = if cite_text.starts_with("http://") || cite_text.starts_with("https://") {
            cite_text
        } else if cite_text.contains('.') && !cite_text.contains(' ') {
            format!("https://{cite_text}")
        } else {
            continue;
        };

        let raw_title = element_text(*heading);
        // clean_title inside SearchHit::new handles the bare-URL and glued
        // artifacts, substituting the result's hostname.
        let title = if canonical::is_bare_url(&raw_title) {
            canonical::clean_title(&raw_title, &url)
        } else {
            raw_title
        };
        if let Some(hit) = SearchHit::new(&title, &url, "") {
            hits.push(hit);
        }
    }
    hits
}
