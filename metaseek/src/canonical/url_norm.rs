//! URL normalization and duplicate detection.

use url::Url;

/// Query parameters that carry no identity: tracking, sizing, and signing
/// parameters that CDNs and analytics layers attach to otherwise identical
/// assets.
const STRIPPED_PARAMS: &[&str] = &[
    "width", "height", "quality", "signature", "sig", "token", "w", "h", "q",
    "s", "ref", "fbclid", "gclid", "mc_cid", "mc_eid",
];

fn is_stripped_param(key: &str) -> bool {
    key.starts_with("utm_") || STRIPPED_PARAMS.contains(&key)
}

/// Normalizes a URL for equality comparison.
///
/// Lower-cases the whole address, strips known tracking/sizing query
/// parameters, and strips a trailing slash. Kept query pairs are carried
/// over verbatim, percent-encoding included, so encoded delimiters survive
/// a second pass. The output is for comparison only and must never be
/// displayed.
///
/// Idempotent: `normalize_url(normalize_url(u)) == normalize_url(u)`.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let Ok(parsed) = Url::parse(&lowered) else {
        return lowered.trim_end_matches('/').to_string();
    };

    let mut out = String::new();
    out.push_str(parsed.scheme());
    out.push_str("://");
    if let Some(host) = parsed.host_str() {
        out.push_str(host);
    }
    if let Some(port) = parsed.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(parsed.path().trim_end_matches('/'));

    let kept: Vec<&str> = parsed
        .query()
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or(pair);
            !is_stripped_param(key)
        })
        .collect();
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    out.trim_end_matches('/').to_string()
}

/// Returns the last path segment of a URL, lower-cased.
///
/// Returns an empty string when the URL does not parse or has no path
/// segments.
#[must_use]
pub fn extract_filename(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return String::new();
    };
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

/// Whether `candidate` duplicates any entry of `existing`.
///
/// Two URLs are duplicates when their normalized forms match, or when both
/// filenames are non-empty, longer than 10 characters, and equal. The
/// filename branch catches CDNs rehosting the same asset under a different
/// host or path with the filename unchanged, which normalized-URL equality
/// alone misses.
#[must_use]
pub fn is_duplicate<S: AsRef<str>>(candidate: &str, existing: &[S]) -> bool {
    let normalized = normalize_url(candidate);
    let filename = extract_filename(candidate);

    existing.iter().any(|entry| {
        let entry = entry.as_ref();
        if normalize_url(entry) == normalized {
            return true;
        }
        let other = extract_filename(entry);
        !filename.is_empty() && filename.len() > 10 && filename == other
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_strips_tracking_params() {
        let url = "https://Example.com/a/b/?utm_source=x&width=300&page=2";
        assert_eq!(normalize_url(url), "https://example.com/a/b?page=2");
    }

    #[test]
    fn test_normalize_strips_trailing_slash() {
        assert_eq!(normalize_url("https://example.com/path/"), "https://example.com/path");
    }

    #[test]
    fn test_normalize_preserves_remaining_query() {
        assert_eq!(
            normalize_url("https://example.com/search?q=cats&utm_medium=email"),
            "https://example.com/search?q=cats"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "https://Example.com/A/B/?utm_source=x&width=300&page=2",
            "https://example.com/",
            "not a url at all/",
            "https://example.com:8443/x?sig=abc&id=1",
            "https://example.com/a?page=%23x",
            "https://example.com/a?next=%2Fpath%3Fq%3D1&utm_source=y",
        ];
        for input in inputs {
            let once = normalize_url(input);
            assert_eq!(normalize_url(&once), once, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_normalize_keeps_encoded_delimiters() {
        // Kept pairs must not be decoded: a decoded `%23` would re-parse as
        // a fragment on the next pass.
        assert_eq!(
            normalize_url("https://example.com/a?page=%23x&utm_source=y"),
            "https://example.com/a?page=%23x"
        );
    }

    #[test]
    fn test_normalize_unparseable_input() {
        assert_eq!(normalize_url("  JUNK/// "), "junk");
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(
            extract_filename("https://cdn.example.com/img/Golden-Retriever.JPG?w=100"),
            "golden-retriever.jpg"
        );
        assert_eq!(extract_filename("https://example.com/"), "");
        assert_eq!(extract_filename("::not-a-url"), "");
    }

    #[test]
    fn test_duplicate_by_normalized_url() {
        let existing = ["https://example.com/pic.jpg?utm_source=a"];
        assert!(is_duplicate("https://EXAMPLE.com/pic.jpg", &existing));
    }

    #[test]
    fn test_duplicate_by_filename_across_hosts() {
        let existing = ["https://cdn-a.example.com/x/golden-retriever.jpg"];
        assert!(is_duplicate("https://cdn-b.example.net/y/golden-retriever.jpg", &existing));
    }

    #[test]
    fn test_short_filenames_never_match_by_name() {
        let existing = ["https://cdn-a.example.com/x/a.jpg"];
        assert!(!is_duplicate("https://cdn-b.example.net/y/a.jpg", &existing));
    }

    #[test]
    fn test_filename_branch_is_symmetric() {
        let a = "https://host-one.example.com/path/long-asset-name.jpg";
        let b = "https://host-two.example.net/other/long-asset-name.jpg";
        assert_eq!(is_duplicate(a, &[b]), is_duplicate(b, &[a]));
    }

    #[test]
    fn test_distinct_urls_are_not_duplicates() {
        let existing = ["https://example.com/one.jpg"];
        assert!(!is_duplicate("https://example.com/two.jpg", &existing));
    }
}
