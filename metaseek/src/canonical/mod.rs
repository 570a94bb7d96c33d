//! Canonical forms for URLs and scraped text.
//!
//! Pure functions shared by every extraction pipeline: URL normalization for
//! equality comparison, the filename heuristic used for cross-host duplicate
//! detection, and text hygiene for titles and snippets.

mod text;
mod url_norm;

pub use text::{clean_title, decode_entities, decode_json_escapes, is_bare_url, strip_tags, unescape_url};
pub use url_norm::{extract_filename, is_duplicate, normalize_url};
