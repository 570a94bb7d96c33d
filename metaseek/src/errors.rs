//! Internal error types.
//!
//! These never cross the public call contracts: adapter and strategy
//! failures collapse into [`crate::records::EngineResponse`] values or empty
//! strategy output before they reach a caller. The variants here exist for
//! the plumbing underneath (fetching, the browser session).

use thiserror::Error;

/// Errors raised by the plumbing underneath the adapters.
#[derive(Debug, Error)]
pub enum MetaseekError {
    /// An HTTP fetch failed at the transport layer.
    #[error("fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// A URL did not parse.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The browser session could not be created or has died.
    #[error("browser session error: {0}")]
    Session(String),

    /// A response exceeded the configured size limit.
    #[error("response too large: {size} bytes (limit {limit})")]
    ResponseTooLarge {
        /// Observed size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
}
