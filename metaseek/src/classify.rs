//! Canonical failure classification for engine responses.
//!
//! Every failed adapter invocation is mapped to one code of the shape
//! `{PREFIX}_{REASON}`. The cascade consults the reason to decide between
//! retrying the same level and escalating to the next one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::EngineResponse;

/// Canonical failure reasons, ordered roughly by diagnostic specificity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// 401/403 with an authentication-related message token.
    AuthFailed,
    /// A captcha challenge was served.
    Captcha,
    /// Automated-traffic detection without an explicit captcha.
    BotDetection,
    /// 429 or a rate-limit message token.
    RateLimited,
    /// Synthetic 408 or a deadline/cancellation message token.
    Timeout,
    /// 2xx with zero records.
    EmptyResults,
    /// Adapter not configured or reachable at all.
    Unavailable,
    /// Any other non-2xx status.
    HttpError,
    /// Fallback.
    UnknownError,
}

impl Reason {
    /// The `{REASON}` half of the canonical code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthFailed => "AUTH_FAILED",
            Self::Captcha => "CAPTCHA",
            Self::BotDetection => "BOT_DETECTION",
            Self::RateLimited => "RATE_LIMITED",
            Self::Timeout => "TIMEOUT",
            Self::EmptyResults => "EMPTY_RESULTS",
            Self::Unavailable => "UNAVAILABLE",
            Self::HttpError => "HTTP_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Whether the cascade should skip the remaining retry budget and move
    /// to the next level immediately.
    ///
    /// Structural failures reproduce deterministically on retry: a missing
    /// credential or an unreachable adapter will not heal inside one
    /// request's backoff window.
    #[must_use]
    pub const fn escalates(self) -> bool {
        matches!(self, Self::Unavailable | Self::AuthFailed)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure: the reason plus the source-prefixed code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    /// Canonical reason.
    pub reason: Reason,
    /// `{PREFIX}_{REASON}` code, e.g. `BRAVE_RATE_LIMITED`.
    pub code: String,
    /// Message carried over from the response, or a stock one.
    pub message: String,
}

fn message_contains(message: &str, tokens: &[&str]) -> bool {
    let lower = message.to_lowercase();
    tokens.iter().any(|t| lower.contains(t))
}

const AUTH_TOKENS: &[&str] = &["unauthorized", "api key", "apikey", "auth", "subscription", "credential"];
const CAPTCHA_TOKENS: &[&str] = &["captcha", "challenge"];
const BOT_TOKENS: &[&str] = &["bot", "automated", "unusual traffic", "detected"];
const RATE_TOKENS: &[&str] = &["rate limit", "rate-limit", "too many requests", "quota"];
const TIMEOUT_TOKENS: &[&str] = &["timed out", "timeout", "deadline", "cancelled", "canceled"];
const UNAVAILABLE_TOKENS: &[&str] = &["not configured", "unavailable", "no adapter", "disabled"];

/// Maps an adapter response to its canonical code.
///
/// Pure and order-sensitive: status-code checks are evaluated before
/// message-substring checks, so a 429 with a message mentioning "timeout"
/// still classifies as rate-limited.
#[must_use]
pub fn classify(prefix: &str, response: &EngineResponse) -> ClassifiedError {
    let message = response.error.clone().unwrap_or_default();
    let reason = classify_reason(response, &message);
    ClassifiedError {
        reason,
        code: format!("{}_{}", prefix.to_uppercase(), reason.as_str()),
        message: if message.is_empty() {
            reason.as_str().to_string()
        } else {
            message
        },
    }
}

fn classify_reason(response: &EngineResponse, message: &str) -> Reason {
    // Status-code tier first.
    match response.status {
        401 => return Reason::AuthFailed,
        403 => {
            if message_contains(message, CAPTCHA_TOKENS) {
                return Reason::Captcha;
            }
            if message_contains(message, AUTH_TOKENS) {
                return Reason::AuthFailed;
            }
            return Reason::BotDetection;
        }
        408 => return Reason::Timeout,
        429 => return Reason::RateLimited,
        status if (200..300).contains(&status) => {
            if response.results.is_empty() {
                return Reason::EmptyResults;
            }
        }
        _ => {}
    }

    // Message-substring tier, shared by network-layer faults (status 0) and
    // unrecognized HTTP statuses.
    if message_contains(message, CAPTCHA_TOKENS) {
        return Reason::Captcha;
    }
    if message_contains(message, BOT_TOKENS) {
        return Reason::BotDetection;
    }
    if message_contains(message, RATE_TOKENS) {
        return Reason::RateLimited;
    }
    if message_contains(message, TIMEOUT_TOKENS) {
        return Reason::Timeout;
    }
    if message_contains(message, UNAVAILABLE_TOKENS) {
        return Reason::Unavailable;
    }

    // Status 0 is not an HTTP status; without a matching token it stays
    // unknown.
    if response.status != 0 && !(200..300).contains(&response.status) {
        return Reason::HttpError;
    }
    Reason::UnknownError
}
