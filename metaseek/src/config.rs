//! Configuration for the cascade, fetcher, engines, and aggregators.
//!
//! All values are injected into the core. The environment is read only by
//! the explicit `from_env` constructors; `Default` stays pure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the sequential fallback cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Maximum retries per level, beyond the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Base backoff delay in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Backoff cap in milliseconds.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    /// Fixed pause between levels, distinct from per-retry backoff.
    #[serde(default = "default_level_pause_ms")]
    pub level_pause_ms: u64,
}

fn default_attempt_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> usize {
    2
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_cap_ms() -> u64 {
    8_000
}

fn default_level_pause_ms() -> u64 {
    250
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: default_attempt_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            level_pause_ms: default_level_pause_ms(),
        }
    }
}

impl CascadeConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout_ms(mut self, ms: u64) -> Self {
        self.attempt_timeout_ms = ms;
        self
    }

    /// Sets the per-level retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the backoff base.
    #[must_use]
    pub fn with_backoff_base_ms(mut self, ms: u64) -> Self {
        self.backoff_base_ms = ms;
        self
    }

    /// Sets the backoff cap.
    #[must_use]
    pub fn with_backoff_cap_ms(mut self, ms: u64) -> Self {
        self.backoff_cap_ms = ms;
        self
    }

    /// Sets the inter-level pause.
    #[must_use]
    pub fn with_level_pause_ms(mut self, ms: u64) -> Self {
        self.level_pause_ms = ms;
        self
    }

    /// Per-attempt timeout as a [`Duration`].
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Configuration for HTTP fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,
    /// Additional headers to include on every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_fetch_timeout_ms() -> u64 {
    8_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) metaseek/0.1".to_string()
}

fn default_max_response_size() -> usize {
    10 * 1024 * 1024
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_fetch_timeout_ms(),
            user_agent: default_user_agent(),
            max_response_size: default_max_response_size(),
            headers: HashMap::new(),
        }
    }
}

impl FetchConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for one fan-out aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Candidate cap applied inside each strategy.
    #[serde(default = "default_per_strategy_cap")]
    pub per_strategy_cap: usize,
    /// Global cap on the merged output.
    #[serde(default = "default_global_cap")]
    pub global_cap: usize,
    /// Per-strategy timeout in milliseconds.
    #[serde(default = "default_strategy_timeout_ms")]
    pub strategy_timeout_ms: u64,
    /// Merged-result count at which the specialized first tier short-circuits
    /// the remaining strategies.
    #[serde(default = "default_short_circuit_at")]
    pub short_circuit_at: usize,
}

fn default_per_strategy_cap() -> usize {
    16
}

fn default_global_cap() -> usize {
    20
}

fn default_strategy_timeout_ms() -> u64 {
    8_000
}

fn default_short_circuit_at() -> usize {
    12
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            per_strategy_cap: default_per_strategy_cap(),
            global_cap: default_global_cap(),
            strategy_timeout_ms: default_strategy_timeout_ms(),
            short_circuit_at: default_short_circuit_at(),
        }
    }
}

impl AggregatorConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-strategy cap.
    #[must_use]
    pub fn with_per_strategy_cap(mut self, cap: usize) -> Self {
        self.per_strategy_cap = cap;
        self
    }

    /// Sets the global cap.
    #[must_use]
    pub fn with_global_cap(mut self, cap: usize) -> Self {
        self.global_cap = cap;
        self
    }

    /// Sets the per-strategy timeout.
    #[must_use]
    pub fn with_strategy_timeout_ms(mut self, ms: u64) -> Self {
        self.strategy_timeout_ms = ms;
        self
    }

    /// Per-strategy timeout as a [`Duration`].
    #[must_use]
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }
}

/// Which engine adapters are enabled, in cascade priority order, plus their
/// endpoints and credentials.
///
/// The adapter list is configuration, not hard-coded order: the source
/// cascades this system replaces disagreed on ordering across call sites, so
/// one canonical ordering is chosen here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginesConfig {
    /// Cascade order by engine name. Unknown names are skipped with a
    /// warning.
    #[serde(default = "default_engine_order")]
    pub order: Vec<String>,
    /// API key for the structured search API; the adapter reports
    /// unavailable when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Structured search API endpoint.
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    /// HTML results endpoint for the scrape engine.
    #[serde(default = "default_scrape_endpoint")]
    pub scrape_endpoint: String,
    /// Booru-style image API endpoint.
    #[serde(default = "default_booru_endpoint")]
    pub booru_endpoint: String,
    /// Image-search results endpoint for the HTML image surface.
    #[serde(default = "default_image_scrape_endpoint")]
    pub image_scrape_endpoint: String,
    /// Maximum results requested from API adapters.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// When non-empty, only results from these domains are kept.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Results from these domains are dropped.
    #[serde(default)]
    pub blocked_domains: Vec<String>,
}

fn default_engine_order() -> Vec<String> {
    vec!["brave".to_string(), "duckduckgo".to_string(), "rendered".to_string()]
}

fn default_api_endpoint() -> String {
    "https://api.search.brave.com/res/v1/web/search".to_string()
}

fn default_scrape_endpoint() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

fn default_booru_endpoint() -> String {
    "https://safebooru.org/index.php".to_string()
}

fn default_image_scrape_endpoint() -> String {
    "https://www.bing.com/images/search".to_string()
}

fn default_max_results() -> usize {
    10
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            order: default_engine_order(),
            api_key: None,
            api_endpoint: default_api_endpoint(),
            scrape_endpoint: default_scrape_endpoint(),
            booru_endpoint: default_booru_endpoint(),
            image_scrape_endpoint: default_image_scrape_endpoint(),
            max_results: default_max_results(),
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
        }
    }
}

impl EnginesConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with defaults, reading the API key from the
    /// `METASEEK_API_KEY` environment variable. `Default` itself never
    /// touches the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("METASEEK_API_KEY").ok().filter(|k| !k.is_empty()),
            ..Self::default()
        }
    }

    /// Sets the cascade order.
    #[must_use]
    pub fn with_order<S: Into<String>>(mut self, order: impl IntoIterator<Item = S>) -> Self {
        self.order = order.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Whether a result URL passes the domain allow/block filters.
    #[must_use]
    pub fn domain_allowed(&self, url: &str) -> bool {
        if !self.allowed_domains.is_empty() && !self.allowed_domains.iter().any(|d| url.contains(d)) {
            return false;
        }
        !self.blocked_domains.iter().any(|d| url.contains(d))
    }
}

/// Top-level configuration for the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaseekConfig {
    /// Cascade settings.
    #[serde(default)]
    pub cascade: CascadeConfig,
    /// Shared fetcher settings.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Engine enablement and endpoints.
    #[serde(default)]
    pub engines: EnginesConfig,
    /// Image aggregator settings.
    #[serde(default)]
    pub images: AggregatorConfig,
    /// Video aggregator settings.
    #[serde(default)]
    pub videos: AggregatorConfig,
}

impl MetaseekConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with defaults and engine credentials read from the
    /// environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            engines: EnginesConfig::from_env(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cascade_defaults() {
        let config = CascadeConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.backoff_base_ms, 500);
        assert_eq!(config.backoff_cap_ms, 8_000);
    }

    #[test]
    fn test_cascade_builder() {
        let config = CascadeConfig::new()
            .with_max_retries(1)
            .with_backoff_base_ms(10)
            .with_level_pause_ms(0);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.backoff_base_ms, 10);
        assert_eq!(config.level_pause_ms, 0);
    }

    #[test]
    fn test_engines_config_deserializes_with_defaults() {
        let config: EnginesConfig = serde_json::from_str("{}").expect("valid config");
        assert_eq!(config.order, vec!["brave", "duckduckgo", "rendered"]);
        assert_eq!(config.max_results, 10);
    }

    #[test]
    fn test_default_engines_config_ignores_environment() {
        std::env::set_var("METASEEK_API_KEY", "key-from-env");
        assert!(EnginesConfig::default().api_key.is_none());
        assert_eq!(EnginesConfig::from_env().api_key.as_deref(), Some("key-from-env"));
        std::env::remove_var("METASEEK_API_KEY");
    }

    #[test]
    fn test_domain_filters() {
        let config = EnginesConfig {
            allowed_domains: vec!["docs.rs".to_string()],
            blocked_domains: vec!["spam.example".to_string()],
            ..EnginesConfig::new().with_order(["brave"])
        };
        assert!(config.domain_allowed("https://docs.rs/tokio"));
        assert!(!config.domain_allowed("https://other.example/page"));

        let config = EnginesConfig {
            blocked_domains: vec!["spam.example".to_string()],
            ..EnginesConfig::default()
        };
        assert!(!config.domain_allowed("https://spam.example/page"));
        assert!(config.domain_allowed("https://fine.example/page"));
    }
}
