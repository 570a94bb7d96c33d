//! Shared HTTP fetcher used by engines and aggregator strategies.

use std::time::Instant;

use crate::config::FetchConfig;
use crate::errors::MetaseekError;

/// Result of a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body as text.
    pub text: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// Content type from headers.
    pub content_type: Option<String>,
    /// Time taken to fetch in milliseconds.
    pub duration_ms: u64,
}

impl FetchResult {
    /// Whether the response is HTML.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
    }

    /// Whether the fetch was successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// A reqwest wrapper carrying the shared client and fetch policy.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Builds a fetcher from config. Falls back to a default client when the
    /// builder rejects the configuration.
    #[must_use]
    pub fn new(config: FetchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// The fetch policy this fetcher was built with.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches a URL and returns the body as text.
    pub async fn get(&self, url: &str) -> Result<FetchResult, MetaseekError> {
        self.get_with_query(url, &[]).await
    }

    /// Fetches a URL with query parameters appended.
    pub async fn get_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<FetchResult, MetaseekError> {
        self.get_full(url, query, &[]).await
    }

    /// Fetches a URL with query parameters and per-request headers.
    pub async fn get_full(
        &self,
        url: &str,
        query: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> Result<FetchResult, MetaseekError> {
        let started = Instant::now();

        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }
        for (key, value) in extra_headers {
            request = request.header(*key, *value);
        }

        let response = request.send().await?;
        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.config.max_response_size {
                return Err(MetaseekError::ResponseTooLarge {
                    size: length,
                    limit: self.config.max_response_size,
                });
            }
        }

        let text = response.text().await?;
        if text.len() > self.config.max_response_size {
            return Err(MetaseekError::ResponseTooLarge {
                size: text.len(),
                limit: self.config.max_response_size,
            });
        }

        Ok(FetchResult {
            status_code,
            text,
            final_url,
            content_type,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html() {
        let result = FetchResult {
            status_code: 200,
            text: String::new(),
            final_url: "https://example.com".to_string(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            duration_ms: 1,
        };
        assert!(result.is_html());
        assert!(result.is_success());

        let json = FetchResult {
            content_type: Some("application/json".to_string()),
            ..result
        };
        assert!(!json.is_html());
    }
}
