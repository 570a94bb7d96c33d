//! Mock engines for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::engines::Engine;
use crate::records::{EngineResponse, SearchHit};

/// Builds `count` valid hits for a query, for scripted responses.
#[must_use]
pub fn canned_hits(query: &str, count: usize) -> Vec<SearchHit> {
    (0..count)
        .filter_map(|i| {
            SearchHit::new(
                &format!("{query} result {i}"),
                &format!("https://results.example.com/{}/{i}", query.replace(' ', "-")),
                &format!("snippet {i} for {query}"),
            )
        })
        .collect()
}

/// Behavior of one [`StaticEngine`] attempt.
enum Script {
    Respond(EngineResponse),
    Sleep(Duration),
    Panic,
}

/// A mock engine that plays back a scripted sequence of responses and
/// records how often it was called.
pub struct StaticEngine {
    name: String,
    prefix: String,
    available: bool,
    script: Mutex<VecDeque<Script>>,
    /// Response replayed once the script is exhausted.
    fallback: EngineResponse,
    call_count: Mutex<usize>,
}

impl StaticEngine {
    /// An engine that always returns the same response.
    #[must_use]
    pub fn always(name: &str, prefix: &str, response: EngineResponse) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            available: true,
            script: Mutex::new(VecDeque::new()),
            fallback: response,
            call_count: Mutex::new(0),
        }
    }

    /// An engine that plays `responses` in order, then replays the last one.
    #[must_use]
    pub fn sequence(name: &str, prefix: &str, responses: Vec<EngineResponse>) -> Self {
        let fallback = responses
            .last()
            .cloned()
            .unwrap_or_else(|| EngineResponse::success(Vec::new()));
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            available: true,
            script: Mutex::new(responses.into_iter().map(Script::Respond).collect()),
            fallback,
            call_count: Mutex::new(0),
        }
    }

    /// An engine that sleeps longer than any sane attempt timeout.
    #[must_use]
    pub fn slow(name: &str, prefix: &str, delay: Duration) -> Self {
        let mut engine = Self::always(name, prefix, EngineResponse::success(Vec::new()));
        engine.script = Mutex::new(VecDeque::from([Script::Sleep(delay)]));
        engine
    }

    /// An engine that reports itself unconfigured.
    #[must_use]
    pub fn unavailable(name: &str, prefix: &str) -> Self {
        let mut engine = Self::always(name, prefix, EngineResponse::unavailable(name));
        engine.available = false;
        engine
    }

    /// An engine that panics when searched.
    #[must_use]
    pub fn panicking(name: &str, prefix: &str) -> Self {
        let mut engine = Self::always(name, prefix, EngineResponse::success(Vec::new()));
        engine.script = Mutex::new(VecDeque::from([Script::Panic]));
        engine
    }

    /// Number of times `search` was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Engine for StaticEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn search(&self, _query: &str) -> EngineResponse {
        *self.call_count.lock() += 1;
        let next = self.script.lock().pop_front();
        match next {
            Some(Script::Respond(response)) => response,
            Some(Script::Sleep(delay)) => {
                tokio::time::sleep(delay).await;
                self.fallback.clone()
            }
            Some(Script::Panic) => panic!("scripted engine panic"),
            None => self.fallback.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canned_hits_are_valid() {
        let hits = canned_hits("two words", 3);
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.url.starts_with("https://")));
    }

    #[test]
    fn test_sequence_replays_last_response() {
        let engine = StaticEngine::sequence(
            "seq",
            "SEQ",
            vec![
                EngineResponse::failure(429, "rate limited"),
                EngineResponse::success(canned_hits("q", 1)),
            ],
        );
        assert_eq!(tokio_test::block_on(engine.search("q")).status, 429);
        assert!(tokio_test::block_on(engine.search("q")).is_success());
        assert!(tokio_test::block_on(engine.search("q")).is_success());
        assert_eq!(engine.call_count(), 3);
    }
}
