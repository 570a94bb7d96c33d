//! The fallback orchestrator: an ordered cascade of engine adapters with
//! bounded per-level retries, exponential backoff with jitter, and
//! classification-driven escalation.
//!
//! Strictly sequential: one adapter call in flight at a time. The cascade's
//! total duration is bounded by the sum of per-attempt timeouts plus backoff
//! delays; callers should impose their own outer request deadline on top.

mod state;


pub use state::{resolve_escalation, transition, AttemptOutcome, CascadeState};

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::classify;
use crate::config::{CascadeConfig, MetaseekConfig};
use crate::engines::{build_engines, guarded_search, Engine};
use crate::records::{Attempt, CascadeFailure, CascadeLog, SearchOutcome};

/// Ordered cascade over engine adapters.
pub struct Cascade {
    engines: Vec<Arc<dyn Engine>>,
    config: CascadeConfig,
}

impl Cascade {
    /// Builds a cascade over an explicit engine list, priority order first.
    #[must_use]
    pub fn new(engines: Vec<Arc<dyn Engine>>, config: CascadeConfig) -> Self {
        Self { engines, config }
    }

    /// Builds the cascade from configuration.
    #[must_use]
    pub fn from_config(config: &MetaseekConfig) -> Self {
        Self::new(build_engines(&config.engines, &config.fetch), config.cascade.clone())
    }

    /// Number of configured levels.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.engines.len()
    }

    /// Runs the cascade for one query.
    ///
    /// The first engine to yield any result wins; no cross-engine merging
    /// happens here. On exhaustion the outcome carries the last classified
    /// failure and the complete attempt log, never an error.
    pub async fn execute(&self, query: &str) -> SearchOutcome {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let mut log = CascadeLog {
            started_at: chrono::Utc::now().to_rfc3339(),
            ..CascadeLog::default()
        };

        if self.engines.is_empty() {
            log.error = Some(CascadeFailure {
                code: "CASCADE_UNAVAILABLE".to_string(),
                message: "no engines configured".to_string(),
                engine: String::new(),
                level: 0,
            });
            log.total_time_ms = elapsed_ms(started);
            return SearchOutcome {
                results: Vec::new(),
                log,
            };
        }

        let mut state = CascadeState::Attempt { level: 1, retry: 0 };
        let mut last_failure: Option<CascadeFailure> = None;

        loop {
            let CascadeState::Attempt { level, retry } = state else {
                break;
            };
            let engine = &self.engines[level - 1];

            if retry > 0 {
                tokio::time::sleep(self.backoff_delay(retry)).await;
            }

            debug!(%run_id, engine = engine.name(), level, retry, query, "cascade attempt");
            let (response, response_time_ms) =
                guarded_search(engine.as_ref(), query, self.config.attempt_timeout()).await;

            if response.is_success() {
                log.attempts.push(Attempt {
                    engine: engine.name().to_string(),
                    success: true,
                    status: response.status,
                    response_time_ms,
                    retry_count: retry,
                    error: None,
                });
                log.resolved_by = Some(engine.name().to_string());
                log.total_time_ms = elapsed_ms(started);
                info!(
                    %run_id,
                    engine = engine.name(),
                    level,
                    results = response.results.len(),
                    "cascade resolved"
                );
                return SearchOutcome {
                    results: response.results,
                    log,
                };
            }

            let classified = classify(engine.prefix(), &response);
            warn!(
                %run_id,
                engine = engine.name(),
                level,
                retry,
                code = %classified.code,
                "cascade attempt failed"
            );
            log.attempts.push(Attempt {
                engine: engine.name().to_string(),
                success: false,
                status: response.status,
                response_time_ms,
                retry_count: retry,
                error: Some(classified.code.clone()),
            });
            last_failure = Some(CascadeFailure {
                code: classified.code,
                message: classified.message,
                engine: engine.name().to_string(),
                level,
            });

            let outcome = AttemptOutcome::Failure {
                escalate: classified.reason.escalates(),
            };
            state = transition(level, retry, outcome, self.config.max_retries);
            if let CascadeState::Escalate { next_level } = state {
                state = resolve_escalation(next_level, self.level_count());
                if matches!(state, CascadeState::Attempt { .. }) && self.config.level_pause_ms > 0 {
                    // Fixed pause between levels, distinct from per-retry
                    // backoff, to avoid synchronized retry storms on the
                    // next source.
                    tokio::time::sleep(Duration::from_millis(self.config.level_pause_ms)).await;
                }
            }
        }

        log.error = last_failure;
        log.total_time_ms = elapsed_ms(started);
        SearchOutcome {
            results: Vec::new(),
            log,
        }
    }

    /// Backoff before retry `n` (n >= 1):
    /// `min(base * 2^(n-1) + jitter, cap)` with jitter uniform up to 50% of
    /// the base.
    fn backoff_delay(&self, retry: usize) -> Duration {
        let base = self.config.backoff_base_ms;
        let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let exp_delay = base.saturating_mul(2u64.saturating_pow(exponent));
        let jitter = if base == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=base / 2)
        };
        Duration::from_millis(exp_delay.saturating_add(jitter).min(self.config.backoff_cap_ms))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
