//! The cascade state machine.
//!
//! Retry-vs-escalate control flow lives here as a pure transition table,
//! testable without any HTTP plumbing. The driver in the parent module only
//! executes attempts and sleeps.

/// State of one cascade execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    /// About to run attempt `retry` (0-based) at 1-based `level`.
    Attempt {
        /// Current level, 1-based.
        level: usize,
        /// Retry ordinal within the level, 0 for the first attempt.
        retry: usize,
    },
    /// A level produced results.
    Success {
        /// Level that resolved the query.
        level: usize,
    },
    /// Moving past a level, either by classification or by budget
    /// exhaustion.
    Escalate {
        /// The level about to be attempted.
        next_level: usize,
    },
    /// Every level is exhausted.
    Exhausted,
}

/// Outcome of one executed attempt, as the state machine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt produced at least one result.
    Success,
    /// The attempt failed.
    Failure {
        /// Whether the classified reason is structurally non-retryable.
        escalate: bool,
    },
}

/// Applies the transition table to an executed attempt.
///
/// Escalating classifications skip the remaining retry budget; transient
/// failures consume it. A level whose budget runs out escalates anyway:
/// retries are level-local, not global.
#[must_use]
pub const fn transition(
    level: usize,
    retry: usize,
    outcome: AttemptOutcome,
    max_retries: usize,
) -> CascadeState {
    match outcome {
        AttemptOutcome::Success => CascadeState::Success { level },
        AttemptOutcome::Failure { escalate: true } => CascadeState::Escalate { next_level: level + 1 },
        AttemptOutcome::Failure { escalate: false } => {
            if retry < max_retries {
                CascadeState::Attempt {
                    level,
                    retry: retry + 1,
                }
            } else {
                CascadeState::Escalate { next_level: level + 1 }
            }
        }
    }
}

/// Resolves an escalation against the number of configured levels.
#[must_use]
pub const fn resolve_escalation(next_level: usize, level_count: usize) -> CascadeState {
    if next_level > level_count {
        CascadeState::Exhausted
    } else {
        CascadeState::Attempt {
            level: next_level,
            retry: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_success_is_terminal_for_the_level() {
        assert_eq!(
            transition(2, 1, AttemptOutcome::Success, 3),
            CascadeState::Success { level: 2 }
        );
    }

    #[test]
    fn test_transient_failure_consumes_retry_budget() {
        assert_eq!(
            transition(1, 0, AttemptOutcome::Failure { escalate: false }, 2),
            CascadeState::Attempt { level: 1, retry: 1 }
        );
        assert_eq!(
            transition(1, 2, AttemptOutcome::Failure { escalate: false }, 2),
            CascadeState::Escalate { next_level: 2 }
        );
    }

    #[test]
    fn test_escalating_failure_skips_remaining_budget() {
        assert_eq!(
            transition(1, 0, AttemptOutcome::Failure { escalate: true }, 5),
            CascadeState::Escalate { next_level: 2 }
        );
    }

    #[test]
    fn test_escalation_past_last_level_exhausts() {
        assert_eq!(resolve_escalation(4, 3), CascadeState::Exhausted);
        assert_eq!(
            resolve_escalation(3, 3),
            CascadeState::Attempt { level: 3, retry: 0 }
        );
    }

    #[test]
    fn test_zero_retry_budget_single_attempt_per_level() {
        assert_eq!(
            transition(1, 0, AttemptOutcome::Failure { escalate: false }, 0),
            CascadeState::Escalate { next_level: 2 }
        );
    }
}
