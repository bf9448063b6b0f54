//! Per-source failure and backoff tracking
//!
//! One tracker per pipeline run, shared by every adapter call in that run.
//! Rate-limit signals (429/503) back off exponentially; repeated plain
//! failures back off linearly once they reach [`ESCALATION_THRESHOLD`]; a
//! source is dead for the rest of the run at [`MAX_FAILURES`].

use crate::types::SourceTag;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Failures after which a source is skipped for the remainder of the run
pub const MAX_FAILURES: u32 = 5;

/// Plain failures before a backoff window is applied
pub const ESCALATION_THRESHOLD: u32 = 3;

const RATE_LIMIT_BASE: Duration = Duration::from_secs(1);
const RATE_LIMIT_CAP: Duration = Duration::from_secs(300);
const FAILURE_BASE: Duration = Duration::from_secs(5);
const FAILURE_CAP: Duration = Duration::from_secs(60);

/// Snapshot of one source's failure state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceHealth {
    pub failure_count: u32,
    pub last_failure_time: Option<Instant>,
    pub backoff_until: Option<Instant>,
    pub last_status: Option<u16>,
}

impl SourceHealth {
    pub fn is_dead(&self) -> bool {
        self.failure_count >= MAX_FAILURES
    }
}

/// Circuit-breaker state for all sources in a run
#[derive(Debug, Default)]
pub struct FailureTracker {
    states: Mutex<HashMap<SourceTag, SourceHealth>>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_states<R>(&self, f: impl FnOnce(&mut HashMap<SourceTag, SourceHealth>) -> R) -> R {
        let mut guard = self.states.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Whether calls to `source` should be skipped right now
    pub fn should_skip(&self, source: SourceTag) -> bool {
        self.should_skip_at(source, Instant::now())
    }

    pub fn should_skip_at(&self, source: SourceTag, now: Instant) -> bool {
        self.with_states(|states| match states.get(&source) {
            None => false,
            Some(health) if health.is_dead() => true,
            Some(health) => health.backoff_until.is_some_and(|until| now < until),
        })
    }

    /// Record a failed call; returns the backoff window applied, if any
    pub fn record_failure(&self, source: SourceTag, status: Option<u16>) -> Option<Duration> {
        self.record_failure_at(source, status, Instant::now())
    }

    pub fn record_failure_at(
        &self,
        source: SourceTag,
        status: Option<u16>,
        now: Instant,
    ) -> Option<Duration> {
        self.with_states(|states| {
            let health = states.entry(source).or_default();
            health.failure_count = health.failure_count.saturating_add(1);
            health.last_failure_time = Some(now);
            health.last_status = status;

            let backoff = backoff_for(health.failure_count, status);
            if let Some(window) = backoff {
                health.backoff_until = Some(now + window);
            }

            if health.is_dead() {
                warn!(
                    source = %source,
                    failures = health.failure_count,
                    "Source disabled for remainder of run"
                );
            } else {
                debug!(
                    source = %source,
                    failures = health.failure_count,
                    status = ?status,
                    backoff_secs = backoff.map(|d| d.as_secs()),
                    "Source failure recorded"
                );
            }
            backoff
        })
    }

    /// Record a successful call: clears failures and backoff
    pub fn record_success(&self, source: SourceTag) {
        self.with_states(|states| {
            if let Some(health) = states.get_mut(&source) {
                if health.failure_count > 0 {
                    debug!(source = %source, "Source recovered");
                }
                *health = SourceHealth::default();
            }
        })
    }

    /// Current state for `source` (default when never seen)
    pub fn health(&self, source: SourceTag) -> SourceHealth {
        self.with_states(|states| states.get(&source).cloned().unwrap_or_default())
    }

    /// Time left in the backoff window, if inside one
    pub fn backoff_remaining_at(&self, source: SourceTag, now: Instant) -> Option<Duration> {
        self.with_states(|states| {
            states
                .get(&source)
                .and_then(|h| h.backoff_until)
                .and_then(|until| until.checked_duration_since(now))
                .filter(|d| !d.is_zero())
        })
    }
}

/// Backoff window after the `failures`-th consecutive failure
fn backoff_for(failures: u32, status: Option<u16>) -> Option<Duration> {
    if matches!(status, Some(429) | Some(503)) {
        let factor = 2u32.saturating_pow(failures.min(16));
        return Some(RATE_LIMIT_BASE.saturating_mul(factor).min(RATE_LIMIT_CAP));
    }
    if failures >= ESCALATION_THRESHOLD {
        return Some(FAILURE_BASE.saturating_mul(failures).min(FAILURE_CAP));
    }
    None
}
