//! Lock-aware retry for representative writes
//!
//! A concurrent writer can hold the SQLite file lock while an upsert
//! transaction starts. Those upserts are retried on a doubling delay; every
//! other failure is returned to the caller untouched.

use crate::error::{PipelineError, PipelineResult};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Delay schedule between attempts: 10 ms doubling to a 1 s ceiling
#[derive(Debug, Clone)]
struct LockBackoff {
    next: Duration,
    ceiling: Duration,
}

impl LockBackoff {
    fn new() -> Self {
        Self {
            next: Duration::from_millis(10),
            ceiling: Duration::from_secs(1),
        }
    }

    fn step(&mut self) -> Duration {
        let current = self.next;
        self.next = (self.next * 2).min(self.ceiling);
        current
    }
}

/// Run `write` until it stops reporting a locked database or the budget runs out
///
/// # Arguments
/// * `label` - Operation name used in logs and the final error
/// * `budget_ms` - Total time spent retrying before giving up
/// * `write` - Produces a fresh attempt each call
///
/// # Returns
/// * The first non-lock result
/// * `PipelineError::Persistence` when still locked after `budget_ms`
pub async fn retry_on_lock<F, Fut, T>(label: &str, budget_ms: u64, mut write: F) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = PipelineResult<T>>,
{
    let started = Instant::now();
    let budget = Duration::from_millis(budget_ms);
    let mut backoff = LockBackoff::new();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let err = match write().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(label, attempts, waited_ms = started.elapsed().as_millis(), "Write went through after lock wait");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_database_locked() {
            return Err(err);
        }

        let waited = started.elapsed();
        if waited >= budget {
            error!(label, attempts, budget_ms, "Database still locked, giving up");
            return Err(PipelineError::Persistence(format!(
                "{label}: database locked after {attempts} attempts ({} ms)",
                waited.as_millis()
            )));
        }

        let delay = backoff.step();
        warn!(label, attempts, delay_ms = delay.as_millis(), "Database locked, retrying");
        tokio::time::sleep(delay).await;
    }
}
