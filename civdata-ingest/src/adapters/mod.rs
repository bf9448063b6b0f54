//! Source adapters
//!
//! One adapter per external source. Each implements [`SourceAdapter`] from
//! the `types` module and is driven by [`AdapterRunner`].
//!
//! # Adapters
//! 1. **offline** - OpenStates people dataset on local disk
//! 2. **congress** - Congress.gov v3 member API
//! 3. **google_civic** - Google Civic Information representatives API
//! 4. **fec** - OpenFEC candidate search and totals
//! 5. **wikipedia** - Wikipedia REST page summary
//!
//! # Failure isolation
//! The runner is the error boundary: it consults the per-run
//! [`FailureTracker`](crate::tracker::FailureTracker) before each call,
//! records the outcome after, and never lets one adapter's failure reach
//! its siblings or the pipeline.

pub mod congress;
pub mod fec;
pub mod google_civic;
pub mod http;
pub mod offline;
pub mod wikipedia;

use crate::context::RunContext;
use crate::types::{AdapterError, RosterEntry, SourceAdapter, SourceRecord, SourceTag};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

/// What happened to one adapter call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FetchStatus {
    /// Record with at least one field
    Contributed,
    /// Source answered without usable data
    Empty,
    /// Tracker said skip (backoff or dead)
    Skipped,
    /// Source cannot serve this entry
    Unavailable(String),
    /// Call failed; recorded by the tracker
    Failed(String),
}

/// One adapter's result for one roster entry
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: SourceTag,
    pub status: FetchStatus,
    pub record: Option<SourceRecord>,
}

impl SourceOutcome {
    fn without_record(source: SourceTag, status: FetchStatus) -> Self {
        Self {
            source,
            status,
            record: None,
        }
    }
}

/// Runs every adapter for an entry concurrently
///
/// Calls to the same source are serialized by a per-source gate so the
/// tracker sees failures in order; a shared semaphore bounds calls in flight
/// across all entries.
pub struct AdapterRunner {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    gates: HashMap<SourceTag, Arc<Mutex<()>>>,
    in_flight: Arc<Semaphore>,
}

impl AdapterRunner {
    /// Create a runner; `max_in_flight` is clamped to at least 1
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, max_in_flight: usize) -> Self {
        let gates = adapters
            .iter()
            .map(|a| (a.source(), Arc::new(Mutex::new(()))))
            .collect();
        Self {
            adapters,
            gates,
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Fetch from all sources concurrently
    ///
    /// # Returns
    /// One outcome per adapter, in adapter order. Never fails.
    pub async fn fetch_all(&self, entry: &RosterEntry, run: &RunContext) -> Vec<SourceOutcome> {
        let futures = self
            .adapters
            .iter()
            .map(|adapter| self.fetch_one(Arc::clone(adapter), entry, run));
        join_all(futures).await
    }

    async fn fetch_one(
        &self,
        adapter: Arc<dyn SourceAdapter>,
        entry: &RosterEntry,
        run: &RunContext,
    ) -> SourceOutcome {
        let source = adapter.source();

        if run.tracker.should_skip(source) {
            debug!(source = %source, name = %entry.name, "Skipping source (backoff)");
            return SourceOutcome::without_record(source, FetchStatus::Skipped);
        }

        let _gate = match self.gates.get(&source) {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };

        // State may have changed while waiting on the gate
        if run.tracker.should_skip(source) {
            debug!(source = %source, name = %entry.name, "Skipping source (backoff)");
            return SourceOutcome::without_record(source, FetchStatus::Skipped);
        }

        let _permit = match self.in_flight.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return SourceOutcome::without_record(source, FetchStatus::Failed(e.to_string()))
            }
        };

        match adapter.fetch(entry, run).await {
            Ok(Some(record)) if record.has_content() => {
                run.tracker.record_success(source);
                debug!(source = %source, name = %entry.name, "Source contributed");
                SourceOutcome {
                    source,
                    status: FetchStatus::Contributed,
                    record: Some(record),
                }
            }
            Ok(_) => {
                run.tracker.record_success(source);
                debug!(source = %source, name = %entry.name, "Source returned no data");
                SourceOutcome::without_record(source, FetchStatus::Empty)
            }
            Err(AdapterError::NotAvailable(reason)) => {
                debug!(source = %source, name = %entry.name, %reason, "Source not available");
                SourceOutcome::without_record(source, FetchStatus::Unavailable(reason))
            }
            Err(e) => {
                run.tracker.record_failure(source, e.status_code());
                warn!(
                    source = %source,
                    name = %entry.name,
                    error = %e,
                    "Source fetch failed (per-source error isolation)"
                );
                SourceOutcome::without_record(source, FetchStatus::Failed(e.to_string()))
            }
        }
    }

    /// Get adapter count
    pub fn count(&self) -> usize {
        self.adapters.len()
    }
}

// ============================================================================
// Mock Adapter for Testing
// ============================================================================
