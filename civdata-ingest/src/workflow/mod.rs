//! Per-run reconciliation workflow
//!
//! For each roster entry:
//! 1. Evaluate eligibility as of the run's `now` (non-current entries are skipped)
//! 2. Fetch from every source adapter concurrently
//! 3. Resolve the canonical identity from the identifiers the sources returned
//! 4. Merge and score
//! 5. Upsert (unless running without a store)
//!
//! Entries are isolated from each other: an error or panic while processing
//! one is recorded in the summary and the run moves on.

pub mod pipeline;
pub mod summary;

use crate::adapters::FetchStatus;
use crate::db::UpsertAction;
use crate::fusion::VerificationStatus;
use crate::types::SourceTag;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use pipeline::{Pipeline, PipelineConfig, RunReport};
pub use summary::{EntryError, PersistenceCounts, PipelineSummary, QualityHistogram, QualityTier};

/// Run progress events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Run started
    RunStarted {
        run_id: Uuid,
        /// Roster size before eligibility filtering
        total_entries: usize,
        /// Unix timestamp (seconds since epoch)
        timestamp: i64,
    },

    /// Eligibility decided for one roster entry
    EligibilityEvaluated {
        name: String,
        is_current: bool,
        reason: String,
    },

    /// Representative processing started
    RepresentativeStarted {
        /// Index among current entries (0-based)
        index: usize,
        total: usize,
        name: String,
    },

    /// One source finished for a representative
    SourceCompleted {
        name: String,
        source: SourceTag,
        status: FetchStatus,
    },

    /// Representative merged (and persisted, when a store is configured)
    RepresentativeCompleted {
        name: String,
        id: String,
        overall_confidence: f64,
        verification_status: VerificationStatus,
        action: Option<UpsertAction>,
    },

    /// Representative could not be processed
    RepresentativeFailed { name: String, message: String },

    /// Run finished
    RunCompleted {
        run_id: Uuid,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        duration_ms: u64,
    },
}
