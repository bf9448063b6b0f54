//! Per-run shared state
//!
//! Everything mutable that adapters share during a run lives here and is
//! dropped with the run. Nothing is process-global.

use crate::adapters::offline::JurisdictionCache;
use crate::tracker::FailureTracker;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// State owned by one pipeline run
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    /// Evaluation instant for every eligibility decision in this run
    pub now: DateTime<Utc>,
    pub tracker: FailureTracker,
    /// Processed-jurisdictions memo for the offline dataset
    pub jurisdictions: JurisdictionCache,
}

impl RunContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            now,
            tracker: FailureTracker::new(),
            jurisdictions: JurisdictionCache::default(),
        }
    }
}
