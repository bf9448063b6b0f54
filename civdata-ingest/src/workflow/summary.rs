//! Run summary report

use crate::db::UpsertAction;
use crate::eligibility::EligibilitySummary;
use crate::types::SourceTag;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Quality tier of a merged record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// >= 90
    Excellent,
    /// 70-90
    Good,
    /// 50-70
    Fair,
    /// < 50
    Poor,
}

impl QualityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            QualityTier::Excellent
        } else if score >= 70.0 {
            QualityTier::Good
        } else if score >= 50.0 {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityHistogram {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

impl QualityHistogram {
    pub fn record(&mut self, score: f64) {
        match QualityTier::from_score(score) {
            QualityTier::Excellent => self.excellent += 1,
            QualityTier::Good => self.good += 1,
            QualityTier::Fair => self.fair += 1,
            QualityTier::Poor => self.poor += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.fair + self.poor
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistenceCounts {
    pub inserted: usize,
    pub updated: usize,
    pub preserved: usize,
    pub failed: usize,
}

impl PersistenceCounts {
    pub fn record(&mut self, action: UpsertAction) {
        match action {
            UpsertAction::Inserted => self.inserted += 1,
            UpsertAction::Updated => self.updated += 1,
            UpsertAction::Preserved => self.preserved += 1,
        }
    }
}

/// Failure for one roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryError {
    pub name: String,
    pub message: String,
}

/// End-of-run summary
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    /// Roster size
    pub total_entries: usize,
    /// Current entries that went through the adapters
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Not current as of `evaluated_at`
    pub skipped: usize,
    pub eligibility: EligibilitySummary,
    pub quality: QualityHistogram,
    pub verified: usize,
    /// Entries each source contributed data to
    pub source_contributions: BTreeMap<SourceTag, usize>,
    /// Failed calls per source
    pub source_failures: BTreeMap<SourceTag, usize>,
    pub persistence: PersistenceCounts,
    pub errors: Vec<EntryError>,
    pub duration_ms: u64,
    pub dry_run: bool,
}

impl PipelineSummary {
    pub fn new(run_id: Uuid, evaluated_at: DateTime<Utc>, eligibility: EligibilitySummary) -> Self {
        Self {
            run_id,
            evaluated_at,
            total_entries: eligibility.total,
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: eligibility.non_current,
            eligibility,
            quality: QualityHistogram::default(),
            verified: 0,
            source_contributions: BTreeMap::new(),
            source_failures: BTreeMap::new(),
            persistence: PersistenceCounts::default(),
            errors: Vec::new(),
            duration_ms: 0,
            dry_run: false,
        }
    }

    pub fn record_error(&mut self, name: &str, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(EntryError {
            name: name.to_string(),
            message: message.into(),
        });
    }
}
