//! Pipeline Orchestrator
//!
//! Drives one reconciliation run over a roster.
//!
//! # Error Handling
//! - Per-source isolation: the adapter runner absorbs every adapter failure
//! - Per-entry isolation: errors and panics are recorded in the summary
//! - Graceful degradation: resolution falls back to name-derived ids
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(config).with_adapters(adapters);
//! let report = pipeline.run(&roster, Utc::now()).await;
//! ```

use super::summary::PipelineSummary;
use super::PipelineEvent;
use crate::adapters::{AdapterRunner, FetchStatus, SourceOutcome};
use crate::context::RunContext;
use crate::db::{RepresentativeStore, UpsertOutcome};
use crate::eligibility::EligibilityPolicy;
use crate::error::{PipelineError, PipelineResult};
use crate::fusion::{EnrichedRepresentative, RecordMerger, VerificationStatus};
use crate::identity::{CrosswalkStore, EntityResolver, MemoryCrosswalk, SourceIdentifier};
use crate::types::{RosterEntry, SourceAdapter, SourceDetail, SourceRecord, SourceTag};
use crate::utils::retry_on_lock;
use chrono::{DateTime, Utc};
use civdata_common::config::{PersistenceSection, PipelineSection};
use futures::{stream, FutureExt, StreamExt};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Entity type recorded in the crosswalk
pub const REPRESENTATIVE_ENTITY: &str = "representative";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Roster entries processed concurrently (1 = sequential)
    pub max_concurrent_representatives: usize,
    /// Adapter calls in flight across all entries
    pub max_in_flight_requests: usize,
    /// Upper bound on lock-retry time per upsert
    pub max_lock_wait_ms: u64,
    /// Recorded in the summary; set when no store is attached on purpose
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_representatives: 1,
            max_in_flight_requests: 4,
            max_lock_wait_ms: 5000,
            dry_run: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_sections(pipeline: &PipelineSection, persistence: &PersistenceSection) -> Self {
        Self {
            max_concurrent_representatives: pipeline.max_concurrent_representatives.max(1),
            max_in_flight_requests: pipeline.max_in_flight_requests.max(1),
            max_lock_wait_ms: persistence.max_lock_wait_ms,
            dry_run: false,
        }
    }
}

/// Result of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: PipelineSummary,
    /// Merged records in roster order (current entries that succeeded)
    pub representatives: Vec<EnrichedRepresentative>,
}

/// Everything learned about one entry
struct EntryOutput {
    rep: EnrichedRepresentative,
    sources: Vec<(SourceTag, FetchStatus)>,
    persisted: Option<PipelineResult<UpsertOutcome>>,
}

/// Pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    policy: Arc<EligibilityPolicy>,
    runner: AdapterRunner,
    resolver: EntityResolver,
    merger: RecordMerger,
    store: Option<Arc<dyn RepresentativeStore>>,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl Pipeline {
    /// Create pipeline with no adapters, an in-memory crosswalk, and no store
    pub fn new(config: PipelineConfig) -> Self {
        let runner = AdapterRunner::new(Vec::new(), config.max_in_flight_requests);
        Self {
            config,
            policy: Arc::new(EligibilityPolicy::default()),
            runner,
            resolver: EntityResolver::new(Arc::new(MemoryCrosswalk::new())),
            merger: RecordMerger::new(),
            store: None,
            event_tx: None,
        }
    }

    /// Create pipeline with event channel for progress reporting
    pub fn with_events(config: PipelineConfig, event_tx: mpsc::Sender<PipelineEvent>) -> Self {
        let mut pipeline = Self::new(config);
        pipeline.event_tx = Some(event_tx);
        pipeline
    }

    pub fn with_adapters(mut self, adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        self.runner = AdapterRunner::new(adapters, self.config.max_in_flight_requests);
        self
    }

    pub fn with_eligibility(mut self, policy: Arc<EligibilityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_crosswalk(mut self, crosswalk: Arc<dyn CrosswalkStore>) -> Self {
        self.resolver = EntityResolver::new(crosswalk);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn RepresentativeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the pipeline over a roster
    ///
    /// # Arguments
    /// * `roster` - Raw roster entries
    /// * `now` - Evaluation instant for every eligibility decision
    ///
    /// # Returns
    /// * Summary plus merged records. Never fails: per-entry errors land in the summary.
    pub async fn run(&self, roster: &[RosterEntry], now: DateTime<Utc>) -> RunReport {
        let started = Instant::now();
        let run = RunContext::new(now);

        info!(
            run_id = %run.run_id,
            entries = roster.len(),
            sources = self.runner.count(),
            evaluated_at = %now,
            "Pipeline run started"
        );
        self.emit_event(PipelineEvent::RunStarted {
            run_id: run.run_id,
            total_entries: roster.len(),
            timestamp: Utc::now().timestamp(),
        })
        .await;

        let eligibility = self.policy.evaluate_all(roster, now);
        let mut current: Vec<&RosterEntry> = Vec::new();
        for (entry, verdict) in roster.iter().zip(&eligibility.verdicts) {
            if verdict.is_current {
                current.push(entry);
            } else {
                debug!(name = %entry.name, reason = %verdict.reason, "Skipping non-current entry");
            }
            self.emit_event(PipelineEvent::EligibilityEvaluated {
                name: entry.name.clone(),
                is_current: verdict.is_current,
                reason: verdict.reason.clone(),
            })
            .await;
        }

        let mut summary = PipelineSummary::new(run.run_id, now, eligibility.summary);
        summary.dry_run = self.config.dry_run;
        summary.processed = current.len();

        let total = current.len();
        let results: Vec<(&RosterEntry, PipelineResult<EntryOutput>)> =
            stream::iter(current.into_iter().enumerate())
                .map(|(index, entry)| {
                    let run = &run;
                    async move { (entry, self.process_guarded(index, total, entry, run).await) }
                })
                .buffered(self.config.max_concurrent_representatives.max(1))
                .collect()
                .await;

        let mut representatives = Vec::new();
        for (entry, result) in results {
            match result {
                Ok(output) => {
                    for (source, status) in &output.sources {
                        match status {
                            FetchStatus::Contributed => {
                                *summary.source_contributions.entry(*source).or_insert(0) += 1
                            }
                            FetchStatus::Failed(_) => {
                                *summary.source_failures.entry(*source).or_insert(0) += 1
                            }
                            _ => {}
                        }
                    }

                    match output.persisted {
                        Some(Err(e)) => {
                            summary.persistence.failed += 1;
                            summary.record_error(&entry.name, e.to_string());
                            self.emit_event(PipelineEvent::RepresentativeFailed {
                                name: entry.name.clone(),
                                message: e.to_string(),
                            })
                            .await;
                            continue;
                        }
                        Some(Ok(ref outcome)) => summary.persistence.record(outcome.action),
                        None => {}
                    }

                    summary.succeeded += 1;
                    summary.quality.record(output.rep.quality_score());
                    if output.rep.verification_status == VerificationStatus::Verified {
                        summary.verified += 1;
                    }
                    representatives.push(output.rep);
                }
                Err(e) => {
                    error!(name = %entry.name, error = %e, "Failed to process representative");
                    summary.record_error(&entry.name, e.to_string());
                    self.emit_event(PipelineEvent::RepresentativeFailed {
                        name: entry.name.clone(),
                        message: e.to_string(),
                    })
                    .await;
                }
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            run_id = %run.run_id,
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            jurisdictions = run.jurisdictions.processed().await.len(),
            duration_ms = summary.duration_ms,
            "Pipeline run complete"
        );
        self.emit_event(PipelineEvent::RunCompleted {
            run_id: run.run_id,
            succeeded: summary.succeeded,
            failed: summary.failed,
            skipped: summary.skipped,
            duration_ms: summary.duration_ms,
        })
        .await;

        RunReport {
            summary,
            representatives,
        }
    }

    /// Process one entry, converting a panic into an error
    async fn process_guarded(
        &self,
        index: usize,
        total: usize,
        entry: &RosterEntry,
        run: &RunContext,
    ) -> PipelineResult<EntryOutput> {
        match AssertUnwindSafe(self.process_entry(index, total, entry, run))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(PipelineError::Internal(format!("panic while processing: {message}")))
            }
        }
    }

    /// Fetch, resolve, merge, persist
    async fn process_entry(
        &self,
        index: usize,
        total: usize,
        entry: &RosterEntry,
        run: &RunContext,
    ) -> PipelineResult<EntryOutput> {
        if entry.name.trim().is_empty() {
            return Err(PipelineError::InvalidEntry("empty name".to_string()));
        }

        self.emit_event(PipelineEvent::RepresentativeStarted {
            index,
            total,
            name: entry.name.clone(),
        })
        .await;

        let outcomes = self.runner.fetch_all(entry, run).await;
        for outcome in &outcomes {
            self.emit_event(PipelineEvent::SourceCompleted {
                name: entry.name.clone(),
                source: outcome.source,
                status: outcome.status.clone(),
            })
            .await;
        }

        let sources: Vec<(SourceTag, FetchStatus)> = outcomes
            .iter()
            .map(|o| (o.source, o.status.clone()))
            .collect();
        let records: Vec<SourceRecord> = outcomes
            .into_iter()
            .filter_map(|o: SourceOutcome| o.record)
            .collect();

        let identifiers = collect_identifiers(entry, &records);
        let identity = self
            .resolver
            .resolve_or_fallback(REPRESENTATIVE_ENTITY, &identifiers, entry)
            .await;

        let rep = self.merger.merge(entry, &identity, &records, run.now);

        let persisted = match &self.store {
            Some(store) => {
                let result = retry_on_lock("representative upsert", self.config.max_lock_wait_ms, || {
                    store.upsert(&rep)
                })
                .await;
                if let Err(e) = &result {
                    warn!(name = %entry.name, error = %e, "Upsert failed");
                }
                Some(result)
            }
            None => None,
        };

        let action = match &persisted {
            Some(Ok(outcome)) => Some(outcome.action),
            _ => None,
        };
        if !matches!(persisted, Some(Err(_))) {
            self.emit_event(PipelineEvent::RepresentativeCompleted {
                name: entry.name.clone(),
                id: rep.id.clone(),
                overall_confidence: rep.quality_score(),
                verification_status: rep.verification_status,
                action,
            })
            .await;
        }

        Ok(EntryOutput {
            rep,
            sources,
            persisted,
        })
    }

    /// Emit event if channel is configured
    async fn emit_event(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

/// Identifiers known for an entry: roster ids first, then what sources returned
fn collect_identifiers(entry: &RosterEntry, records: &[SourceRecord]) -> Vec<SourceIdentifier> {
    let mut identifiers: Vec<SourceIdentifier> = entry
        .ids
        .pairs()
        .into_iter()
        .map(|(source, id)| SourceIdentifier::new(source, id))
        .collect();

    for record in records {
        let id = match &record.detail {
            SourceDetail::OpenStates { stub: true, .. } | SourceDetail::Wikipedia { .. } => None,
            SourceDetail::OpenStates { person_id, .. } => Some(person_id.clone()),
            SourceDetail::Congress { bioguide_id, .. } => Some(bioguide_id.clone()),
            SourceDetail::Fec { candidate_id, .. } => Some(candidate_id.clone()),
            SourceDetail::GoogleCivic { .. } => record.source_id.clone(),
        };
        if let Some(id) = id.filter(|id| !id.trim().is_empty()) {
            identifiers.push(SourceIdentifier {
                source: record.source,
                source_id: id,
                observed_name: record.name.clone(),
            });
        }
    }

    identifiers
}
