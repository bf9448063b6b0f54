//! In-process adapters for pipeline tests

use async_trait::async_trait;
use civdata_ingest::types::{
    AdapterError, ConfidenceTier, RosterEntry, SourceAdapter, SourceRecord, SourceTag,
};
use civdata_ingest::RunContext;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns the same record for every entry
pub struct StaticAdapter {
    pub record: SourceRecord,
    pub calls: AtomicUsize,
}

impl StaticAdapter {
    pub fn new(record: SourceRecord) -> Self {
        Self {
            record,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    fn source(&self) -> SourceTag {
        self.record.source
    }

    fn confidence(&self) -> ConfidenceTier {
        self.record.confidence
    }

    async fn fetch(
        &self,
        _entry: &RosterEntry,
        _run: &RunContext,
    ) -> Result<Option<SourceRecord>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.record.clone()))
    }
}

/// Always fails; `status = None` simulates a timeout
pub struct FailingAdapter {
    pub source: SourceTag,
    pub status: Option<u16>,
}

impl FailingAdapter {
    pub fn new(source: SourceTag, status: Option<u16>) -> Self {
        Self { source, status }
    }
}

#[async_trait]
impl SourceAdapter for FailingAdapter {
    fn source(&self) -> SourceTag {
        self.source
    }

    fn confidence(&self) -> ConfidenceTier {
        ConfidenceTier::Medium
    }

    async fn fetch(
        &self,
        _entry: &RosterEntry,
        _run: &RunContext,
    ) -> Result<Option<SourceRecord>, AdapterError> {
        Err(match self.status {
            Some(status) => AdapterError::Status {
                status,
                body: "service unavailable".to_string(),
            },
            None => AdapterError::Network("request timed out".to_string()),
        })
    }
}
