//! Crosswalk storage seam
//!
//! A crosswalk maps (source, source id) pairs to canonical ids. Entries are
//! only ever added or re-pointed onto another canonical id; nothing is
//! removed, so identities never split.

use crate::error::PipelineResult;
use crate::types::SourceTag;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// One (source, source id) → canonical id mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrosswalkEntry {
    pub source: SourceTag,
    pub source_id: String,
}

/// Persistent store for crosswalk entries
#[async_trait]
pub trait CrosswalkStore: Send + Sync {
    /// Canonical id mapped to a pair, if any
    async fn lookup(&self, source: SourceTag, source_id: &str) -> PipelineResult<Option<String>>;

    /// Record a pair under `canonical_id`; existing pairs are left as they are
    async fn link(
        &self,
        canonical_id: &str,
        entity_type: &str,
        source: SourceTag,
        source_id: &str,
    ) -> PipelineResult<()>;

    /// Move every pair of `from` onto `to`
    async fn repoint(&self, from: &str, to: &str) -> PipelineResult<()>;

    /// All pairs recorded under `canonical_id`, sorted
    async fn entries(&self, canonical_id: &str) -> PipelineResult<Vec<CrosswalkEntry>>;
}

/// In-memory crosswalk (tests, dry runs)
#[derive(Debug, Default)]
pub struct MemoryCrosswalk {
    // (source, source_id) → (canonical_id, entity_type)
    map: RwLock<HashMap<(SourceTag, String), (String, String)>>,
}

impl MemoryCrosswalk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CrosswalkStore for MemoryCrosswalk {
    async fn lookup(&self, source: SourceTag, source_id: &str) -> PipelineResult<Option<String>> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        Ok(map
            .get(&(source, source_id.to_string()))
            .map(|(canonical, _)| canonical.clone()))
    }

    async fn link(
        &self,
        canonical_id: &str,
        entity_type: &str,
        source: SourceTag,
        source_id: &str,
    ) -> PipelineResult<()> {
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.entry((source, source_id.to_string()))
            .or_insert_with(|| (canonical_id.to_string(), entity_type.to_string()));
        Ok(())
    }

    async fn repoint(&self, from: &str, to: &str) -> PipelineResult<()> {
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        for (canonical, _) in map.values_mut() {
            if canonical == from {
                *canonical = to.to_string();
            }
        }
        Ok(())
    }

    async fn entries(&self, canonical_id: &str) -> PipelineResult<Vec<CrosswalkEntry>> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<CrosswalkEntry> = map
            .iter()
            .filter(|(_, (canonical, _))| canonical == canonical_id)
            .map(|((source, source_id), _)| CrosswalkEntry {
                source: *source,
                source_id: source_id.clone(),
            })
            .collect();
        entries.sort_by(|a, b| (a.source, &a.source_id).cmp(&(b.source, &b.source_id)));
        Ok(entries)
    }
}
