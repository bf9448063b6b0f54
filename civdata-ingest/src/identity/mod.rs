//! Entity resolution
//!
//! Maps the source-specific identifiers seen for one person onto a single
//! canonical id, growing the crosswalk as new identifiers appear.
//!
//! # Algorithm
//! 1. Look up every (source, source id) pair in the crosswalk
//! 2. Matches found: the first canonical id found is the anchor; other
//!    canonical ids are re-pointed onto it (union, never split)
//! 3. No match: mint a deterministic canonical id from the first pair
//! 4. Record every pair under the canonical id
//!
//! A store failure (or an empty identifier list) falls back to an id derived
//! from normalized name + state + district, without touching the crosswalk.

pub mod crosswalk;

pub use crosswalk::{CrosswalkEntry, CrosswalkStore, MemoryCrosswalk};

use crate::error::{PipelineError, PipelineResult};
use crate::names::normalize_name;
use crate::types::{RosterEntry, SourceTag};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hex characters kept from the digest
const ID_HEX_LEN: usize = 16;

/// One identifier observed for an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIdentifier {
    pub source: SourceTag,
    pub source_id: String,
    /// Name as the source reported it (evidence only)
    pub observed_name: Option<String>,
}

impl SourceIdentifier {
    pub fn new(source: SourceTag, source_id: impl Into<String>) -> Self {
        Self {
            source,
            source_id: source_id.into(),
            observed_name: None,
        }
    }
}

/// Resolved identity for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    pub canonical_id: String,
    pub entity_type: String,
    pub crosswalk_entries: Vec<CrosswalkEntry>,
    /// Fallback id used; crosswalk not consulted
    pub degraded: bool,
}

/// Canonicalizer backed by a [`CrosswalkStore`]
#[derive(Clone)]
pub struct EntityResolver {
    store: Arc<dyn CrosswalkStore>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn CrosswalkStore>) -> Self {
        Self { store }
    }

    /// Resolve identifiers to a canonical identity
    ///
    /// # Errors
    /// * `Resolution` - empty identifier list or crosswalk failure
    pub async fn resolve(
        &self,
        entity_type: &str,
        identifiers: &[SourceIdentifier],
    ) -> PipelineResult<CanonicalIdentity> {
        let pairs = dedup_pairs(identifiers);
        let Some((first_source, first_id)) = pairs.first() else {
            return Err(PipelineError::Resolution("no source identifiers".to_string()));
        };

        let mut found: Vec<String> = Vec::new();
        for (source, source_id) in &pairs {
            if let Some(canonical) = self.store.lookup(*source, source_id).await? {
                if !found.contains(&canonical) {
                    found.push(canonical);
                }
            }
        }

        let canonical_id = match found.first() {
            Some(anchor) => anchor.clone(),
            None => {
                let minted = mint_id(entity_type, *first_source, first_id);
                debug!(canonical_id = %minted, "Minted canonical id");
                minted
            }
        };

        for other in found.iter().skip(1) {
            info!(from = %other, to = %canonical_id, "Merging canonical identities");
            self.store.repoint(other, &canonical_id).await?;
        }

        for (source, source_id) in &pairs {
            self.store
                .link(&canonical_id, entity_type, *source, source_id)
                .await?;
        }

        let crosswalk_entries = self.store.entries(&canonical_id).await?;

        Ok(CanonicalIdentity {
            canonical_id,
            entity_type: entity_type.to_string(),
            crosswalk_entries,
            degraded: false,
        })
    }

    /// Resolve, degrading to the name-derived id instead of failing
    pub async fn resolve_or_fallback(
        &self,
        entity_type: &str,
        identifiers: &[SourceIdentifier],
        entry: &RosterEntry,
    ) -> CanonicalIdentity {
        if identifiers.is_empty() {
            return fallback_identity(entity_type, entry, false);
        }

        match self.resolve(entity_type, identifiers).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(name = %entry.name, error = %e, "Entity resolution failed; using fallback id");
                fallback_identity(entity_type, entry, true)
            }
        }
    }
}

fn dedup_pairs(identifiers: &[SourceIdentifier]) -> Vec<(SourceTag, String)> {
    let mut pairs: Vec<(SourceTag, String)> = Vec::new();
    for id in identifiers {
        let source_id = id.source_id.trim();
        if source_id.is_empty() {
            continue;
        }
        let pair = (id.source, source_id.to_string());
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}

fn short_digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f_u8]);
    }
    let hex = format!("{:x}", hasher.finalize());
    hex[..ID_HEX_LEN].to_string()
}

/// Deterministic canonical id for a first-seen pair
pub fn mint_id(entity_type: &str, source: SourceTag, source_id: &str) -> String {
    format!(
        "{entity_type}_{}",
        short_digest(&[entity_type, source.as_str(), source_id])
    )
}

/// Deterministic id from normalized name, state, and district
pub fn fallback_id(entity_type: &str, entry: &RosterEntry) -> String {
    let name = normalize_name(&entry.name);
    let state = entry.state_code();
    let district = entry
        .district
        .as_deref()
        .map(|d| d.trim().to_lowercase())
        .unwrap_or_default();
    format!(
        "{entity_type}_fb_{}",
        short_digest(&[entity_type, &name, &state, &district])
    )
}

fn fallback_identity(entity_type: &str, entry: &RosterEntry, degraded: bool) -> CanonicalIdentity {
    CanonicalIdentity {
        canonical_id: fallback_id(entity_type, entry),
        entity_type: entity_type.to_string(),
        crosswalk_entries: Vec::new(),
        degraded,
    }
}
