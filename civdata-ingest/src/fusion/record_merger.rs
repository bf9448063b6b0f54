// Record Merger - Field Precedence and Collection Union
//
// Scalars: first non-empty value in source-priority order
// (Congress.gov → dataset → Google Civic → FEC → Wikipedia).
// Collections: concatenated in record order, provenance kept per item.

use crate::fusion::{
    cross_reference, DataQuality, EnrichedRepresentative, QualityScorer, VerificationStatus,
};
use crate::identity::CanonicalIdentity;
use crate::types::{non_blank, RosterEntry, SourceDetail, SourceRecord, SourceTag};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Combines per-source records for one roster entry
#[derive(Debug, Clone, Default)]
pub struct RecordMerger {
    scorer: QualityScorer,
}

impl RecordMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge source records into an enriched representative
    ///
    /// # Arguments
    /// * `entry` - Roster entry (authoritative for name, office, state, district)
    /// * `identity` - Resolved canonical identity
    /// * `records` - Source records as returned by the adapter runner
    /// * `now` - Run evaluation instant, stamped as `last_verified`
    ///
    /// # Returns
    /// * Enriched representative with quality scores and conflicts
    pub fn merge(
        &self,
        entry: &RosterEntry,
        identity: &CanonicalIdentity,
        records: &[SourceRecord],
        now: DateTime<Utc>,
    ) -> EnrichedRepresentative {
        let level = entry.jurisdiction_level();

        let mut by_priority: Vec<&SourceRecord> = records.iter().collect();
        by_priority.sort_by_key(|r| r.source.priority());

        let mut identifiers = entry.ids.clone();
        for record in &by_priority {
            if let Some(id) = record_identifier(record) {
                identifiers.fill(record.source, id);
            }
        }

        let mut data_sources: Vec<SourceTag> = by_priority
            .iter()
            .filter(|r| r.has_content())
            .map(|r| r.source)
            .collect();
        data_sources.dedup();

        let mut rep = EnrichedRepresentative {
            id: identity.canonical_id.clone(),
            name: entry.name.trim().to_string(),
            office: entry.office.trim().to_string(),
            level,
            state: entry.state.trim().to_uppercase(),
            district: non_blank(entry.district.clone()),

            party: first_scalar(&by_priority, |r| r.party.as_deref())
                .or_else(|| non_blank(entry.party.clone())),
            email: first_scalar(&by_priority, |r| r.email.as_deref()),
            phone: first_scalar(&by_priority, |r| r.phone.as_deref()),
            website: first_scalar(&by_priority, |r| r.website.as_deref()),
            photo_url: first_scalar(&by_priority, |r| r.photo_url.as_deref()),
            identifiers,

            biography: biography(records),
            committees: records
                .iter()
                .flat_map(|r| match &r.detail {
                    SourceDetail::OpenStates { committees, .. } => committees.clone(),
                    _ => Vec::new(),
                })
                .collect(),
            finance: records.iter().find_map(|r| match &r.detail {
                SourceDetail::Fec { finance, .. } => finance.clone(),
                _ => None,
            }),

            contacts: records.iter().flat_map(|r| r.contacts.clone()).collect(),
            photos: records.iter().flat_map(|r| r.photos.clone()).collect(),
            activity: records.iter().flat_map(|r| r.activity.clone()).collect(),
            social_media: records.iter().flat_map(|r| r.social_media.clone()).collect(),

            data_sources,
            data_quality: DataQuality {
                overall_confidence: 0.0,
                primary_source_score: 0.0,
                secondary_source_score: 0.0,
                data_completeness: 0.0,
                source_reliability: 0.0,
            },
            verification_status: VerificationStatus::Unverified,
            conflicts: cross_reference(records),
            crosswalk_entries: identity.crosswalk_entries.clone(),
            identity_degraded: identity.degraded,
            last_verified: now,
        };

        let mut quality = self.scorer.score(level, records);
        quality.data_completeness = self.scorer.data_completeness(&rep);
        rep.verification_status = VerificationStatus::from_confidence(quality.overall_confidence);
        rep.data_quality = quality;

        debug!(
            id = %rep.id,
            sources = rep.data_sources.len(),
            confidence = rep.data_quality.overall_confidence,
            conflicts = rep.conflicts.len(),
            "Merged representative"
        );

        rep
    }
}

fn first_scalar<'a, F>(records: &[&'a SourceRecord], field: F) -> Option<String>
where
    F: Fn(&'a SourceRecord) -> Option<&'a str>,
{
    records
        .iter()
        .filter_map(|r| field(*r))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Identifier a record contributes to the representative's external ids
fn record_identifier(record: &SourceRecord) -> Option<&str> {
    match &record.detail {
        // Committee-only stubs carry a synthetic id
        SourceDetail::OpenStates { stub: true, .. } => None,
        SourceDetail::OpenStates { person_id, .. } => Some(person_id.as_str()),
        SourceDetail::Congress { bioguide_id, .. } => Some(bioguide_id.as_str()),
        SourceDetail::Fec { candidate_id, .. } => Some(candidate_id.as_str()),
        SourceDetail::GoogleCivic { .. } => record.source_id.as_deref(),
        SourceDetail::Wikipedia { .. } => None,
    }
    .filter(|id| !id.trim().is_empty())
}

fn biography(records: &[SourceRecord]) -> Option<String> {
    records.iter().find_map(|r| match &r.detail {
        SourceDetail::Wikipedia { extract, .. } => non_blank(Some(extract.clone())),
        _ => None,
    })
}
