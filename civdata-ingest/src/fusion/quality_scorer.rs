// Quality Scorer - coverage-weighted confidence for merged records
//
// overall = max(primary, secondary × 0.7), clamped to [MIN_CONFIDENCE_FLOOR, 100]

use crate::fusion::{DataQuality, EnrichedRepresentative};
use crate::types::{JurisdictionLevel, SourceDetail, SourceRecord, SourceTag};

/// Lowest overall confidence ever reported
pub const MIN_CONFIDENCE_FLOOR: f64 = 10.0;

/// Overall confidence at or above which a record is verified
pub const VERIFIED_THRESHOLD: f64 = 70.0;

/// Weight of offline corroboration relative to live sources
pub const OFFLINE_DISCOUNT: f64 = 0.7;

const OFFLINE_MATCH_SCORE: f64 = 80.0;
const OFFLINE_CONTACT_BONUS: f64 = 10.0;
const OFFLINE_COMMITTEE_BONUS: f64 = 10.0;

/// Weight of a live source for a jurisdiction level
///
/// Weights for each level sum to 100.
pub fn source_weight(level: JurisdictionLevel, source: SourceTag) -> f64 {
    use JurisdictionLevel::*;
    use SourceTag::*;

    match (level, source) {
        (Federal, CongressGov) => 45.0,
        (Federal, GoogleCivic) => 25.0,
        (Federal, Fec) => 20.0,
        (Federal, Wikipedia) => 10.0,
        (State, GoogleCivic) => 55.0,
        (State, Fec) => 10.0,
        (State, Wikipedia) => 20.0,
        (Local, GoogleCivic) => 60.0,
        (Local, Fec) => 15.0,
        (Local, Wikipedia) => 25.0,
        // Congress.gov never covers state/local; the dataset is scored separately
        (_, CongressGov) | (_, OpenStates) => 0.0,
    }
}

/// Scores merged records from source coverage
#[derive(Debug, Clone, Default)]
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Weighted sum of live sources that returned data
    pub fn primary_score(&self, level: JurisdictionLevel, records: &[SourceRecord]) -> f64 {
        let mut seen: Vec<SourceTag> = Vec::new();
        let mut score = 0.0;
        for record in records.iter().filter(|r| r.source.is_live() && r.has_content()) {
            if !seen.contains(&record.source) {
                seen.push(record.source);
                score += source_weight(level, record.source);
            }
        }
        score.min(100.0)
    }

    /// Offline-dataset corroboration bonus
    pub fn secondary_score(&self, records: &[SourceRecord]) -> f64 {
        let Some(offline) = records
            .iter()
            .find(|r| r.source == SourceTag::OpenStates && r.has_content())
        else {
            return 0.0;
        };

        let mut score = OFFLINE_MATCH_SCORE;
        if !offline.contacts.is_empty() {
            score += OFFLINE_CONTACT_BONUS;
        }
        let has_committees = match &offline.detail {
            SourceDetail::OpenStates { committees, .. } => !committees.is_empty(),
            _ => false,
        };
        if has_committees {
            score += OFFLINE_COMMITTEE_BONUS;
        }
        score
    }

    /// Mean confidence-tier weight of contributing sources (0 when none)
    pub fn source_reliability(&self, records: &[SourceRecord]) -> f64 {
        let weights: Vec<f64> = records
            .iter()
            .filter(|r| r.has_content())
            .map(|r| r.confidence.weight())
            .collect();
        if weights.is_empty() {
            return 0.0;
        }
        round2(weights.iter().sum::<f64>() / weights.len() as f64)
    }

    /// Share of profile fields populated, 0-100
    pub fn data_completeness(&self, rep: &EnrichedRepresentative) -> f64 {
        let checks = [
            rep.party.is_some(),
            rep.email.is_some(),
            rep.phone.is_some(),
            rep.website.is_some(),
            rep.photo_url.is_some(),
            rep.biography.is_some(),
            !rep.contacts.is_empty(),
            !rep.photos.is_empty(),
            !rep.activity.is_empty(),
            !rep.social_media.is_empty(),
        ];
        let filled = checks.iter().filter(|c| **c).count();
        round2(filled as f64 / checks.len() as f64 * 100.0)
    }

    /// Combine sub-scores; completeness is filled in by the merger
    pub fn score(&self, level: JurisdictionLevel, records: &[SourceRecord]) -> DataQuality {
        let primary = self.primary_score(level, records);
        let secondary = self.secondary_score(records);
        let overall = primary
            .max(secondary * OFFLINE_DISCOUNT)
            .clamp(MIN_CONFIDENCE_FLOOR, 100.0);

        DataQuality {
            overall_confidence: round2(overall),
            primary_source_score: round2(primary),
            secondary_source_score: round2(secondary),
            data_completeness: 0.0,
            source_reliability: self.source_reliability(records),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
