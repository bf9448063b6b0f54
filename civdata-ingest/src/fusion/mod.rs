// Fusion Module - merge per-source records into one enriched representative
//
// Source records → record_merger (field precedence, collection union)
//                → quality_scorer (coverage-weighted confidence)
//                → cross_reference (name/party conflicts for review)

pub mod cross_reference;
pub mod quality_scorer;
pub mod record_merger;

pub use cross_reference::{cross_reference, ConflictReport};
pub use quality_scorer::{QualityScorer, MIN_CONFIDENCE_FLOOR, VERIFIED_THRESHOLD};
pub use record_merger::RecordMerger;

use crate::identity::CrosswalkEntry;
use crate::types::{
    Activity, CommitteeRole, Contact, FinanceSummary, JurisdictionLevel, Photo, SocialHandle,
    SourceIds, SourceTag,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality scores, all on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    /// Always within [MIN_CONFIDENCE_FLOOR, 100]
    pub overall_confidence: f64,
    pub primary_source_score: f64,
    pub secondary_source_score: f64,
    /// Descriptive only
    pub data_completeness: f64,
    /// Descriptive only
    pub source_reliability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Unverified,
}

impl VerificationStatus {
    pub fn from_confidence(overall: f64) -> Self {
        if overall >= VERIFIED_THRESHOLD {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Unverified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Unverified => "unverified",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verified" => Ok(VerificationStatus::Verified),
            "unverified" => Ok(VerificationStatus::Unverified),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

/// Merged representative record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRepresentative {
    /// Canonical id, stable across runs
    pub id: String,
    pub name: String,
    pub office: String,
    pub level: JurisdictionLevel,
    pub state: String,
    pub district: Option<String>,

    pub party: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub photo_url: Option<String>,
    pub identifiers: SourceIds,

    pub biography: Option<String>,
    pub committees: Vec<CommitteeRole>,
    pub finance: Option<FinanceSummary>,

    pub contacts: Vec<Contact>,
    pub photos: Vec<Photo>,
    pub activity: Vec<Activity>,
    pub social_media: Vec<SocialHandle>,

    pub data_sources: Vec<SourceTag>,
    pub data_quality: DataQuality,
    pub verification_status: VerificationStatus,
    pub conflicts: Vec<ConflictReport>,
    pub crosswalk_entries: Vec<CrosswalkEntry>,
    /// Canonical id came from the name-based fallback
    pub identity_degraded: bool,
    pub last_verified: DateTime<Utc>,
}

impl EnrichedRepresentative {
    /// Quality score used for persistence precedence
    pub fn quality_score(&self) -> f64 {
        self.data_quality.overall_confidence
    }
}
