//! Core pipeline types
//!
//! Roster input, per-source partial records, and the adapter trait that every
//! data source implements.
//!
//! # Architecture
//! - **Input**: [`RosterEntry`] (loosely typed, immutable)
//! - **Per source**: [`SourceRecord`] with a typed [`SourceDetail`] variant
//! - **Seam**: [`SourceAdapter`] trait, driven by [`crate::adapters::AdapterRunner`]

use crate::context::RunContext;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use civdata_common::time::{deserialize_loose_date, deserialize_loose_timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Sources
// ============================================================================

/// External data source tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceTag {
    /// Offline OpenStates people dataset
    #[serde(rename = "openstates")]
    OpenStates,
    /// Congress.gov v3 member API
    #[serde(rename = "congress_gov")]
    CongressGov,
    /// Google Civic Information representatives API
    #[serde(rename = "google_civic")]
    GoogleCivic,
    /// OpenFEC campaign-finance API
    #[serde(rename = "fec")]
    Fec,
    /// Wikipedia REST page summary
    #[serde(rename = "wikipedia")]
    Wikipedia,
}

impl SourceTag {
    /// Scalar-field precedence used by the merger (first non-empty wins)
    pub const MERGE_PRIORITY: [SourceTag; 5] = [
        SourceTag::CongressGov,
        SourceTag::OpenStates,
        SourceTag::GoogleCivic,
        SourceTag::Fec,
        SourceTag::Wikipedia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::OpenStates => "openstates",
            SourceTag::CongressGov => "congress_gov",
            SourceTag::GoogleCivic => "google_civic",
            SourceTag::Fec => "fec",
            SourceTag::Wikipedia => "wikipedia",
        }
    }

    /// Live HTTP source (as opposed to the local dataset)
    pub fn is_live(&self) -> bool {
        !matches!(self, SourceTag::OpenStates)
    }

    /// Position in [`Self::MERGE_PRIORITY`]
    pub fn priority(&self) -> usize {
        Self::MERGE_PRIORITY
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::MERGE_PRIORITY.len())
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openstates" => Ok(SourceTag::OpenStates),
            "congress_gov" => Ok(SourceTag::CongressGov),
            "google_civic" => Ok(SourceTag::GoogleCivic),
            "fec" => Ok(SourceTag::Fec),
            "wikipedia" => Ok(SourceTag::Wikipedia),
            other => Err(format!("unknown source tag: {other}")),
        }
    }
}

/// Confidence tier declared by each adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Numeric weight (0-100) used for the reliability sub-score
    pub fn weight(&self) -> f64 {
        match self {
            ConfidenceTier::High => 100.0,
            ConfidenceTier::Medium => 70.0,
            ConfidenceTier::Low => 40.0,
        }
    }
}

// ============================================================================
// Roster input
// ============================================================================

/// Jurisdiction level of an office
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JurisdictionLevel {
    Federal,
    State,
    Local,
}

impl JurisdictionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            JurisdictionLevel::Federal => "federal",
            JurisdictionLevel::State => "state",
            JurisdictionLevel::Local => "local",
        }
    }

    /// Infer level from office title and known identifiers
    pub fn infer(office: &str, ids: &SourceIds) -> Self {
        let office_lower = office.to_lowercase();

        if ids.bioguide_id.is_some()
            || office.contains("U.S.")
            || office_lower.contains("united states")
            || office_lower.contains("congress")
        {
            return JurisdictionLevel::Federal;
        }

        const LOCAL_MARKERS: [&str; 5] = ["mayor", "city", "county", "council", "municipal"];
        if LOCAL_MARKERS.iter().any(|m| office_lower.contains(m)) {
            return JurisdictionLevel::Local;
        }

        JurisdictionLevel::State
    }
}

impl fmt::Display for JurisdictionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JurisdictionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "federal" => Ok(JurisdictionLevel::Federal),
            "state" => Ok(JurisdictionLevel::State),
            "local" => Ok(JurisdictionLevel::Local),
            other => Err(format!("unknown jurisdiction level: {other}")),
        }
    }
}

/// Known source identifiers for a person
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceIds {
    #[serde(default, alias = "bioguide_id", alias = "bioguide", deserialize_with = "deserialize_loose_string")]
    pub bioguide_id: Option<String>,
    #[serde(default, alias = "fec_id", alias = "fecCandidateId", deserialize_with = "deserialize_loose_string")]
    pub fec_id: Option<String>,
    #[serde(default, alias = "openstates_id", alias = "openStatesId", deserialize_with = "deserialize_loose_string")]
    pub openstates_id: Option<String>,
    #[serde(default, alias = "google_civic_id", deserialize_with = "deserialize_loose_string")]
    pub google_civic_id: Option<String>,
}

impl SourceIds {
    /// Identifier this person carries for `source`, if any
    pub fn get(&self, source: SourceTag) -> Option<&str> {
        match source {
            SourceTag::CongressGov => self.bioguide_id.as_deref(),
            SourceTag::Fec => self.fec_id.as_deref(),
            SourceTag::OpenStates => self.openstates_id.as_deref(),
            SourceTag::GoogleCivic => self.google_civic_id.as_deref(),
            SourceTag::Wikipedia => None,
        }
    }

    /// Fill the slot for `source` if it is still empty
    pub fn fill(&mut self, source: SourceTag, id: &str) {
        let slot = match source {
            SourceTag::CongressGov => &mut self.bioguide_id,
            SourceTag::Fec => &mut self.fec_id,
            SourceTag::OpenStates => &mut self.openstates_id,
            SourceTag::GoogleCivic => &mut self.google_civic_id,
            SourceTag::Wikipedia => return,
        };
        if slot.is_none() && !id.trim().is_empty() {
            *slot = Some(id.to_string());
        }
    }

    /// All (source, id) pairs present
    pub fn pairs(&self) -> Vec<(SourceTag, String)> {
        [
            SourceTag::CongressGov,
            SourceTag::OpenStates,
            SourceTag::GoogleCivic,
            SourceTag::Fec,
        ]
        .into_iter()
        .filter_map(|s| self.get(s).map(|id| (s, id.to_string())))
        .collect()
    }
}

/// One candidate/officeholder from the input roster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub name: String,
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub level: Option<JurisdictionLevel>,
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub party: Option<String>,
    #[serde(default, alias = "term_start", deserialize_with = "deserialize_loose_date")]
    pub term_start: Option<NaiveDate>,
    #[serde(default, alias = "term_end", deserialize_with = "deserialize_loose_date")]
    pub term_end: Option<NaiveDate>,
    #[serde(default, alias = "next_election", deserialize_with = "deserialize_loose_date")]
    pub next_election: Option<NaiveDate>,
    #[serde(
        default,
        alias = "last_updated",
        deserialize_with = "deserialize_loose_timestamp"
    )]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub ids: SourceIds,
}

impl RosterEntry {
    /// Minimal entry (used by tests and the dataset adapter)
    pub fn new(name: impl Into<String>, office: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            office: office.into(),
            state: state.into(),
            ..Default::default()
        }
    }

    /// Explicit level, else inferred from office and identifiers
    pub fn jurisdiction_level(&self) -> JurisdictionLevel {
        self.level
            .unwrap_or_else(|| JurisdictionLevel::infer(&self.office, &self.ids))
    }

    /// Lowercase state code used for dataset paths
    pub fn state_code(&self) -> String {
        self.state.trim().to_lowercase()
    }
}

/// Serde helper: string or number → `Option<String>`, blanks become `None`
pub fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ============================================================================
// Eligibility
// ============================================================================

/// Rule that decided an eligibility verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityRule {
    TermNotStarted,
    TermExpired,
    ElectionTooFar,
    StaleData,
    KnownDeparted,
    Current,
}

/// Whether a person holds office at the evaluation instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityVerdict {
    pub is_current: bool,
    pub reason: String,
    pub evaluated_at: DateTime<Utc>,
    pub rule: EligibilityRule,
}

// ============================================================================
// Source records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Email,
    Phone,
    Fax,
    Address,
    Website,
    Link,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactKind::Email => "email",
            ContactKind::Phone => "phone",
            ContactKind::Fax => "fax",
            ContactKind::Address => "address",
            ContactKind::Website => "website",
            ContactKind::Link => "link",
        }
    }
}

impl FromStr for ContactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ContactKind::Email),
            "phone" => Ok(ContactKind::Phone),
            "fax" => Ok(ContactKind::Fax),
            "address" => Ok(ContactKind::Address),
            "website" => Ok(ContactKind::Website),
            "link" => Ok(ContactKind::Link),
            other => Err(format!("unknown contact kind: {other}")),
        }
    }
}

/// Contact detail with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub kind: ContactKind,
    pub value: String,
    pub label: Option<String>,
    pub source: SourceTag,
}

impl Contact {
    pub fn new(kind: ContactKind, value: impl Into<String>, source: SourceTag) -> Self {
        Self {
            kind,
            value: value.into(),
            label: None,
            source,
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    pub attribution: Option<String>,
    pub source: SourceTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Legislation,
    Committee,
    Finance,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Legislation => "legislation",
            ActivityKind::Committee => "committee",
            ActivityKind::Finance => "finance",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legislation" => Ok(ActivityKind::Legislation),
            "committee" => Ok(ActivityKind::Committee),
            "finance" => Ok(ActivityKind::Finance),
            other => Err(format!("unknown activity kind: {other}")),
        }
    }
}

/// Legislative, committee, or finance activity item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub title: String,
    pub detail: Option<String>,
    pub date: Option<NaiveDate>,
    pub url: Option<String>,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialHandle {
    pub platform: String,
    pub handle: String,
    pub url: Option<String>,
    pub source: SourceTag,
}

impl SocialHandle {
    /// Build a handle with the platform's canonical profile URL when known
    pub fn new(platform: &str, handle: &str, source: SourceTag) -> Self {
        let platform = platform.trim().to_lowercase();
        let handle = handle.trim().trim_start_matches('@').to_string();
        let url = match platform.as_str() {
            "twitter" | "x" => Some(format!("https://twitter.com/{handle}")),
            "facebook" => Some(format!("https://www.facebook.com/{handle}")),
            "youtube" => Some(format!("https://www.youtube.com/{handle}")),
            "instagram" => Some(format!("https://www.instagram.com/{handle}")),
            _ => None,
        };
        Self {
            platform,
            handle,
            url,
            source,
        }
    }
}

/// Committee membership from the offline dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeRole {
    pub committee: String,
    pub committee_id: Option<String>,
    pub role: String,
}

/// Latest-cycle campaign-finance totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceSummary {
    pub cycle: Option<i32>,
    pub receipts: Option<f64>,
    pub disbursements: Option<f64>,
    pub cash_on_hand: Option<f64>,
    pub coverage_end: Option<NaiveDate>,
}

/// Source-specific part of a [`SourceRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDetail {
    OpenStates {
        person_id: String,
        role_type: Option<String>,
        committees: Vec<CommitteeRole>,
        /// Person known only through committee membership
        stub: bool,
    },
    Congress {
        bioguide_id: String,
        chamber: Option<String>,
        sponsored_count: Option<u32>,
        cosponsored_count: Option<u32>,
    },
    GoogleCivic {
        office_name: Option<String>,
        division_id: Option<String>,
    },
    Fec {
        candidate_id: String,
        office: Option<String>,
        finance: Option<FinanceSummary>,
    },
    Wikipedia {
        title: String,
        description: Option<String>,
        extract: String,
        page_url: Option<String>,
    },
}

/// Normalized partial record from one source for one roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: SourceTag,
    pub confidence: ConfidenceTier,
    /// Source-native identifier (bioguide id, FEC candidate id, ...)
    pub source_id: Option<String>,
    pub name: Option<String>,
    pub party: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub photo_url: Option<String>,
    pub contacts: Vec<Contact>,
    pub photos: Vec<Photo>,
    pub activity: Vec<Activity>,
    pub social_media: Vec<SocialHandle>,
    pub detail: SourceDetail,
}

impl SourceRecord {
    pub fn new(source: SourceTag, confidence: ConfidenceTier, detail: SourceDetail) -> Self {
        Self {
            source,
            confidence,
            source_id: None,
            name: None,
            party: None,
            email: None,
            phone: None,
            website: None,
            photo_url: None,
            contacts: Vec::new(),
            photos: Vec::new(),
            activity: Vec::new(),
            social_media: Vec::new(),
            detail,
        }
    }

    /// True when the record contributes at least one field beyond identity
    pub fn has_content(&self) -> bool {
        let scalar = [
            &self.party,
            &self.email,
            &self.phone,
            &self.website,
            &self.photo_url,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()));

        scalar
            || !self.contacts.is_empty()
            || !self.photos.is_empty()
            || !self.activity.is_empty()
            || !self.social_media.is_empty()
            || self.detail_has_content()
    }

    fn detail_has_content(&self) -> bool {
        match &self.detail {
            SourceDetail::OpenStates { committees, .. } => !committees.is_empty(),
            SourceDetail::Congress { .. } => false,
            SourceDetail::GoogleCivic { office_name, .. } => office_name.is_some(),
            SourceDetail::Fec { finance, .. } => finance.is_some(),
            SourceDetail::Wikipedia { extract, .. } => !extract.trim().is_empty(),
        }
    }
}

/// Helper: keep non-blank strings only
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Adapter seam
// ============================================================================

/// Adapter failure (never escapes the adapter runner)
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Connect/timeout/transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON/YAML
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source cannot serve this entry (missing credential, unsupported level)
    #[error("Source not available: {0}")]
    NotAvailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// HTTP status for the failure tracker, if the failure had one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AdapterError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate limiting or provider unavailability
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.status_code(), Some(429) | Some(503))
    }
}

/// One external data source
///
/// Implementations are stateless apart from their HTTP client and rate
/// limiter; shared per-run state lives in [`RunContext`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source tag for provenance and tracker bookkeeping
    fn source(&self) -> SourceTag;

    /// Declared confidence tier of this source
    fn confidence(&self) -> ConfidenceTier;

    /// Fetch this source's view of `entry`
    ///
    /// # Returns
    /// * `Ok(Some(_))` - record found
    /// * `Ok(None)` - source answered, no match
    /// * `Err(AdapterError::NotAvailable)` - source cannot serve this entry
    /// * `Err(_)` - failure (recorded by the runner)
    async fn fetch(
        &self,
        entry: &RosterEntry,
        run: &RunContext,
    ) -> Result<Option<SourceRecord>, AdapterError>;
}
