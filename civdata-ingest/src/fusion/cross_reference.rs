// Cross Reference - Name and Party Agreement Between Sources
//
// Mismatches are flagged for manual review, never rejected.

use crate::names::{name_similarity, names_match};
use crate::types::{SourceRecord, SourceTag};
use serde::{Deserialize, Serialize};

/// Name similarity below which two sources disagree
pub const NAME_CONFLICT_THRESHOLD: f64 = 0.85;

/// One disagreement between two sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    /// "name" or "party"
    pub field: String,
    pub source1: SourceTag,
    pub value1: String,
    pub source2: SourceTag,
    pub value2: String,
    /// Name similarity (None for party)
    pub similarity: Option<f64>,
}

/// Compare every pair of source records
///
/// # Arguments
/// * `records` - Source records in merge order
///
/// # Returns
/// * Conflicts in pair order (earlier record first)
pub fn cross_reference(records: &[SourceRecord]) -> Vec<ConflictReport> {
    let mut conflicts = Vec::new();

    for (i, a) in records.iter().enumerate() {
        for b in &records[i + 1..] {
            if a.source == b.source {
                continue;
            }
            if let Some(conflict) = check_name(a, b) {
                conflicts.push(conflict);
            }
            if let Some(conflict) = check_party(a, b) {
                conflicts.push(conflict);
            }
        }
    }

    conflicts
}

fn check_name(a: &SourceRecord, b: &SourceRecord) -> Option<ConflictReport> {
    let (name1, name2) = (a.name.as_deref()?, b.name.as_deref()?);
    if names_match(name1, name2) {
        return None;
    }

    let similarity = name_similarity(name1, name2);
    if similarity >= NAME_CONFLICT_THRESHOLD {
        return None;
    }

    Some(ConflictReport {
        field: "name".to_string(),
        source1: a.source,
        value1: name1.to_string(),
        source2: b.source,
        value2: name2.to_string(),
        similarity: Some((similarity * 100.0).round() / 100.0),
    })
}

fn check_party(a: &SourceRecord, b: &SourceRecord) -> Option<ConflictReport> {
    let (party1, party2) = (a.party.as_deref()?, b.party.as_deref()?);
    let (norm1, norm2) = (normalize_party(party1)?, normalize_party(party2)?);
    if norm1 == norm2 {
        return None;
    }

    Some(ConflictReport {
        field: "party".to_string(),
        source1: a.source,
        value1: party1.to_string(),
        source2: b.source,
        value2: party2.to_string(),
        similarity: None,
    })
}

/// Canonical party key: "D", "Democrat", "Democratic Party" → "democratic"
pub fn normalize_party(party: &str) -> Option<String> {
    let lower = party.trim().to_lowercase();
    let lower = lower.trim_end_matches(" party").trim();
    if lower.is_empty() || lower == "unknown" {
        return None;
    }

    let canonical = match lower {
        "d" | "dem" | "democrat" | "democratic" => "democratic",
        "r" | "rep" | "gop" | "republican" => "republican",
        "i" | "ind" | "independent" | "nonpartisan" => "independent",
        "l" | "lib" | "libertarian" => "libertarian",
        "g" | "grn" | "green" => "green",
        other => other,
    };
    Some(canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfidenceTier, SourceDetail};

    fn record(source: SourceTag, name: &str, party: Option<&str>) -> SourceRecord {
        let mut r = SourceRecord::new(
            source,
            ConfidenceTier::Medium,
            SourceDetail::GoogleCivic {
                office_name: None,
                division_id: None,
            },
        );
        r.name = Some(name.to_string());
        r.party = party.map(str::to_string);
        r
    }

    #[test]
    fn test_name_variants_agree() {
        let records = vec![
            record(SourceTag::CongressGov, "Jane Doe", None),
            record(SourceTag::Fec, "DOE, JANE M.", None),
        ];
        assert!(cross_reference(&records).is_empty());
    }

    #[test]
    fn test_different_names_flagged() {
        let records = vec![
            record(SourceTag::GoogleCivic, "Jane Doe", None),
            record(SourceTag::Wikipedia, "Robert Smith", None),
        ];
        let conflicts = cross_reference(&records);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].field, "name");
        assert_eq!(conflicts[0].source1, SourceTag::GoogleCivic);
        assert!(conflicts[0].similarity.unwrap() < NAME_CONFLICT_THRESHOLD);
    }

    #[test]
    fn test_party_abbreviations_agree() {
        let records = vec![
            record(SourceTag::CongressGov, "Jane Doe", Some("D")),
            record(SourceTag::GoogleCivic, "Jane Doe", Some("Democratic Party")),
            record(SourceTag::Fec, "Jane Doe", Some("DEMOCRAT")),
        ];
        assert!(cross_reference(&records).is_empty());
    }

    #[test]
    fn test_party_mismatch_flagged_per_pair() {
        let records = vec![
            record(SourceTag::CongressGov, "Jane Doe", Some("Democratic")),
            record(SourceTag::GoogleCivic, "Jane Doe", Some("Republican")),
            record(SourceTag::Fec, "Jane Doe", Some("REP")),
        ];
        let conflicts = cross_reference(&records);
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts.iter().all(|c| c.field == "party"));
    }
}
