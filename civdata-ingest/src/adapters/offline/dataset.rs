//! OpenStates people dataset loader
//!
//! Layout under the dataset root:
//!
//! ```text
//! data/{state}/legislature/*.yml
//! data/{state}/executive/*.yml
//! data/{state}/municipalities/*.yml
//! data/{state}/committees/*.yml
//! ```
//!
//! Loading is blocking filesystem work; callers run it on the blocking pool.

use crate::eligibility::{EligibilityPolicy, TermFacts};
use crate::names::{names_match, normalize_name};
use crate::types::{deserialize_loose_string, CommitteeRole, EligibilityVerdict};
use chrono::{DateTime, NaiveDate, Utc};
use civdata_common::time::deserialize_loose_date;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Person sub-collections, in load order
pub const PERSON_DIRS: [&str; 3] = ["legislature", "executive", "municipalities"];

/// Committee sub-collection
pub const COMMITTEE_DIR: &str = "committees";

// ============================================================================
// YAML shapes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PersonFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub party: Vec<PartyEntry>,
    #[serde(default)]
    pub roles: Vec<RoleEntry>,
    #[serde(default)]
    pub contact_details: Vec<ContactDetail>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
    #[serde(default)]
    pub ids: SocialIds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartyEntry {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_loose_date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleEntry {
    #[serde(rename = "type", default)]
    pub role_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_loose_date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactDetail {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub voice: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub fax: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkEntry {
    pub url: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SocialIds {
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
}

impl SocialIds {
    pub fn handles(&self) -> Vec<(&'static str, &str)> {
        [
            ("twitter", self.twitter.as_deref()),
            ("facebook", self.facebook.as_deref()),
            ("youtube", self.youtube.as_deref()),
            ("instagram", self.instagram.as_deref()),
        ]
        .into_iter()
        .filter_map(|(platform, handle)| handle.map(|h| (platform, h)))
        .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitteeFile {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub members: Vec<CommitteeMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitteeMember {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub person_id: Option<String>,
}

// ============================================================================
// Loaded index
// ============================================================================

/// A person as seen by the pipeline after eligibility filtering
#[derive(Debug, Clone)]
pub struct DatasetPerson {
    pub id: String,
    pub name: String,
    pub party: Option<String>,
    pub district: Option<String>,
    pub role_type: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub contact_details: Vec<ContactDetail>,
    pub links: Vec<LinkEntry>,
    pub social: SocialIds,
    pub committees: Vec<CommitteeRole>,
    /// Known only from committee membership
    pub stub: bool,
    pub verdict: Option<EligibilityVerdict>,
}

impl DatasetPerson {
    fn from_file(file: PersonFile, verdict: EligibilityVerdict) -> Self {
        let current_role = latest_role(&file.roles).cloned();
        let party = file
            .party
            .iter()
            .find(|p| p.end_date.is_none())
            .or_else(|| file.party.last())
            .map(|p| p.name.clone());

        Self {
            id: file.id,
            name: file.name,
            party,
            district: current_role.as_ref().and_then(|r| r.district.clone()),
            role_type: current_role.and_then(|r| r.role_type),
            email: file.email,
            image: file.image,
            contact_details: file.contact_details,
            links: file.links,
            social: file.ids,
            committees: Vec::new(),
            stub: false,
            verdict: Some(verdict),
        }
    }

    fn stub(id: String, name: String, role: CommitteeRole) -> Self {
        Self {
            id,
            name,
            party: None,
            district: None,
            role_type: None,
            email: None,
            image: None,
            contact_details: Vec::new(),
            links: Vec::new(),
            social: SocialIds::default(),
            committees: vec![role],
            stub: true,
            verdict: None,
        }
    }
}

/// Current persons of one jurisdiction
#[derive(Debug, Clone, Default)]
pub struct JurisdictionIndex {
    pub state: String,
    pub persons: Vec<DatasetPerson>,
    /// Persons dropped by the eligibility checker
    pub excluded: usize,
}

impl JurisdictionIndex {
    /// Find the person for a roster entry
    ///
    /// Exact OpenStates id wins; otherwise a name match, preferring a full
    /// person over a stub and a matching district when both sides have one.
    pub fn find(
        &self,
        openstates_id: Option<&str>,
        name: &str,
        district: Option<&str>,
    ) -> Option<&DatasetPerson> {
        if let Some(id) = openstates_id {
            if let Some(person) = self.persons.iter().find(|p| p.id == id) {
                return Some(person);
            }
        }

        let district_ok = |p: &DatasetPerson| match (district, p.district.as_deref()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => true,
        };

        let mut candidates: Vec<&DatasetPerson> = self
            .persons
            .iter()
            .filter(|p| names_match(&p.name, name) && district_ok(p))
            .collect();
        candidates.sort_by_key(|p| p.stub);
        candidates.into_iter().next()
    }
}

/// Role with the latest start date (roles without dates sort first)
fn latest_role(roles: &[RoleEntry]) -> Option<&RoleEntry> {
    roles.iter().max_by_key(|r| r.start_date)
}

fn yaml_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error accessing dataset entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
        })
        .collect();
    files.sort();
    files
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_yaml::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping malformed dataset file {}: {}", path.display(), e);
            None
        }
    }
}

/// Load one jurisdiction from disk
///
/// # Returns
/// * `None` - jurisdiction directory absent (normal "no data" outcome)
/// * `Some(index)` - current persons, with committee roles merged in
pub fn load_jurisdiction(
    root: &Path,
    state: &str,
    policy: &EligibilityPolicy,
    now: DateTime<Utc>,
) -> Option<JurisdictionIndex> {
    let state_dir = root.join("data").join(state);
    if !state_dir.is_dir() {
        debug!(state, "No dataset directory for jurisdiction");
        return None;
    }

    let mut index = JurisdictionIndex {
        state: state.to_string(),
        ..Default::default()
    };
    let mut excluded = ExcludedPersons::default();

    for sub in PERSON_DIRS {
        for path in yaml_files(&state_dir.join(sub)) {
            let Some(file) = read_yaml::<PersonFile>(&path) else {
                continue;
            };

            let role = latest_role(&file.roles);
            let facts = TermFacts {
                name: &file.name,
                term_start: role.and_then(|r| r.start_date),
                term_end: role.and_then(|r| r.end_date),
                next_election: None,
                last_updated: None,
            };
            let verdict = policy.evaluate_facts(&facts, now);

            if verdict.is_current {
                index.persons.push(DatasetPerson::from_file(file, verdict));
            } else {
                debug!(person = %file.name, reason = %verdict.reason, "Dataset person not current");
                excluded.names.insert(normalize_name(&file.name));
                excluded.ids.insert(file.id);
                index.excluded += 1;
            }
        }
    }

    for path in yaml_files(&state_dir.join(COMMITTEE_DIR)) {
        if let Some(committee) = read_yaml::<CommitteeFile>(&path) {
            merge_committee(&mut index, &committee, &excluded);
        }
    }

    debug!(
        state,
        persons = index.persons.len(),
        excluded = index.excluded,
        "Loaded dataset jurisdiction"
    );
    Some(index)
}

/// Person files rejected as not current, by id and by normalized name
#[derive(Debug, Default)]
struct ExcludedPersons {
    ids: HashSet<String>,
    names: HashSet<String>,
}

/// Append committee roles to known persons; stub the rest
///
/// Members naming an excluded person (by id, or by name when the committee
/// entry has no id and no current person matches) are dropped, never stubbed.
fn merge_committee(
    index: &mut JurisdictionIndex,
    committee: &CommitteeFile,
    excluded: &ExcludedPersons,
) {
    let committee_key = committee
        .id
        .clone()
        .unwrap_or_else(|| normalize_name(&committee.name).replace(' ', "-"));

    for member in &committee.members {
        if member
            .person_id
            .as_ref()
            .is_some_and(|id| excluded.ids.contains(id))
        {
            continue;
        }
        let member_name = normalize_name(&member.name);

        let role = CommitteeRole {
            committee: committee.name.clone(),
            committee_id: committee.id.clone(),
            role: member.role.clone().unwrap_or_else(|| "member".to_string()),
        };

        let existing = match &member.person_id {
            Some(id) => index.persons.iter_mut().find(|p| &p.id == id),
            None => index
                .persons
                .iter_mut()
                .find(|p| normalize_name(&p.name) == member_name),
        };

        match existing {
            Some(person) => person.committees.push(role),
            None if member.person_id.is_none() && excluded.names.contains(&member_name) => {
                debug!(member = %member.name, committee = %committee.name, "Committee member is a non-current person");
            }
            None => {
                let id = member.person_id.clone().unwrap_or_else(|| {
                    format!(
                        "stub:{}:{}",
                        committee_key,
                        member_name.replace(' ', "-")
                    )
                });
                index
                    .persons
                    .push(DatasetPerson::stub(id, member.name.clone(), role));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_person_file_parses_numeric_district() {
        let yaml = r#"
id: ocd-person/1
name: Jane Doe
party:
  - name: Democratic
roles:
  - type: upper
    district: 12
    start_date: 2023-01-03
    end_date: 2027-01-03
contact_details:
  - note: Capitol Office
    voice: 916-555-0100
ids:
  twitter: janedoe
"#;
        let person: PersonFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(person.roles[0].district.as_deref(), Some("12"));
        assert_eq!(person.roles[0].start_date, NaiveDate::from_ymd_opt(2023, 1, 3));
        assert_eq!(person.ids.handles(), vec![("twitter", "janedoe")]);
    }

    #[test]
    fn test_latest_role() {
        let roles = vec![
            RoleEntry {
                role_type: Some("lower".into()),
                district: Some("3".into()),
                start_date: NaiveDate::from_ymd_opt(2015, 1, 1),
                end_date: NaiveDate::from_ymd_opt(2019, 1, 1),
            },
            RoleEntry {
                role_type: Some("upper".into()),
                district: Some("12".into()),
                start_date: NaiveDate::from_ymd_opt(2019, 1, 1),
                end_date: None,
            },
        ];
        assert_eq!(latest_role(&roles).unwrap().role_type.as_deref(), Some("upper"));
    }

    #[test]
    fn test_committee_merge_appends_and_stubs() {
        let mut index = JurisdictionIndex {
            state: "ca".into(),
            persons: vec![DatasetPerson::stub(
                "ocd-person/1".into(),
                "Jane Doe".into(),
                CommitteeRole {
                    committee: "Rules".into(),
                    committee_id: None,
                    role: "chair".into(),
                },
            )],
            excluded: 0,
        };
        let committee = CommitteeFile {
            id: Some("ocd-organization/9".into()),
            name: "Budget".into(),
            members: vec![
                CommitteeMember {
                    name: "Jane Doe".into(),
                    role: None,
                    person_id: Some("ocd-person/1".into()),
                },
                CommitteeMember {
                    name: "Sam Lee".into(),
                    role: Some("vice chair".into()),
                    person_id: None,
                },
                CommitteeMember {
                    name: "Old Timer".into(),
                    role: None,
                    person_id: Some("ocd-person/old".into()),
                },
            ],
        };
        let excluded = ExcludedPersons {
            ids: ["ocd-person/old".to_string()].into_iter().collect(),
            names: ["old timer".to_string()].into_iter().collect(),
        };

        merge_committee(&mut index, &committee, &excluded);

        assert_eq!(index.persons.len(), 2);
        assert_eq!(index.persons[0].committees.len(), 2);
        assert_eq!(index.persons[0].committees[1].role, "member");
        let stub = &index.persons[1];
        assert!(stub.stub);
        assert_eq!(stub.id, "stub:ocd-organization/9:sam-lee");
        assert_eq!(stub.committees[0].role, "vice chair");
    }

    #[test]
    fn test_expired_person_not_stubbed_from_committee_by_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let state_dir = dir.path().join("data").join("ca");
        std::fs::create_dir_all(state_dir.join("legislature")).unwrap();
        std::fs::create_dir_all(state_dir.join(COMMITTEE_DIR)).unwrap();
        std::fs::write(
            state_dir.join("legislature").join("old-timer.yml"),
            "id: ocd-person/old\nname: Old Timer\nroles:\n  - type: upper\n    district: 4\n    start_date: 2011-01-03\n    end_date: 2015-01-03\n",
        )
        .unwrap();
        std::fs::write(
            state_dir.join(COMMITTEE_DIR).join("budget.yml"),
            "name: Budget\nmembers:\n  - name: Old Timer\n  - name: Sam Lee\n",
        )
        .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let index =
            load_jurisdiction(dir.path(), "ca", &EligibilityPolicy::default(), now).unwrap();

        assert_eq!(index.excluded, 1);
        let names: Vec<&str> = index.persons.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Sam Lee"]);
        assert!(index.persons[0].stub);
    }
}
