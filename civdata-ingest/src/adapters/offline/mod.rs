//! Offline OpenStates dataset adapter
//!
//! Reads a pre-downloaded people dataset from local storage. A missing root
//! or jurisdiction directory is a normal outcome and yields no record. Each
//! jurisdiction is parsed at most once per run; the parsed index lives in the
//! run's [`JurisdictionCache`].

pub mod dataset;

use crate::context::RunContext;
use crate::eligibility::EligibilityPolicy;
use crate::types::{
    non_blank, Activity, ActivityKind, AdapterError, ConfidenceTier, Contact, ContactKind, Photo,
    RosterEntry, SocialHandle, SourceAdapter, SourceDetail, SourceRecord, SourceTag,
};
use async_trait::async_trait;
use dataset::{load_jurisdiction, DatasetPerson, JurisdictionIndex};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Processed-jurisdictions memo (per run)
///
/// Absent jurisdictions are remembered as `None` so the directory is probed
/// once.
#[derive(Debug, Default)]
pub struct JurisdictionCache {
    inner: Mutex<HashMap<String, Option<Arc<JurisdictionIndex>>>>,
}

impl JurisdictionCache {
    /// Cached index for `state`, loading it with `load` on first use
    ///
    /// The lock is held across the load so concurrent callers for the same
    /// run never parse a jurisdiction twice.
    pub async fn get_or_load<F, Fut>(
        &self,
        state: &str,
        load: F,
    ) -> Result<Option<Arc<JurisdictionIndex>>, AdapterError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Option<JurisdictionIndex>, AdapterError>>,
    {
        let mut guard = self.inner.lock().await;
        if let Some(cached) = guard.get(state) {
            return Ok(cached.clone());
        }
        let loaded = load().await?.map(Arc::new);
        guard.insert(state.to_string(), loaded.clone());
        Ok(loaded)
    }

    /// Jurisdictions processed so far, sorted
    pub async fn processed(&self) -> Vec<String> {
        let mut states: Vec<String> = self.inner.lock().await.keys().cloned().collect();
        states.sort();
        states
    }
}

/// OpenStates people dataset adapter
pub struct OfflineDatasetAdapter {
    root: Option<PathBuf>,
    policy: Arc<EligibilityPolicy>,
}

impl OfflineDatasetAdapter {
    /// Create adapter; `root = None` disables the source quietly
    pub fn new(root: Option<PathBuf>, policy: Arc<EligibilityPolicy>) -> Self {
        Self { root, policy }
    }

    async fn index_for(
        &self,
        state: &str,
        run: &RunContext,
    ) -> Result<Option<Arc<JurisdictionIndex>>, AdapterError> {
        let Some(root) = self.root.clone() else {
            return Ok(None);
        };
        let policy = Arc::clone(&self.policy);
        let state_owned = state.to_string();
        let now = run.now;

        run.jurisdictions
            .get_or_load(state, || async move {
                tokio::task::spawn_blocking(move || {
                    load_jurisdiction(&root, &state_owned, &policy, now)
                })
                .await
                .map_err(|e| AdapterError::Internal(format!("Dataset load task failed: {e}")))
            })
            .await
    }
}

#[async_trait]
impl SourceAdapter for OfflineDatasetAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::OpenStates
    }

    fn confidence(&self) -> ConfidenceTier {
        ConfidenceTier::High
    }

    async fn fetch(
        &self,
        entry: &RosterEntry,
        run: &RunContext,
    ) -> Result<Option<SourceRecord>, AdapterError> {
        let state = entry.state_code();
        if state.is_empty() {
            return Ok(None);
        }

        let Some(index) = self.index_for(&state, run).await? else {
            return Ok(None);
        };

        let person = index.find(
            entry.ids.openstates_id.as_deref(),
            &entry.name,
            entry.district.as_deref(),
        );

        match person {
            Some(person) => {
                debug!(name = %entry.name, person_id = %person.id, "Dataset match");
                Ok(Some(person_to_record(person)))
            }
            None => Ok(None),
        }
    }
}

fn person_to_record(person: &DatasetPerson) -> SourceRecord {
    const SOURCE: SourceTag = SourceTag::OpenStates;

    let mut record = SourceRecord::new(
        SOURCE,
        ConfidenceTier::High,
        SourceDetail::OpenStates {
            person_id: person.id.clone(),
            role_type: person.role_type.clone(),
            committees: person.committees.clone(),
            stub: person.stub,
        },
    );
    record.source_id = Some(person.id.clone());
    record.name = Some(person.name.clone());
    record.party = non_blank(person.party.clone());
    record.email = non_blank(person.email.clone());
    record.photo_url = non_blank(person.image.clone());
    record.phone = person
        .contact_details
        .iter()
        .find_map(|c| non_blank(c.voice.clone()));
    record.website = person.links.first().map(|l| l.url.clone());

    if let Some(email) = &record.email {
        record.contacts.push(Contact::new(ContactKind::Email, email, SOURCE));
    }
    for detail in &person.contact_details {
        let label = detail.note.clone();
        let items = [
            (ContactKind::Phone, &detail.voice),
            (ContactKind::Fax, &detail.fax),
            (ContactKind::Address, &detail.address),
        ];
        for (kind, value) in items {
            if let Some(value) = non_blank(value.clone()) {
                let mut contact = Contact::new(kind, value, SOURCE);
                contact.label = label.clone();
                record.contacts.push(contact);
            }
        }
    }
    for link in &person.links {
        let mut contact = Contact::new(ContactKind::Website, &link.url, SOURCE);
        contact.label = link.note.clone();
        record.contacts.push(contact);
    }

    if let Some(url) = &record.photo_url {
        record.photos.push(Photo {
            url: url.clone(),
            attribution: None,
            source: SOURCE,
        });
    }

    for (platform, handle) in person.social.handles() {
        record
            .social_media
            .push(SocialHandle::new(platform, handle, SOURCE));
    }

    for role in &person.committees {
        record.activity.push(Activity {
            kind: ActivityKind::Committee,
            title: role.committee.clone(),
            detail: Some(role.role.clone()),
            date: None,
            url: None,
            source: SOURCE,
        });
    }

    record
}
