//! Google Civic Information representatives adapter
//!
//! Looks up the officials of a division by address query ("district, state",
//! then "state") or by a known OCD division id, and picks the official whose
//! name matches the roster entry.

use super::http::{build_client, endpoint, get_json, rate_limiter, HttpSettings, SourceRateLimiter};
use crate::context::RunContext;
use crate::names::{names_match, normalize_name};
use crate::types::{
    non_blank, AdapterError, ConfidenceTier, Contact, ContactKind, Photo, RosterEntry,
    SocialHandle, SourceAdapter, SourceDetail, SourceRecord, SourceTag,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Google Civic Information API base URL
pub const GOOGLE_CIVIC_API_URL: &str = "https://www.googleapis.com/civicinfo/v2";

/// Separator between division id and person slug in our source ids
const ID_SEPARATOR: char = '#';

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RepresentativesResponse {
    offices: Vec<Office>,
    officials: Vec<Official>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Office {
    name: String,
    division_id: Option<String>,
    official_indices: Vec<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Official {
    name: String,
    party: Option<String>,
    phones: Vec<String>,
    urls: Vec<String>,
    emails: Vec<String>,
    photo_url: Option<String>,
    channels: Vec<Channel>,
    address: Vec<PostalAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Channel {
    #[serde(rename = "type")]
    channel_type: String,
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PostalAddress {
    line1: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
}

impl PostalAddress {
    fn formatted(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.line1, &self.city, &self.state, &self.zip]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Google Civic adapter
pub struct GoogleCivicAdapter {
    client: Client,
    rate_limiter: SourceRateLimiter,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleCivicAdapter {
    pub fn new(api_key: Option<String>, settings: &HttpSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            client: build_client(settings)?,
            rate_limiter: rate_limiter(settings.requests_per_second),
            api_key,
            base_url: GOOGLE_CIVIC_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Address queries, most specific first
    fn address_variants(entry: &RosterEntry) -> Vec<String> {
        let state = entry.state.trim();
        let mut variants = Vec::new();
        if let Some(district) = entry.district.as_deref() {
            if !state.is_empty() {
                variants.push(format!("{district}, {state}"));
            }
        }
        if !state.is_empty() {
            variants.push(state.to_string());
        }
        variants
    }

    async fn query_division(&self, key: &str, division: &str) -> Result<Option<RepresentativesResponse>, AdapterError> {
        let url = endpoint(&self.base_url, &["representatives", division])?;
        tolerate_lookup_miss(get_json(&self.client, &self.rate_limiter, url, &[("key", key)]).await)
    }

    async fn query_address(&self, key: &str, address: &str) -> Result<Option<RepresentativesResponse>, AdapterError> {
        let url = endpoint(&self.base_url, &["representatives"])?;
        tolerate_lookup_miss(
            get_json(
                &self.client,
                &self.rate_limiter,
                url,
                &[("address", address), ("key", key)],
            )
            .await,
        )
    }
}

/// 400/404 mean the query did not resolve; try the next variant
fn tolerate_lookup_miss<T>(result: Result<T, AdapterError>) -> Result<Option<T>, AdapterError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AdapterError::Status { status: 400 | 404, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl SourceAdapter for GoogleCivicAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::GoogleCivic
    }

    fn confidence(&self) -> ConfidenceTier {
        ConfidenceTier::Medium
    }

    async fn fetch(
        &self,
        entry: &RosterEntry,
        _run: &RunContext,
    ) -> Result<Option<SourceRecord>, AdapterError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(AdapterError::NotAvailable("no Google Civic API key".to_string()));
        };

        if let Some(known) = entry.ids.google_civic_id.as_deref() {
            let division = known.split(ID_SEPARATOR).next().unwrap_or(known);
            if let Some(response) = self.query_division(key, division).await? {
                if let Some(record) = pick_official(&response, &entry.name) {
                    return Ok(Some(record));
                }
            }
        }

        for address in Self::address_variants(entry) {
            let Some(response) = self.query_address(key, &address).await? else {
                debug!(name = %entry.name, %address, "Civic address variant did not resolve");
                continue;
            };
            if let Some(record) = pick_official(&response, &entry.name) {
                return Ok(Some(record));
            }
        }

        Ok(None)
    }
}

fn pick_official(response: &RepresentativesResponse, name: &str) -> Option<SourceRecord> {
    let (index, official) = response
        .officials
        .iter()
        .enumerate()
        .find(|(_, o)| names_match(&o.name, name))?;
    let office = response
        .offices
        .iter()
        .find(|o| o.official_indices.contains(&index));
    Some(official_to_record(official, office))
}

fn official_to_record(official: &Official, office: Option<&Office>) -> SourceRecord {
    const SOURCE: SourceTag = SourceTag::GoogleCivic;

    let division_id = office.and_then(|o| o.division_id.clone());
    let mut record = SourceRecord::new(
        SOURCE,
        ConfidenceTier::Medium,
        SourceDetail::GoogleCivic {
            office_name: office.map(|o| o.name.clone()).filter(|n| !n.is_empty()),
            division_id: division_id.clone(),
        },
    );

    // Division ids are shared by every official of a district
    let slug = normalize_name(&official.name).replace(' ', "-");
    record.source_id = Some(match &division_id {
        Some(division) => format!("{division}{ID_SEPARATOR}{slug}"),
        None => slug,
    });
    record.name = non_blank(Some(official.name.clone()));
    record.party = non_blank(official.party.clone());
    record.phone = official.phones.first().cloned();
    record.email = official.emails.first().cloned();
    record.website = official.urls.first().cloned();
    record.photo_url = non_blank(official.photo_url.clone());

    for phone in &official.phones {
        record.contacts.push(Contact::new(ContactKind::Phone, phone, SOURCE));
    }
    for email in &official.emails {
        record.contacts.push(Contact::new(ContactKind::Email, email, SOURCE));
    }
    for url in &official.urls {
        record.contacts.push(Contact::new(ContactKind::Website, url, SOURCE));
    }
    for address in &official.address {
        if let Some(formatted) = address.formatted() {
            record
                .contacts
                .push(Contact::new(ContactKind::Address, formatted, SOURCE));
        }
    }
    if let Some(url) = &record.photo_url {
        record.photos.push(Photo {
            url: url.clone(),
            attribution: None,
            source: SOURCE,
        });
    }
    for channel in &official.channels {
        if !channel.id.trim().is_empty() {
            record
                .social_media
                .push(SocialHandle::new(&channel.channel_type, &channel.id, SOURCE));
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "offices": [
            {"name": "U.S. Senator", "divisionId": "ocd-division/country:us/state:ca", "officialIndices": [0, 1]},
            {"name": "Governor of California", "divisionId": "ocd-division/country:us/state:ca", "officialIndices": [2]}
        ],
        "officials": [
            {"name": "Alex Padilla", "party": "Democratic Party"},
            {"name": "Laphonza Butler", "party": "Democratic Party"},
            {
                "name": "Gavin Newsom",
                "party": "Democratic Party",
                "phones": ["(916) 445-2841"],
                "urls": ["https://www.gov.ca.gov/"],
                "photoUrl": "https://img/newsom.jpg",
                "channels": [{"type": "Twitter", "id": "CAgovernor"}, {"type": "Facebook", "id": ""}],
                "address": [{"line1": "1303 10th Street", "city": "Sacramento", "state": "CA", "zip": "95814"}]
            }
        ]
    }"#;

    #[test]
    fn test_pick_official_by_name() {
        let response: RepresentativesResponse = serde_json::from_str(BODY).unwrap();
        let record = pick_official(&response, "Gavin C. Newsom").unwrap();

        assert_eq!(record.phone.as_deref(), Some("(916) 445-2841"));
        assert_eq!(record.social_media.len(), 1);
        assert_eq!(record.social_media[0].platform, "twitter");
        assert_eq!(
            record.source_id.as_deref(),
            Some("ocd-division/country:us/state:ca#gavin-newsom")
        );
        match record.detail {
            SourceDetail::GoogleCivic { office_name, .. } => {
                assert_eq!(office_name.as_deref(), Some("Governor of California"));
            }
            other => panic!("unexpected detail: {other:?}"),
        }
    }

    #[test]
    fn test_pick_official_no_match() {
        let response: RepresentativesResponse = serde_json::from_str(BODY).unwrap();
        assert!(pick_official(&response, "Somebody Else").is_none());
    }

    #[test]
    fn test_address_variants() {
        let mut entry = RosterEntry::new("Jane Doe", "State Senator", "CA");
        entry.district = Some("12".into());
        assert_eq!(
            GoogleCivicAdapter::address_variants(&entry),
            vec!["12, CA".to_string(), "CA".to_string()]
        );
    }
}
