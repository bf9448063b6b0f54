//! Congress.gov member adapter
//!
//! Federal officeholders only. With a bioguide id the member detail is
//! fetched directly; otherwise the state's current-member listing is searched
//! by name. Sponsored legislation (latest 10) becomes activity items.
//!
//! # API Reference
//! - `GET /v3/member/{bioguideId}`
//! - `GET /v3/member/{bioguideId}/sponsored-legislation`
//! - `GET /v3/member/{stateCode}?currentMember=true`

use super::http::{build_client, endpoint, get_json, get_json_optional, rate_limiter, HttpSettings, SourceRateLimiter};
use crate::context::RunContext;
use crate::names::{name_variants, names_match};
use crate::types::{
    non_blank, Activity, ActivityKind, AdapterError, ConfidenceTier, Contact, ContactKind,
    JurisdictionLevel, Photo, RosterEntry, SourceAdapter, SourceDetail, SourceRecord, SourceTag,
};
use async_trait::async_trait;
use civdata_common::time::parse_loose_date;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Congress.gov API base URL
pub const CONGRESS_API_URL: &str = "https://api.congress.gov/v3";

const SPONSORED_LIMIT: &str = "10";
const LISTING_LIMIT: &str = "250";

#[derive(Debug, Deserialize)]
struct MemberResponse {
    member: CongressMember,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CongressMember {
    bioguide_id: String,
    direct_order_name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    party_history: Vec<PartyHistory>,
    depiction: Option<Depiction>,
    official_website_url: Option<String>,
    address_information: Option<AddressInformation>,
    terms: Vec<Term>,
    sponsored_legislation: Option<LegislationCount>,
    cosponsored_legislation: Option<LegislationCount>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PartyHistory {
    party_name: Option<String>,
    start_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Depiction {
    image_url: Option<String>,
    attribution: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AddressInformation {
    office_address: Option<String>,
    city: Option<String>,
    zip_code: Option<serde_json::Value>,
    phone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Term {
    chamber: Option<String>,
    start_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegislationCount {
    count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SponsoredResponse {
    sponsored_legislation: Vec<SponsoredBill>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SponsoredBill {
    congress: Option<u32>,
    number: Option<String>,
    #[serde(rename = "type")]
    bill_type: Option<String>,
    title: Option<String>,
    introduced_date: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberListResponse {
    members: Vec<MemberListItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MemberListItem {
    bioguide_id: String,
    name: String,
}

/// Congress.gov adapter
pub struct CongressAdapter {
    client: Client,
    rate_limiter: SourceRateLimiter,
    api_key: Option<String>,
    base_url: String,
}

impl CongressAdapter {
    pub fn new(api_key: Option<String>, settings: &HttpSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            client: build_client(settings)?,
            rate_limiter: rate_limiter(settings.requests_per_second),
            api_key,
            base_url: CONGRESS_API_URL.to_string(),
        })
    }

    /// Point at a different host (mock servers, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn member_detail(&self, key: &str, bioguide_id: &str) -> Result<Option<CongressMember>, AdapterError> {
        let url = endpoint(&self.base_url, &["member", bioguide_id])?;
        let response: Option<MemberResponse> = get_json_optional(
            &self.client,
            &self.rate_limiter,
            url,
            &[("format", "json"), ("api_key", key)],
        )
        .await?;
        Ok(response.map(|r| r.member))
    }

    /// Search the state's current members for a name match
    async fn find_bioguide_id(&self, key: &str, entry: &RosterEntry) -> Result<Option<String>, AdapterError> {
        let state = entry.state.trim().to_uppercase();
        if state.len() != 2 {
            return Ok(None);
        }

        let url = endpoint(&self.base_url, &["member", &state])?;
        let listing: MemberListResponse = get_json(
            &self.client,
            &self.rate_limiter,
            url,
            &[
                ("format", "json"),
                ("currentMember", "true"),
                ("limit", LISTING_LIMIT),
                ("api_key", key),
            ],
        )
        .await?;

        for variant in name_variants(&entry.name) {
            if let Some(member) = listing.members.iter().find(|m| names_match(&m.name, &variant)) {
                debug!(name = %entry.name, bioguide_id = %member.bioguide_id, "Congress name match");
                return Ok(Some(member.bioguide_id.clone()));
            }
        }
        Ok(None)
    }

    async fn sponsored(&self, key: &str, bioguide_id: &str) -> Vec<SponsoredBill> {
        let url = match endpoint(&self.base_url, &["member", bioguide_id, "sponsored-legislation"]) {
            Ok(url) => url,
            Err(_) => return Vec::new(),
        };
        let result: Result<SponsoredResponse, AdapterError> = get_json(
            &self.client,
            &self.rate_limiter,
            url,
            &[("format", "json"), ("limit", SPONSORED_LIMIT), ("api_key", key)],
        )
        .await;

        match result {
            Ok(response) => response.sponsored_legislation,
            Err(e) => {
                warn!(bioguide_id, error = %e, "Sponsored legislation lookup failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for CongressAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::CongressGov
    }

    fn confidence(&self) -> ConfidenceTier {
        ConfidenceTier::High
    }

    async fn fetch(
        &self,
        entry: &RosterEntry,
        _run: &RunContext,
    ) -> Result<Option<SourceRecord>, AdapterError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(AdapterError::NotAvailable("no Congress.gov API key".to_string()));
        };
        if entry.jurisdiction_level() != JurisdictionLevel::Federal {
            return Err(AdapterError::NotAvailable("Congress.gov covers federal offices only".to_string()));
        }

        let bioguide_id = match entry.ids.bioguide_id.clone() {
            Some(id) => id,
            None => match self.find_bioguide_id(key, entry).await? {
                Some(id) => id,
                None => return Ok(None),
            },
        };

        let Some(member) = self.member_detail(key, &bioguide_id).await? else {
            return Ok(None);
        };
        let bills = self.sponsored(key, &bioguide_id).await;

        Ok(Some(member_to_record(member, bills)))
    }
}

fn member_to_record(member: CongressMember, bills: Vec<SponsoredBill>) -> SourceRecord {
    const SOURCE: SourceTag = SourceTag::CongressGov;

    let chamber = member
        .terms
        .iter()
        .max_by_key(|t| t.start_year)
        .and_then(|t| t.chamber.clone());

    let mut record = SourceRecord::new(
        SOURCE,
        ConfidenceTier::High,
        SourceDetail::Congress {
            bioguide_id: member.bioguide_id.clone(),
            chamber,
            sponsored_count: member.sponsored_legislation.as_ref().and_then(|c| c.count),
            cosponsored_count: member.cosponsored_legislation.as_ref().and_then(|c| c.count),
        },
    );

    record.source_id = non_blank(Some(member.bioguide_id.clone()));
    record.name = non_blank(member.direct_order_name.clone()).or_else(|| {
        match (&member.first_name, &member.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            _ => None,
        }
    });
    record.party = member
        .party_history
        .iter()
        .max_by_key(|p| p.start_year)
        .and_then(|p| non_blank(p.party_name.clone()));
    record.website = non_blank(member.official_website_url.clone());

    if let Some(website) = &record.website {
        record.contacts.push(Contact::new(ContactKind::Website, website, SOURCE));
    }

    if let Some(address) = member.address_information {
        record.phone = non_blank(address.phone_number.clone());
        if let Some(phone) = &record.phone {
            record
                .contacts
                .push(Contact::new(ContactKind::Phone, phone, SOURCE).labeled("DC Office"));
        }
        if let Some(office) = non_blank(address.office_address) {
            let zip = match address.zip_code {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => String::new(),
            };
            let full = [Some(office), address.city, Some(zip)]
                .into_iter()
                .flatten()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            record
                .contacts
                .push(Contact::new(ContactKind::Address, full, SOURCE).labeled("DC Office"));
        }
    }

    if let Some(depiction) = member.depiction {
        if let Some(url) = non_blank(depiction.image_url) {
            record.photo_url = Some(url.clone());
            record.photos.push(Photo {
                url,
                attribution: depiction.attribution,
                source: SOURCE,
            });
        }
    }

    for bill in bills {
        let label = match (&bill.bill_type, &bill.number) {
            (Some(t), Some(n)) => format!("{t} {n}"),
            _ => "Bill".to_string(),
        };
        let title = match &bill.title {
            Some(title) => format!("{label}: {title}"),
            None => label,
        };
        record.activity.push(Activity {
            kind: ActivityKind::Legislation,
            title,
            detail: bill.congress.map(|c| format!("{c}th Congress")),
            date: bill.introduced_date.as_deref().and_then(parse_loose_date),
            url: bill.url,
            source: SOURCE,
        });
    }

    record
}
