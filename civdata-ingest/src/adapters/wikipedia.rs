//! Wikipedia page-summary adapter
//!
//! Tries title variants ("First_Last", "First_Last_(politician)") against the
//! REST summary endpoint. Disambiguation pages and pages that do not read as
//! a political biography are skipped. No credentials required.

use super::http::{build_client, endpoint, get_json_optional, rate_limiter, HttpSettings, SourceRateLimiter};
use crate::context::RunContext;
use crate::names::wiki_title_variants;
use crate::types::{
    non_blank, AdapterError, ConfidenceTier, Contact, ContactKind, Photo, RosterEntry,
    SourceAdapter, SourceDetail, SourceRecord, SourceTag,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Wikipedia REST API base URL
pub const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/api/rest_v1";

const POLITICAL_MARKERS: [&str; 10] = [
    "politician",
    "senator",
    "representative",
    "legislator",
    "congress",
    "governor",
    "mayor",
    "assembly",
    "council",
    "member of",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageSummary {
    #[serde(rename = "type")]
    page_type: String,
    title: String,
    description: Option<String>,
    extract: String,
    thumbnail: Option<Thumbnail>,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnail {
    source: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageUrl {
    page: Option<String>,
}

impl PageSummary {
    fn is_disambiguation(&self) -> bool {
        self.page_type == "disambiguation"
    }

    fn reads_as_politician(&self) -> bool {
        let text = format!(
            "{} {}",
            self.description.as_deref().unwrap_or_default(),
            self.extract
        )
        .to_lowercase();
        POLITICAL_MARKERS.iter().any(|m| text.contains(m))
    }
}

/// Wikipedia adapter
pub struct WikipediaAdapter {
    client: Client,
    rate_limiter: SourceRateLimiter,
    base_url: String,
}

impl WikipediaAdapter {
    pub fn new(settings: &HttpSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            client: build_client(settings)?,
            rate_limiter: rate_limiter(settings.requests_per_second),
            base_url: WIKIPEDIA_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for WikipediaAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::Wikipedia
    }

    fn confidence(&self) -> ConfidenceTier {
        ConfidenceTier::Low
    }

    async fn fetch(
        &self,
        entry: &RosterEntry,
        _run: &RunContext,
    ) -> Result<Option<SourceRecord>, AdapterError> {
        for title in wiki_title_variants(&entry.name) {
            let url = endpoint(&self.base_url, &["page", "summary", &title])?;
            let Some(summary) =
                get_json_optional::<PageSummary>(&self.client, &self.rate_limiter, url, &[]).await?
            else {
                continue;
            };

            if summary.is_disambiguation() {
                debug!(%title, "Skipping disambiguation page");
                continue;
            }
            if !summary.reads_as_politician() {
                debug!(%title, "Page does not describe a politician");
                continue;
            }
            return Ok(Some(summary_to_record(summary)));
        }
        Ok(None)
    }
}

fn summary_to_record(summary: PageSummary) -> SourceRecord {
    const SOURCE: SourceTag = SourceTag::Wikipedia;

    let page_url = summary
        .content_urls
        .and_then(|c| c.desktop)
        .and_then(|d| non_blank(d.page));

    let mut record = SourceRecord::new(
        SOURCE,
        ConfidenceTier::Low,
        SourceDetail::Wikipedia {
            title: summary.title.clone(),
            description: summary.description,
            extract: summary.extract,
            page_url: page_url.clone(),
        },
    );
    record.source_id = non_blank(Some(summary.title.clone()));
    // "Jane Doe (politician)" → "Jane Doe"
    let display = match summary.title.split_once(" (") {
        Some((name, _)) => name.to_string(),
        None => summary.title,
    };
    record.name = non_blank(Some(display));

    if let Some(thumbnail) = summary.thumbnail.and_then(|t| non_blank(Some(t.source))) {
        record.photo_url = Some(thumbnail.clone());
        record.photos.push(Photo {
            url: thumbnail,
            attribution: Some("Wikimedia Commons".to_string()),
            source: SOURCE,
        });
    }
    if let Some(url) = page_url {
        record
            .contacts
            .push(Contact::new(ContactKind::Link, url, SOURCE).labeled("Wikipedia"));
    }

    record
}
