//! OpenFEC campaign-finance adapter
//!
//! Resolves the candidate by FEC id when known, otherwise by full-text search
//! over name variants ("Last, First" first, as filings are indexed that way).
//! Totals for the latest cycle become a finance summary.

use super::http::{build_client, endpoint, get_json, get_json_optional, rate_limiter, HttpSettings, SourceRateLimiter};
use crate::context::RunContext;
use crate::names::{last_first, name_variants, names_match};
use crate::types::{
    non_blank, Activity, ActivityKind, AdapterError, ConfidenceTier, FinanceSummary, RosterEntry,
    SourceAdapter, SourceDetail, SourceRecord, SourceTag,
};
use async_trait::async_trait;
use civdata_common::time::parse_loose_date;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// OpenFEC API base URL
pub const FEC_API_URL: &str = "https://api.open.fec.gov/v1";

const SEARCH_PAGE_SIZE: &str = "20";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatesResponse {
    results: Vec<FecCandidate>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
struct FecCandidate {
    candidate_id: String,
    name: String,
    party_full: Option<String>,
    office_full: Option<String>,
    state: Option<String>,
    election_years: Vec<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TotalsResponse {
    results: Vec<CandidateTotals>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateTotals {
    cycle: Option<i32>,
    receipts: Option<f64>,
    disbursements: Option<f64>,
    last_cash_on_hand_end_period: Option<f64>,
    coverage_end_date: Option<String>,
}

/// OpenFEC adapter
pub struct FecAdapter {
    client: Client,
    rate_limiter: SourceRateLimiter,
    api_key: Option<String>,
    base_url: String,
}

impl FecAdapter {
    pub fn new(api_key: Option<String>, settings: &HttpSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            client: build_client(settings)?,
            rate_limiter: rate_limiter(settings.requests_per_second),
            api_key,
            base_url: FEC_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search queries, "Last, First" form first
    fn query_variants(name: &str) -> Vec<String> {
        let mut variants = Vec::new();
        if let Some(lf) = last_first(name) {
            variants.push(lf);
        }
        for v in name_variants(name) {
            if !variants.contains(&v) {
                variants.push(v);
            }
        }
        variants
    }

    async fn candidate_by_id(&self, key: &str, candidate_id: &str) -> Result<Option<FecCandidate>, AdapterError> {
        let url = endpoint(&self.base_url, &["candidate", candidate_id, ""])?;
        let response: Option<CandidatesResponse> =
            get_json_optional(&self.client, &self.rate_limiter, url, &[("api_key", key)]).await?;
        Ok(response.and_then(|r| r.results.into_iter().next()))
    }

    async fn search(&self, key: &str, entry: &RosterEntry) -> Result<Option<FecCandidate>, AdapterError> {
        let state = entry.state.trim().to_uppercase();

        for query in Self::query_variants(&entry.name) {
            let url = endpoint(&self.base_url, &["candidates", "search", ""])?;
            let mut params = vec![
                ("q", query.as_str()),
                ("sort", "-election_years"),
                ("per_page", SEARCH_PAGE_SIZE),
                ("api_key", key),
            ];
            if state.len() == 2 {
                params.push(("state", state.as_str()));
            }

            let response: CandidatesResponse =
                get_json(&self.client, &self.rate_limiter, url, &params).await?;

            let same_state = |c: &FecCandidate| match c.state.as_deref() {
                Some(s) if state.len() == 2 => s.eq_ignore_ascii_case(&state),
                _ => true,
            };
            if let Some(candidate) = response
                .results
                .into_iter()
                .find(|c| names_match(&c.name, &entry.name) && same_state(c))
            {
                debug!(name = %entry.name, candidate_id = %candidate.candidate_id, %query, "FEC match");
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn latest_totals(&self, key: &str, candidate_id: &str) -> Option<CandidateTotals> {
        let url = endpoint(&self.base_url, &["candidate", candidate_id, "totals", ""]).ok()?;
        let result: Result<TotalsResponse, AdapterError> = get_json(
            &self.client,
            &self.rate_limiter,
            url,
            &[("sort", "-cycle"), ("per_page", "1"), ("api_key", key)],
        )
        .await;

        match result {
            Ok(response) => response.results.into_iter().next(),
            Err(e) => {
                warn!(candidate_id, error = %e, "FEC totals lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for FecAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::Fec
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
            return Err(AdapterError::NotAvailable("no FEC API key".to_string()));
        };

        let candidate = match entry.ids.fec_id.as_deref() {
            Some(id) => self.candidate_by_id(key, id).await?,
            None => self.search(key, entry).await?,
        };
        let Some(candidate) = candidate else {
            return Ok(None);
        };

        let totals = self.latest_totals(key, &candidate.candidate_id).await;
        Ok(Some(candidate_to_record(candidate, totals)))
    }
}

fn candidate_to_record(candidate: FecCandidate, totals: Option<CandidateTotals>) -> SourceRecord {
    const SOURCE: SourceTag = SourceTag::Fec;

    let finance = totals.map(|t| FinanceSummary {
        cycle: t.cycle,
        receipts: t.receipts,
        disbursements: t.disbursements,
        cash_on_hand: t.last_cash_on_hand_end_period,
        coverage_end: t.coverage_end_date.as_deref().and_then(parse_loose_date),
    });

    let mut record = SourceRecord::new(
        SOURCE,
        ConfidenceTier::Medium,
        SourceDetail::Fec {
            candidate_id: candidate.candidate_id.clone(),
            office: candidate.office_full.clone(),
            finance: finance.clone(),
        },
    );
    record.source_id = non_blank(Some(candidate.candidate_id));
    record.name = non_blank(Some(candidate.name));
    record.party = non_blank(candidate.party_full);

    if let Some(finance) = finance {
        let cycle = finance
            .cycle
            .or_else(|| candidate.election_years.iter().max().copied());
        record.activity.push(Activity {
            kind: ActivityKind::Finance,
            title: match cycle {
                Some(cycle) => format!("{cycle} cycle campaign finance"),
                None => "Campaign finance".to_string(),
            },
            detail: Some(format!(
                "receipts {}, disbursements {}, cash on hand {}",
                money(finance.receipts),
                money(finance.disbursements),
                money(finance.cash_on_hand)
            )),
            date: finance.coverage_end,
            url: None,
            source: SOURCE,
        });
    }

    record
}

fn money(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${v:.2}"),
        None => "n/a".to_string(),
    }
}
