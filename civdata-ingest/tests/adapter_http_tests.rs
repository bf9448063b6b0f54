//! Live-source adapters against local mock servers
//!
//! Every test stands up an axum router mimicking the provider's response
//! shapes and points the adapter at it with `with_base_url`.

mod helpers;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use civdata_ingest::adapters::congress::CongressAdapter;
use civdata_ingest::adapters::fec::FecAdapter;
use civdata_ingest::adapters::google_civic::GoogleCivicAdapter;
use civdata_ingest::adapters::http::HttpSettings;
use civdata_ingest::adapters::wikipedia::WikipediaAdapter;
use civdata_ingest::adapters::{AdapterRunner, FetchStatus};
use civdata_ingest::types::{
    AdapterError, ContactKind, RosterEntry, SourceAdapter, SourceDetail, SourceTag,
};
use civdata_ingest::RunContext;
use helpers::{at, spawn_server};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Hits = Arc<Mutex<Vec<String>>>;

fn settings() -> HttpSettings {
    HttpSettings {
        timeout: Duration::from_secs(5),
        user_agent: "civdata-ingest-tests".to_string(),
        requests_per_second: 100,
    }
}

fn run() -> RunContext {
    RunContext::new(at(2024, 6, 1))
}

fn jane_doe_house() -> RosterEntry {
    let mut entry = RosterEntry::new("Jane Doe", "U.S. Representative", "CA");
    entry.district = Some("12".to_string());
    entry
}

// ============================================================================
// FEC
// ============================================================================

fn fec_candidate() -> Value {
    json!({
        "candidate_id": "H8CA12001",
        "name": "DOE, JANE",
        "party_full": "DEMOCRATIC PARTY",
        "office_full": "House",
        "state": "CA",
        "election_years": [2018, 2020, 2022, 2024]
    })
}

async fn fec_search(State(hits): State<Hits>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    hits.lock().unwrap().push(q.clone());
    if q == "Jane Doe" {
        Json(json!({ "results": [fec_candidate()] }))
    } else {
        Json(json!({ "results": [] }))
    }
}

async fn fec_totals(Path(candidate_id): Path<String>) -> Json<Value> {
    assert_eq!(candidate_id, "H8CA12001");
    Json(json!({
        "results": [{
            "cycle": 2024,
            "receipts": 1250000.5,
            "disbursements": 980000.0,
            "last_cash_on_hand_end_period": 310000.25,
            "coverage_end_date": "2024-03-31T00:00:00"
        }]
    }))
}

#[tokio::test]
async fn test_fec_falls_through_name_variants() {
    let hits: Hits = Arc::default();
    let router = Router::new()
        .route("/candidates/search/", get(fec_search))
        .route("/candidate/:id/totals/", get(fec_totals))
        .with_state(Arc::clone(&hits));
    let base = spawn_server(router).await;

    let adapter = FecAdapter::new(Some("test-key".to_string()), &settings())
        .unwrap()
        .with_base_url(base);
    let record = adapter
        .fetch(&jane_doe_house(), &run())
        .await
        .unwrap()
        .expect("second variant should match");

    // "Last, First" is tried first and comes back empty
    let queries = hits.lock().unwrap().clone();
    assert_eq!(queries, vec!["Doe, Jane".to_string(), "Jane Doe".to_string()]);

    assert_eq!(record.source, SourceTag::Fec);
    assert_eq!(record.source_id.as_deref(), Some("H8CA12001"));
    assert_eq!(record.party.as_deref(), Some("DEMOCRATIC PARTY"));
    match &record.detail {
        SourceDetail::Fec { finance, .. } => {
            let finance = finance.as_ref().expect("totals attached");
            assert_eq!(finance.cycle, Some(2024));
            assert_eq!(finance.cash_on_hand, Some(310000.25));
        }
        other => panic!("unexpected detail {:?}", other),
    }
    assert_eq!(record.activity.len(), 1);
    assert!(record.activity[0].title.contains("2024"));
}

#[tokio::test]
async fn test_fec_non_json_body_is_parse_failure() {
    let router = Router::new().route(
        "/candidates/search/",
        get(|| async { "<html><body>Maintenance</body></html>" }),
    );
    let base = spawn_server(router).await;

    let adapter = FecAdapter::new(Some("test-key".to_string()), &settings())
        .unwrap()
        .with_base_url(base);

    let err = adapter.fetch(&jane_doe_house(), &run()).await.unwrap_err();
    assert!(matches!(err, AdapterError::Parse(_)), "got {:?}", err);

    // Through the runner the failure is recorded, not raised
    let runner = AdapterRunner::new(vec![Arc::new(adapter) as Arc<dyn SourceAdapter>], 2);
    let ctx = run();
    let outcomes = runner.fetch_all(&jane_doe_house(), &ctx).await;
    assert!(matches!(outcomes[0].status, FetchStatus::Failed(_)));
    assert!(outcomes[0].record.is_none());

    let health = ctx.tracker.health(SourceTag::Fec);
    assert_eq!(health.failure_count, 1);
    assert_eq!(health.last_status, None);
    // One plain failure is below the escalation threshold
    assert!(health.backoff_until.is_none());
}

#[tokio::test]
async fn test_fec_without_key_is_unavailable() {
    let adapter = FecAdapter::new(None, &settings()).unwrap();
    let runner = AdapterRunner::new(vec![Arc::new(adapter) as Arc<dyn SourceAdapter>], 1);
    let ctx = run();

    let outcomes = runner.fetch_all(&jane_doe_house(), &ctx).await;
    assert!(matches!(outcomes[0].status, FetchStatus::Unavailable(_)));
    assert_eq!(ctx.tracker.health(SourceTag::Fec).failure_count, 0);
}

#[tokio::test]
async fn test_fec_known_id_missing_is_empty() {
    let router = Router::new().route(
        "/candidate/:id/",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" }))) }),
    );
    let base = spawn_server(router).await;

    let adapter = FecAdapter::new(Some("test-key".to_string()), &settings())
        .unwrap()
        .with_base_url(base);
    let mut entry = jane_doe_house();
    entry.ids.fec_id = Some("H0XX00000".to_string());

    let result = adapter.fetch(&entry, &run()).await.unwrap();
    assert!(result.is_none());
}

// ============================================================================
// Google Civic
// ============================================================================

fn civic_body() -> Value {
    json!({
        "offices": [
            {
                "name": "Governor of California",
                "divisionId": "ocd-division/country:us/state:ca",
                "officialIndices": [0]
            },
            {
                "name": "U.S. Representative",
                "divisionId": "ocd-division/country:us/state:ca/cd:12",
                "officialIndices": [1]
            }
        ],
        "officials": [
            { "name": "Alex Kim", "party": "Democratic Party" },
            {
                "name": "Jane Doe",
                "party": "Democratic Party",
                "phones": ["(202) 225-4965"],
                "urls": ["https://doe.house.gov/"],
                "photoUrl": "https://example.gov/doe.jpg",
                "address": [{ "line1": "1236 Longworth HOB", "city": "Washington", "state": "DC", "zip": "20515" }],
                "channels": [{ "type": "Twitter", "id": "RepJaneDoe" }]
            }
        ]
    })
}

async fn civic_by_address(
    State(hits): State<Hits>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let address = params.get("address").cloned().unwrap_or_default();
    hits.lock().unwrap().push(address.clone());
    if address == "CA" {
        Json(civic_body()).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": 400, "message": "Failed to parse address" } })),
        )
            .into_response()
    }
}

#[tokio::test]
async fn test_civic_bad_address_falls_back_to_state() {
    let hits: Hits = Arc::default();
    let router = Router::new()
        .route("/representatives", get(civic_by_address))
        .with_state(Arc::clone(&hits));
    let base = spawn_server(router).await;

    let adapter = GoogleCivicAdapter::new(Some("test-key".to_string()), &settings())
        .unwrap()
        .with_base_url(base);
    let record = adapter
        .fetch(&jane_doe_house(), &run())
        .await
        .unwrap()
        .expect("state-level query should resolve");

    assert_eq!(
        hits.lock().unwrap().clone(),
        vec!["12, CA".to_string(), "CA".to_string()]
    );
    assert_eq!(
        record.source_id.as_deref(),
        Some("ocd-division/country:us/state:ca/cd:12#jane-doe")
    );
    assert_eq!(record.phone.as_deref(), Some("(202) 225-4965"));
    assert_eq!(record.social_media.len(), 1);
    assert_eq!(record.photos.len(), 1);
    assert!(record
        .contacts
        .iter()
        .any(|c| c.kind == ContactKind::Address && c.value.contains("Longworth")));
    match &record.detail {
        SourceDetail::GoogleCivic { office_name, .. } => {
            assert_eq!(office_name.as_deref(), Some("U.S. Representative"));
        }
        other => panic!("unexpected detail {:?}", other),
    }
}

#[tokio::test]
async fn test_civic_rate_limit_backs_off_source() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let router = Router::new().route(
        "/representatives",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::TOO_MANY_REQUESTS, "quota exceeded")
            }
        }),
    );
    let base = spawn_server(router).await;

    let adapter = GoogleCivicAdapter::new(Some("test-key".to_string()), &settings())
        .unwrap()
        .with_base_url(base);
    let runner = AdapterRunner::new(vec![Arc::new(adapter) as Arc<dyn SourceAdapter>], 2);
    let ctx = run();

    let first = runner.fetch_all(&jane_doe_house(), &ctx).await;
    assert!(matches!(first[0].status, FetchStatus::Failed(_)));

    let health = ctx.tracker.health(SourceTag::GoogleCivic);
    assert_eq!(health.last_status, Some(429));
    assert!(health.backoff_until.is_some());
    assert!(ctx.tracker.should_skip(SourceTag::GoogleCivic));

    // Inside the backoff window the source is not called again
    let second = runner.fetch_all(&jane_doe_house(), &ctx).await;
    assert_eq!(second[0].status, FetchStatus::Skipped);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Wikipedia
// ============================================================================

async fn wiki_summary(Path(title): Path<String>) -> axum::response::Response {
    match title.as_str() {
        "Jane_Doe" => Json(json!({
            "type": "standard",
            "title": "Jane Doe",
            "description": "Placeholder name",
            "extract": "Jane Doe is a placeholder name for an unidentified woman."
        }))
        .into_response(),
        "Jane_Doe_(politician)" => Json(json!({
            "type": "standard",
            "title": "Jane Doe (politician)",
            "description": "American politician",
            "extract": "Jane Doe is an American politician serving as the U.S. representative for California's 12th congressional district.",
            "thumbnail": { "source": "https://upload.wikimedia.org/doe.jpg" },
            "content_urls": { "desktop": { "page": "https://en.wikipedia.org/wiki/Jane_Doe_(politician)" } }
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[tokio::test]
async fn test_wikipedia_skips_non_political_page() {
    let router = Router::new().route("/page/summary/:title", get(wiki_summary));
    let base = spawn_server(router).await;

    let adapter = WikipediaAdapter::new(&settings()).unwrap().with_base_url(base);
    let record = adapter
        .fetch(&jane_doe_house(), &run())
        .await
        .unwrap()
        .expect("politician page should match");

    assert_eq!(record.name.as_deref(), Some("Jane Doe"));
    assert_eq!(record.source_id.as_deref(), Some("Jane Doe (politician)"));
    assert_eq!(record.photos[0].attribution.as_deref(), Some("Wikimedia Commons"));
    match &record.detail {
        SourceDetail::Wikipedia { extract, .. } => assert!(extract.contains("congressional")),
        other => panic!("unexpected detail {:?}", other),
    }
}

#[tokio::test]
async fn test_wikipedia_no_page_is_empty() {
    let router = Router::new().route("/page/summary/:title", get(wiki_summary));
    let base = spawn_server(router).await;

    let adapter = WikipediaAdapter::new(&settings()).unwrap().with_base_url(base);
    let entry = RosterEntry::new("Quinn Unknown", "Mayor", "TX");
    assert!(adapter.fetch(&entry, &run()).await.unwrap().is_none());
}

// ============================================================================
// Congress.gov
// ============================================================================

async fn congress_member(Path(key): Path<String>) -> axum::response::Response {
    match key.as_str() {
        "CA" => Json(json!({
            "members": [
                { "bioguideId": "S000001", "name": "Smith, Robert" },
                { "bioguideId": "D000001", "name": "Doe, Jane" }
            ]
        }))
        .into_response(),
        "D000001" => Json(json!({
            "member": {
                "bioguideId": "D000001",
                "directOrderName": "Jane Doe",
                "partyHistory": [{ "partyName": "Democratic", "startYear": 2019 }],
                "officialWebsiteUrl": "https://doe.house.gov",
                "addressInformation": {
                    "officeAddress": "1236 Longworth House Office Building",
                    "city": "Washington",
                    "zipCode": 20515,
                    "phoneNumber": "(202) 225-4965"
                },
                "terms": [{ "chamber": "House of Representatives", "startYear": 2019 }],
                "sponsoredLegislation": { "count": 42 }
            }
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[tokio::test]
async fn test_congress_listing_then_detail() {
    let router = Router::new()
        .route("/member/:id", get(congress_member))
        .route(
            "/member/:id/sponsored-legislation",
            get(|| async {
                Json(json!({
                    "sponsoredLegislation": [{
                        "congress": 118,
                        "number": "1234",
                        "type": "HR",
                        "title": "Clean Water Act Amendments",
                        "introducedDate": "2023-05-02"
                    }]
                }))
            }),
        );
    let base = spawn_server(router).await;

    let adapter = CongressAdapter::new(Some("test-key".to_string()), &settings())
        .unwrap()
        .with_base_url(base);
    let record = adapter
        .fetch(&jane_doe_house(), &run())
        .await
        .unwrap()
        .expect("member should resolve");

    assert_eq!(record.source_id.as_deref(), Some("D000001"));
    assert_eq!(record.phone.as_deref(), Some("(202) 225-4965"));
    assert_eq!(record.party.as_deref(), Some("Democratic"));
    assert_eq!(record.activity.len(), 1);
    assert!(record
        .contacts
        .iter()
        .any(|c| c.kind == ContactKind::Address && c.value.ends_with("20515")));
    match &record.detail {
        SourceDetail::Congress {
            sponsored_count, ..
        } => assert_eq!(*sponsored_count, Some(42)),
        other => panic!("unexpected detail {:?}", other),
    }
}

#[tokio::test]
async fn test_congress_rejects_state_office() {
    let adapter = CongressAdapter::new(Some("test-key".to_string()), &settings()).unwrap();
    let entry = RosterEntry::new("Jane Doe", "State Senator", "CA");

    let err = adapter.fetch(&entry, &run()).await.unwrap_err();
    assert!(matches!(err, AdapterError::NotAvailable(_)));
}
