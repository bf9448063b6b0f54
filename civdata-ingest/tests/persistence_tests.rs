//! Representative store integration tests
//!
//! Never-downgrade upsert precedence against an on-disk SQLite database.

mod helpers;

use civdata_ingest::db::{
    load_representative, PersistencePolicy, RepresentativeStore, SqliteRepresentativeStore,
    UpsertAction,
};
use civdata_ingest::fusion::{EnrichedRepresentative, RecordMerger, VerificationStatus};
use civdata_ingest::identity::CanonicalIdentity;
use civdata_ingest::types::{
    ConfidenceTier, Contact, ContactKind, RosterEntry, SourceDetail, SourceRecord, SourceTag,
};
use helpers::{at, count_rows, create_test_db, get_table_names};

fn representative(id: &str, phones: &[&str], score: f64) -> EnrichedRepresentative {
    let entry = RosterEntry::new("Jane Doe", "U.S. Representative", "CA");
    let identity = CanonicalIdentity {
        canonical_id: id.to_string(),
        entity_type: "representative".to_string(),
        crosswalk_entries: Vec::new(),
        degraded: false,
    };

    let mut record = SourceRecord::new(
        SourceTag::CongressGov,
        ConfidenceTier::High,
        SourceDetail::Congress {
            bioguide_id: "D000001".to_string(),
            chamber: Some("House".to_string()),
            sponsored_count: None,
            cosponsored_count: None,
        },
    );
    record.source_id = Some("D000001".to_string());
    record.name = Some("Jane Doe".to_string());
    record.phone = phones.first().map(|p| p.to_string());
    for phone in phones {
        record
            .contacts
            .push(Contact::new(ContactKind::Phone, *phone, SourceTag::CongressGov));
    }

    let mut rep = RecordMerger::new().merge(&entry, &identity, &[record], at(2024, 6, 1));
    rep.data_quality.overall_confidence = score;
    rep.verification_status = VerificationStatus::from_confidence(score);
    rep
}

#[tokio::test]
async fn test_schema_tables_created() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let tables = get_table_names(&pool).await.unwrap();

    for table in [
        "id_crosswalk",
        "representative_activity",
        "representative_contacts",
        "representative_photos",
        "representative_social_media",
        "representatives",
    ] {
        assert!(tables.contains(&table.to_string()), "missing table {}", table);
    }
}

#[tokio::test]
async fn test_lower_score_does_not_overwrite() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteRepresentativeStore::new(pool.clone(), PersistencePolicy::default());

    let first = store
        .upsert(&representative("rep_1", &["202-555-0100"], 85.0))
        .await
        .unwrap();
    assert_eq!(first.action, UpsertAction::Inserted);
    assert_eq!(first.previous_score, None);

    let second = store
        .upsert(&representative("rep_1", &["202-555-0199"], 80.0))
        .await
        .unwrap();
    assert_eq!(second.action, UpsertAction::Preserved);
    assert_eq!(second.previous_score, Some(85.0));

    let stored = load_representative(&pool, "rep_1").await.unwrap().unwrap();
    assert_eq!(stored.overall_confidence, 85.0);
    assert_eq!(stored.phone.as_deref(), Some("202-555-0100"));
    assert_eq!(stored.verification_status, VerificationStatus::Verified);
    assert_eq!(stored.contacts[0].value, "202-555-0100");
}

#[tokio::test]
async fn test_overwrite_requires_margin() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteRepresentativeStore::new(pool.clone(), PersistencePolicy::default());

    store
        .upsert(&representative("rep_1", &["202-555-0100"], 60.0))
        .await
        .unwrap();

    // 65 is not more than 60 + 5
    let tie = store
        .upsert(&representative("rep_1", &["202-555-0111"], 65.0))
        .await
        .unwrap();
    assert_eq!(tie.action, UpsertAction::Preserved);

    let better = store
        .upsert(&representative("rep_1", &["202-555-0122"], 66.0))
        .await
        .unwrap();
    assert_eq!(better.action, UpsertAction::Updated);
    assert_eq!(better.previous_score, Some(60.0));

    let stored = load_representative(&pool, "rep_1").await.unwrap().unwrap();
    assert_eq!(stored.overall_confidence, 66.0);
    assert_eq!(stored.phone.as_deref(), Some("202-555-0122"));
}

#[tokio::test]
async fn test_low_quality_row_always_replaced() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteRepresentativeStore::new(pool.clone(), PersistencePolicy::default());

    store
        .upsert(&representative("rep_1", &["202-555-0100"], 40.0))
        .await
        .unwrap();
    let outcome = store
        .upsert(&representative("rep_1", &["202-555-0133"], 30.0))
        .await
        .unwrap();

    assert_eq!(outcome.action, UpsertAction::Updated);
    let stored = load_representative(&pool, "rep_1").await.unwrap().unwrap();
    assert_eq!(stored.overall_confidence, 30.0);
}

#[tokio::test]
async fn test_existing_row_matched_by_external_id_keeps_its_id() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteRepresentativeStore::new(pool.clone(), PersistencePolicy::default());

    store
        .upsert(&representative("rep_old", &["202-555-0100"], 45.0))
        .await
        .unwrap();
    let outcome = store
        .upsert(&representative("rep_new", &["202-555-0144"], 70.0))
        .await
        .unwrap();

    assert_eq!(outcome.action, UpsertAction::Updated);
    assert_eq!(outcome.id, "rep_old");
    assert_eq!(count_rows(&pool, "representatives").await, 1);
    assert!(load_representative(&pool, "rep_new").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_replaces_satellite_rows() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteRepresentativeStore::new(pool.clone(), PersistencePolicy::default());

    store
        .upsert(&representative(
            "rep_1",
            &["202-555-0100", "415-555-0101", "916-555-0102"],
            20.0,
        ))
        .await
        .unwrap();
    assert_eq!(count_rows(&pool, "representative_contacts").await, 3);

    store
        .upsert(&representative("rep_1", &["202-555-0155"], 90.0))
        .await
        .unwrap();

    let stored = load_representative(&pool, "rep_1").await.unwrap().unwrap();
    assert_eq!(stored.contacts.len(), 1);
    assert_eq!(stored.contacts[0].kind, ContactKind::Phone);
    assert_eq!(stored.contacts[0].source, SourceTag::CongressGov);
    assert_eq!(count_rows(&pool, "representative_contacts").await, 1);
}

#[tokio::test]
async fn test_custom_policy_margin() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let policy = PersistencePolicy {
        overwrite_margin: 0.0,
        low_quality_threshold: 0.0,
    };
    let store = SqliteRepresentativeStore::new(pool.clone(), policy);

    store
        .upsert(&representative("rep_1", &["202-555-0100"], 70.0))
        .await
        .unwrap();
    let outcome = store
        .upsert(&representative("rep_1", &["202-555-0166"], 71.0))
        .await
        .unwrap();
    assert_eq!(outcome.action, UpsertAction::Updated);
}

fn unlinked_state_senator(state: &str) -> EnrichedRepresentative {
    let entry = RosterEntry::new("Chris Park", "State Senator", state);
    let identity = CanonicalIdentity {
        canonical_id: format!("representative_fb_{}", state.to_lowercase()),
        entity_type: "representative".to_string(),
        crosswalk_entries: Vec::new(),
        degraded: false,
    };
    RecordMerger::new().merge(&entry, &identity, &[], at(2024, 6, 1))
}

#[tokio::test]
async fn test_same_name_in_different_states_stays_separate() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteRepresentativeStore::new(pool.clone(), PersistencePolicy::default());

    let ca = store.upsert(&unlinked_state_senator("CA")).await.unwrap();
    let nv = store.upsert(&unlinked_state_senator("NV")).await.unwrap();

    assert_eq!(ca.action, UpsertAction::Inserted);
    assert_eq!(nv.action, UpsertAction::Inserted);
    assert_eq!(nv.id, "representative_fb_nv");
    assert_eq!(count_rows(&pool, "representatives").await, 2);

    let stored = load_representative(&pool, "representative_fb_ca")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, "CA");
}
