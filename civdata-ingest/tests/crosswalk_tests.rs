//! Entity resolution over the SQLite crosswalk

mod helpers;

use civdata_ingest::db::{self, SqliteCrosswalk};
use civdata_ingest::identity::{
    fallback_id, mint_id, CrosswalkEntry, CrosswalkStore, EntityResolver, SourceIdentifier,
};
use civdata_ingest::types::{RosterEntry, SourceTag};
use helpers::create_test_db;
use std::sync::Arc;

const ENTITY: &str = "representative";

fn resolver_for(store: &Arc<SqliteCrosswalk>) -> EntityResolver {
    EntityResolver::new(Arc::clone(store) as Arc<dyn CrosswalkStore>)
}

fn id(source: SourceTag, value: &str) -> SourceIdentifier {
    SourceIdentifier::new(source, value)
}

#[tokio::test]
async fn test_identifiers_seen_together_share_one_canonical_id() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = Arc::new(SqliteCrosswalk::new(pool));
    let resolver = resolver_for(&store);

    let a = id(SourceTag::Fec, "H0CA12001");
    let b = id(SourceTag::CongressGov, "D000001");

    let first = resolver.resolve(ENTITY, &[a.clone()]).await.unwrap();
    let second = resolver.resolve(ENTITY, &[b.clone()]).await.unwrap();
    assert_ne!(first.canonical_id, second.canonical_id);

    // Both seen for one person: second identity folds into the first
    let joined = resolver.resolve(ENTITY, &[a, b]).await.unwrap();
    assert_eq!(joined.canonical_id, first.canonical_id);
    assert_eq!(
        joined.crosswalk_entries,
        vec![
            CrosswalkEntry {
                source: SourceTag::CongressGov,
                source_id: "D000001".to_string(),
            },
            CrosswalkEntry {
                source: SourceTag::Fec,
                source_id: "H0CA12001".to_string(),
            },
        ]
    );

    assert_eq!(
        store
            .lookup(SourceTag::CongressGov, "D000001")
            .await
            .unwrap()
            .as_deref(),
        Some(first.canonical_id.as_str())
    );
    assert!(store.entries(&second.canonical_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_crosswalk_only_grows() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = Arc::new(SqliteCrosswalk::new(pool));
    let resolver = resolver_for(&store);

    let fec = id(SourceTag::Fec, "H0CA12001");
    let bioguide = id(SourceTag::CongressGov, "D000001");
    let civic = id(SourceTag::GoogleCivic, "ocd-division/country:us/state:ca/cd:12#jane-doe");

    let one = resolver.resolve(ENTITY, &[fec.clone()]).await.unwrap();
    assert_eq!(one.crosswalk_entries.len(), 1);

    let two = resolver
        .resolve(ENTITY, &[fec.clone(), bioguide.clone()])
        .await
        .unwrap();
    assert_eq!(two.canonical_id, one.canonical_id);
    assert_eq!(two.crosswalk_entries.len(), 2);

    // A later run that only sees one identifier does not shrink the set
    let later = resolver.resolve(ENTITY, &[bioguide]).await.unwrap();
    assert_eq!(later.canonical_id, one.canonical_id);
    assert_eq!(later.crosswalk_entries.len(), 2);

    let three = resolver.resolve(ENTITY, &[civic, fec]).await.unwrap();
    assert_eq!(three.canonical_id, one.canonical_id);
    assert_eq!(three.crosswalk_entries.len(), 3);
}

#[tokio::test]
async fn test_minted_id_is_deterministic_across_databases() {
    let (_dir_a, pool_a) = create_test_db().await.unwrap();
    let (_dir_b, pool_b) = create_test_db().await.unwrap();
    let identifiers = [id(SourceTag::Fec, "H0CA12001")];

    let a = resolver_for(&Arc::new(SqliteCrosswalk::new(pool_a)))
        .resolve(ENTITY, &identifiers)
        .await
        .unwrap();
    let b = resolver_for(&Arc::new(SqliteCrosswalk::new(pool_b)))
        .resolve(ENTITY, &identifiers)
        .await
        .unwrap();

    assert_eq!(a.canonical_id, b.canonical_id);
    assert_eq!(a.canonical_id, mint_id(ENTITY, SourceTag::Fec, "H0CA12001"));
    assert!(a.canonical_id.starts_with("representative_"));
}

#[tokio::test]
async fn test_crosswalk_survives_reopen() {
    let (dir, pool) = create_test_db().await.unwrap();
    let store = Arc::new(SqliteCrosswalk::new(pool.clone()));
    let first = resolver_for(&store)
        .resolve(
            ENTITY,
            &[
                id(SourceTag::OpenStates, "ocd-person/1234"),
                id(SourceTag::Fec, "S4CA00001"),
            ],
        )
        .await
        .unwrap();
    pool.close().await;

    let reopened = db::init_database_pool(&dir.path().join("civdata_test.db"))
        .await
        .unwrap();
    let store = Arc::new(SqliteCrosswalk::new(reopened));
    let again = resolver_for(&store)
        .resolve(ENTITY, &[id(SourceTag::Fec, "S4CA00001")])
        .await
        .unwrap();

    assert_eq!(again.canonical_id, first.canonical_id);
    assert_eq!(again.crosswalk_entries.len(), 2);
}

#[tokio::test]
async fn test_store_failure_degrades_to_fallback_id() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = Arc::new(SqliteCrosswalk::new(pool.clone()));
    pool.close().await;

    let mut entry = RosterEntry::new("Jane Doe", "State Senator", "CA");
    entry.district = Some("12".to_string());

    let identity = resolver_for(&store)
        .resolve_or_fallback(ENTITY, &[id(SourceTag::OpenStates, "ocd-person/1")], &entry)
        .await;

    assert!(identity.degraded);
    assert_eq!(identity.canonical_id, fallback_id(ENTITY, &entry));
    assert!(identity.crosswalk_entries.is_empty());
}

#[tokio::test]
async fn test_no_identifiers_uses_fallback_without_degrading() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = Arc::new(SqliteCrosswalk::new(pool));
    let entry = RosterEntry::new("Jane Doe", "Mayor", "TX");

    let identity = resolver_for(&store)
        .resolve_or_fallback(ENTITY, &[], &entry)
        .await;

    assert!(!identity.degraded);
    assert_eq!(identity.canonical_id, fallback_id(ENTITY, &entry));
    // Same name, different state: different fallback
    let other = RosterEntry::new("Jane Doe", "Mayor", "OK");
    assert_ne!(fallback_id(ENTITY, &other), identity.canonical_id);
}
