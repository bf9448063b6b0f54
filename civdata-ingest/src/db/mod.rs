//! Database access for civdata-ingest
//!
//! SQLite persistence sink: the `representatives` core table, its four
//! satellite tables, and the `id_crosswalk` table.

pub mod crosswalk;
pub mod representatives;

pub use crosswalk::SqliteCrosswalk;
pub use representatives::{
    load_representative, PersistencePolicy, RepresentativeStore, SqliteRepresentativeStore,
    StoredRepresentative, UpsertAction, UpsertOutcome,
};

use crate::error::PipelineResult;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the database file and initialize tables
pub async fn init_database_pool(db_path: &Path) -> PipelineResult<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// In-memory database (dry runs, tests)
///
/// A single connection: every connection to `sqlite::memory:` is its own
/// database.
pub async fn init_memory_pool() -> PipelineResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create all tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> PipelineResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS representatives (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            name_normalized TEXT NOT NULL,
            office TEXT NOT NULL,
            level TEXT NOT NULL,
            state TEXT NOT NULL,
            district TEXT,
            party TEXT,
            email TEXT,
            phone TEXT,
            website TEXT,
            photo_url TEXT,
            biography TEXT,
            bioguide_id TEXT,
            fec_id TEXT,
            openstates_id TEXT,
            google_civic_id TEXT,
            committees TEXT NOT NULL DEFAULT '[]',
            finance TEXT,
            data_sources TEXT NOT NULL DEFAULT '[]',
            conflicts TEXT NOT NULL DEFAULT '[]',
            overall_confidence REAL NOT NULL,
            primary_source_score REAL NOT NULL DEFAULT 0.0,
            secondary_source_score REAL NOT NULL DEFAULT 0.0,
            data_completeness REAL NOT NULL DEFAULT 0.0,
            source_reliability REAL NOT NULL DEFAULT 0.0,
            verification_status TEXT NOT NULL,
            identity_degraded INTEGER NOT NULL DEFAULT 0,
            last_verified TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    for (index, column) in [
        ("idx_representatives_bioguide", "bioguide_id"),
        ("idx_representatives_fec", "fec_id"),
        ("idx_representatives_openstates", "openstates_id"),
        ("idx_representatives_google_civic", "google_civic_id"),
        ("idx_representatives_name_level_state", "name_normalized, level, state"),
    ] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {index} ON representatives ({column})"
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS representative_contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            representative_id TEXT NOT NULL REFERENCES representatives(id),
            position INTEGER NOT NULL,
            kind TEXT NOT NULL,
            value TEXT NOT NULL,
            label TEXT,
            source TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS representative_photos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            representative_id TEXT NOT NULL REFERENCES representatives(id),
            position INTEGER NOT NULL,
            url TEXT NOT NULL,
            attribution TEXT,
            source TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS representative_activity (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            representative_id TEXT NOT NULL REFERENCES representatives(id),
            position INTEGER NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            detail TEXT,
            date TEXT,
            url TEXT,
            source TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS representative_social_media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            representative_id TEXT NOT NULL REFERENCES representatives(id),
            position INTEGER NOT NULL,
            platform TEXT NOT NULL,
            handle TEXT NOT NULL,
            url TEXT,
            source TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS id_crosswalk (
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            canonical_id TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (source, source_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_id_crosswalk_canonical ON id_crosswalk (canonical_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (representatives, satellites, id_crosswalk)");

    Ok(())
}
