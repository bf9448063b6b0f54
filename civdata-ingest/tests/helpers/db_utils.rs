//! Database Test Utilities

use anyhow::Result;
use civdata_ingest::db;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create temporary on-disk database with tables initialized
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("civdata_test.db");
    let pool = db::init_database_pool(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Get all table names in database
pub async fn get_table_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let tables = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(tables)
}

/// Row count of a table
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
