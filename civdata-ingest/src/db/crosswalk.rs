//! SQLite crosswalk store
//!
//! `(source, source_id)` is the primary key, so a pair maps to exactly one
//! canonical id. `link` never overwrites; only `repoint` moves pairs.

use crate::error::{PipelineError, PipelineResult};
use crate::identity::{CrosswalkEntry, CrosswalkStore};
use crate::types::SourceTag;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// [`CrosswalkStore`] over the `id_crosswalk` table
#[derive(Debug, Clone)]
pub struct SqliteCrosswalk {
    pool: SqlitePool,
}

impl SqliteCrosswalk {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrosswalkStore for SqliteCrosswalk {
    async fn lookup(&self, source: SourceTag, source_id: &str) -> PipelineResult<Option<String>> {
        let canonical: Option<String> = sqlx::query_scalar(
            "SELECT canonical_id FROM id_crosswalk WHERE source = ? AND source_id = ?",
        )
        .bind(source.as_str())
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(canonical)
    }

    async fn link(
        &self,
        canonical_id: &str,
        entity_type: &str,
        source: SourceTag,
        source_id: &str,
    ) -> PipelineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO id_crosswalk (source, source_id, canonical_id, entity_type)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(source, source_id) DO NOTHING
            "#,
        )
        .bind(source.as_str())
        .bind(source_id)
        .bind(canonical_id)
        .bind(entity_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn repoint(&self, from: &str, to: &str) -> PipelineResult<()> {
        let moved = sqlx::query("UPDATE id_crosswalk SET canonical_id = ? WHERE canonical_id = ?")
            .bind(to)
            .bind(from)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!(from, to, moved, "Re-pointed crosswalk entries");
        Ok(())
    }

    async fn entries(&self, canonical_id: &str) -> PipelineResult<Vec<CrosswalkEntry>> {
        let rows = sqlx::query(
            "SELECT source, source_id FROM id_crosswalk WHERE canonical_id = ?",
        )
        .bind(canonical_id)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let source: String = row.get("source");
            entries.push(CrosswalkEntry {
                source: source.parse().map_err(PipelineError::Resolution)?,
                source_id: row.get("source_id"),
            });
        }
        entries.sort_by(|a, b| (a.source, &a.source_id).cmp(&(b.source, &b.source_id)));
        Ok(entries)
    }
}
