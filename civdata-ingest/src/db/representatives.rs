//! Representative persistence
//!
//! Upsert with never-downgrade precedence: an existing row is overwritten
//! only when the new quality score beats it by the configured margin, or when
//! the stored score is itself low. Core row and satellites are written in one
//! transaction.

use crate::error::{PipelineError, PipelineResult};
use crate::fusion::{EnrichedRepresentative, VerificationStatus};
use crate::names::normalize_name;
use crate::types::{Contact, ContactKind, JurisdictionLevel, SourceTag};
use async_trait::async_trait;
use civdata_common::config::PersistenceSection;
use serde::{Deserialize, Serialize};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

/// Overwrite thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistencePolicy {
    /// New score must exceed the stored one by more than this
    pub overwrite_margin: f64,
    /// Stored scores below this are always replaced
    pub low_quality_threshold: f64,
}

impl Default for PersistencePolicy {
    fn default() -> Self {
        Self {
            overwrite_margin: 5.0,
            low_quality_threshold: 50.0,
        }
    }
}

impl From<&PersistenceSection> for PersistencePolicy {
    fn from(section: &PersistenceSection) -> Self {
        Self {
            overwrite_margin: section.overwrite_margin,
            low_quality_threshold: section.low_quality_threshold,
        }
    }
}

impl PersistencePolicy {
    pub fn should_overwrite(&self, stored: f64, incoming: f64) -> bool {
        incoming > stored + self.overwrite_margin || stored < self.low_quality_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Inserted,
    Updated,
    Preserved,
}

/// Result of one upsert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertOutcome {
    /// Row id (the stored id when an existing row matched)
    pub id: String,
    pub action: UpsertAction,
    pub previous_score: Option<f64>,
}

/// Persistence sink for merged representatives
#[async_trait]
pub trait RepresentativeStore: Send + Sync {
    async fn upsert(&self, rep: &EnrichedRepresentative) -> PipelineResult<UpsertOutcome>;
}

/// [`RepresentativeStore`] over SQLite
#[derive(Debug, Clone)]
pub struct SqliteRepresentativeStore {
    pool: SqlitePool,
    policy: PersistencePolicy,
}

impl SqliteRepresentativeStore {
    pub fn new(pool: SqlitePool, policy: PersistencePolicy) -> Self {
        Self { pool, policy }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RepresentativeStore for SqliteRepresentativeStore {
    async fn upsert(&self, rep: &EnrichedRepresentative) -> PipelineResult<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let existing = find_existing(&mut tx, rep).await?;
        let outcome = match existing {
            None => {
                insert_core(&mut tx, &rep.id, rep).await?;
                write_satellites(&mut tx, &rep.id, rep).await?;
                UpsertOutcome {
                    id: rep.id.clone(),
                    action: UpsertAction::Inserted,
                    previous_score: None,
                }
            }
            Some((id, stored)) if self.policy.should_overwrite(stored, rep.quality_score()) => {
                update_core(&mut tx, &id, rep).await?;
                write_satellites(&mut tx, &id, rep).await?;
                UpsertOutcome {
                    id,
                    action: UpsertAction::Updated,
                    previous_score: Some(stored),
                }
            }
            Some((id, stored)) => {
                debug!(
                    %id,
                    stored,
                    incoming = rep.quality_score(),
                    "Keeping existing higher-quality record"
                );
                UpsertOutcome {
                    id,
                    action: UpsertAction::Preserved,
                    previous_score: Some(stored),
                }
            }
        };

        tx.commit().await?;

        info!(
            id = %outcome.id,
            action = ?outcome.action,
            score = rep.quality_score(),
            "Representative persisted"
        );
        Ok(outcome)
    }
}

/// Lookup precedence: canonical id, then external ids, then name + level
async fn find_existing(
    tx: &mut Transaction<'_, Sqlite>,
    rep: &EnrichedRepresentative,
) -> PipelineResult<Option<(String, f64)>> {
    let row = sqlx::query("SELECT id, overall_confidence FROM representatives WHERE id = ?")
        .bind(&rep.id)
        .fetch_optional(&mut **tx)
        .await?;
    if let Some(row) = row {
        return Ok(Some((row.get("id"), row.get("overall_confidence"))));
    }

    for (source, id) in rep.identifiers.pairs() {
        let column = match source {
            SourceTag::CongressGov => "bioguide_id",
            SourceTag::Fec => "fec_id",
            SourceTag::OpenStates => "openstates_id",
            SourceTag::GoogleCivic => "google_civic_id",
            SourceTag::Wikipedia => continue,
        };
        let row = sqlx::query(&format!(
            "SELECT id, overall_confidence FROM representatives WHERE {column} = ? LIMIT 1"
        ))
        .bind(&id)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some(row) = row {
            return Ok(Some((row.get("id"), row.get("overall_confidence"))));
        }
    }

    let row = sqlx::query(
        "SELECT id, overall_confidence FROM representatives WHERE name_normalized = ? AND level = ? AND state = ? LIMIT 1",
    )
    .bind(normalize_name(&rep.name))
    .bind(rep.level.as_str())
    .bind(&rep.state)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|row| (row.get("id"), row.get("overall_confidence"))))
}

async fn insert_core(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    rep: &EnrichedRepresentative,
) -> PipelineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO representatives (
            id, name, name_normalized, office, level, state, district,
            party, email, phone, website, photo_url, biography,
            bioguide_id, fec_id, openstates_id, google_civic_id,
            committees, finance, data_sources, conflicts,
            overall_confidence, primary_source_score, secondary_source_score,
            data_completeness, source_reliability,
            verification_status, identity_degraded, last_verified
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&rep.name)
    .bind(normalize_name(&rep.name))
    .bind(&rep.office)
    .bind(rep.level.as_str())
    .bind(&rep.state)
    .bind(&rep.district)
    .bind(&rep.party)
    .bind(&rep.email)
    .bind(&rep.phone)
    .bind(&rep.website)
    .bind(&rep.photo_url)
    .bind(&rep.biography)
    .bind(&rep.identifiers.bioguide_id)
    .bind(&rep.identifiers.fec_id)
    .bind(&rep.identifiers.openstates_id)
    .bind(&rep.identifiers.google_civic_id)
    .bind(serde_json::to_string(&rep.committees)?)
    .bind(rep.finance.as_ref().map(serde_json::to_string).transpose()?)
    .bind(serde_json::to_string(&rep.data_sources)?)
    .bind(serde_json::to_string(&rep.conflicts)?)
    .bind(rep.data_quality.overall_confidence)
    .bind(rep.data_quality.primary_source_score)
    .bind(rep.data_quality.secondary_source_score)
    .bind(rep.data_quality.data_completeness)
    .bind(rep.data_quality.source_reliability)
    .bind(rep.verification_status.as_str())
    .bind(rep.identity_degraded)
    .bind(rep.last_verified.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn update_core(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    rep: &EnrichedRepresentative,
) -> PipelineResult<()> {
    sqlx::query(
        r#"
        UPDATE representatives SET
            name = ?, name_normalized = ?, office = ?, level = ?, state = ?, district = ?,
            party = ?, email = ?, phone = ?, website = ?, photo_url = ?, biography = ?,
            bioguide_id = COALESCE(?, bioguide_id),
            fec_id = COALESCE(?, fec_id),
            openstates_id = COALESCE(?, openstates_id),
            google_civic_id = COALESCE(?, google_civic_id),
            committees = ?, finance = ?, data_sources = ?, conflicts = ?,
            overall_confidence = ?, primary_source_score = ?, secondary_source_score = ?,
            data_completeness = ?, source_reliability = ?,
            verification_status = ?, identity_degraded = ?, last_verified = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&rep.name)
    .bind(normalize_name(&rep.name))
    .bind(&rep.office)
    .bind(rep.level.as_str())
    .bind(&rep.state)
    .bind(&rep.district)
    .bind(&rep.party)
    .bind(&rep.email)
    .bind(&rep.phone)
    .bind(&rep.website)
    .bind(&rep.photo_url)
    .bind(&rep.biography)
    .bind(&rep.identifiers.bioguide_id)
    .bind(&rep.identifiers.fec_id)
    .bind(&rep.identifiers.openstates_id)
    .bind(&rep.identifiers.google_civic_id)
    .bind(serde_json::to_string(&rep.committees)?)
    .bind(rep.finance.as_ref().map(serde_json::to_string).transpose()?)
    .bind(serde_json::to_string(&rep.data_sources)?)
    .bind(serde_json::to_string(&rep.conflicts)?)
    .bind(rep.data_quality.overall_confidence)
    .bind(rep.data_quality.primary_source_score)
    .bind(rep.data_quality.secondary_source_score)
    .bind(rep.data_quality.data_completeness)
    .bind(rep.data_quality.source_reliability)
    .bind(rep.verification_status.as_str())
    .bind(rep.identity_degraded)
    .bind(rep.last_verified.to_rfc3339())
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Replace all satellite rows for `id`
async fn write_satellites(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    rep: &EnrichedRepresentative,
) -> PipelineResult<()> {
    for table in [
        "representative_contacts",
        "representative_photos",
        "representative_activity",
        "representative_social_media",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE representative_id = ?"))
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }

    for (position, contact) in rep.contacts.iter().enumerate() {
        sqlx::query(
            "INSERT INTO representative_contacts (representative_id, position, kind, value, label, source) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(position as i64)
        .bind(contact.kind.as_str())
        .bind(&contact.value)
        .bind(&contact.label)
        .bind(contact.source.as_str())
        .execute(&mut **tx)
        .await?;
    }

    for (position, photo) in rep.photos.iter().enumerate() {
        sqlx::query(
            "INSERT INTO representative_photos (representative_id, position, url, attribution, source) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(position as i64)
        .bind(&photo.url)
        .bind(&photo.attribution)
        .bind(photo.source.as_str())
        .execute(&mut **tx)
        .await?;
    }

    for (position, item) in rep.activity.iter().enumerate() {
        sqlx::query(
            "INSERT INTO representative_activity (representative_id, position, kind, title, detail, date, url, source) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(position as i64)
        .bind(item.kind.as_str())
        .bind(&item.title)
        .bind(&item.detail)
        .bind(item.date.map(|d| d.to_string()))
        .bind(&item.url)
        .bind(item.source.as_str())
        .execute(&mut **tx)
        .await?;
    }

    for (position, social) in rep.social_media.iter().enumerate() {
        sqlx::query(
            "INSERT INTO representative_social_media (representative_id, position, platform, handle, url, source) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(position as i64)
        .bind(&social.platform)
        .bind(&social.handle)
        .bind(&social.url)
        .bind(social.source.as_str())
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Stored representative summary (core row plus contacts)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRepresentative {
    pub id: String,
    pub name: String,
    pub level: JurisdictionLevel,
    pub state: String,
    pub party: Option<String>,
    pub phone: Option<String>,
    pub overall_confidence: f64,
    pub verification_status: VerificationStatus,
    pub data_sources: Vec<SourceTag>,
    pub contacts: Vec<Contact>,
    pub photo_count: i64,
    pub activity_count: i64,
    pub social_count: i64,
}

/// Load representative by id
pub async fn load_representative(
    pool: &SqlitePool,
    id: &str,
) -> PipelineResult<Option<StoredRepresentative>> {
    let Some(row) = sqlx::query(
        r#"
        SELECT id, name, level, state, party, phone, overall_confidence,
               verification_status, data_sources
        FROM representatives
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let level: String = row.get("level");
    let status: String = row.get("verification_status");
    let data_sources: String = row.get("data_sources");

    let contact_rows = sqlx::query(
        "SELECT kind, value, label, source FROM representative_contacts WHERE representative_id = ? ORDER BY position",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let mut contacts = Vec::with_capacity(contact_rows.len());
    for row in contact_rows {
        let kind: String = row.get("kind");
        let source: String = row.get("source");
        contacts.push(Contact {
            kind: kind.parse::<ContactKind>().map_err(PipelineError::Persistence)?,
            value: row.get("value"),
            label: row.get("label"),
            source: source.parse().map_err(PipelineError::Persistence)?,
        });
    }

    Ok(Some(StoredRepresentative {
        id: row.get("id"),
        name: row.get("name"),
        level: level.parse().map_err(PipelineError::Persistence)?,
        state: row.get("state"),
        party: row.get("party"),
        phone: row.get("phone"),
        overall_confidence: row.get("overall_confidence"),
        verification_status: status.parse().map_err(PipelineError::Persistence)?,
        data_sources: serde_json::from_str(&data_sources)?,
        contacts,
        photo_count: count_rows(pool, "representative_photos", id).await?,
        activity_count: count_rows(pool, "representative_activity", id).await?,
        social_count: count_rows(pool, "representative_social_media", id).await?,
    }))
}

async fn count_rows(pool: &SqlitePool, table: &str, id: &str) -> PipelineResult<i64> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE representative_id = ?"
    ))
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_policy() {
        let policy = PersistencePolicy::default();
        // Never downgrade, never churn on small gains
        assert!(!policy.should_overwrite(85.0, 80.0));
        assert!(!policy.should_overwrite(85.0, 90.0));
        assert!(policy.should_overwrite(85.0, 90.5));
        // Low stored quality is always replaced
        assert!(policy.should_overwrite(40.0, 20.0));
    }
}
