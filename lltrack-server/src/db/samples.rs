//! Sample log
//!
//! Adding a sample also copies its name into `units.current_sample`, so the
//! unit list can show the latest sample without a join.

use lltrack_common::db::Sample;
use lltrack_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::{begin_write, non_blank};

/// Fields supplied when logging a sample
#[derive(Debug, Clone, Default)]
pub struct NewSample {
    pub sample_name: String,
    pub material: Option<String>,
    pub notes: Option<String>,
}

fn sample_from_row(row: &SqliteRow) -> Result<Sample> {
    Ok(Sample {
        id: row.try_get("id")?,
        unit_id: row.try_get("unit_id")?,
        sample_name: row.try_get("sample_name")?,
        material: row.try_get("material")?,
        created_at: row.try_get("created_at")?,
        notes: row.try_get("notes")?,
    })
}

/// Log a sample against a unit and make it the unit's current sample
///
/// Returns `false` when the unit does not exist; nothing is written then.
pub async fn add_sample(pool: &SqlitePool, unit_id: i64, sample: &NewSample) -> Result<bool> {
    let mut tx = begin_write(pool).await?;
    let now = time::now_db_string();

    let updated = sqlx::query("UPDATE units SET current_sample = ?, updated_at = ? WHERE id = ?")
        .bind(&sample.sample_name)
        .bind(&now)
        .bind(unit_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if updated == 0 {
        debug!(unit_id, "Sample for unknown unit");
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO samples (unit_id, sample_name, material, created_at, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(unit_id)
    .bind(&sample.sample_name)
    .bind(non_blank(sample.material.as_deref()))
    .bind(&now)
    .bind(non_blank(sample.notes.as_deref()))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(unit_id, sample = %sample.sample_name, "Sample added");
    Ok(true)
}

/// Samples of a unit, most recent first
pub async fn get_samples(pool: &SqlitePool, unit_id: i64) -> Result<Vec<Sample>> {
    let rows = sqlx::query(
        r#"
        SELECT id, unit_id, sample_name, material, created_at, notes
        FROM samples
        WHERE unit_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(unit_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(sample_from_row).collect()
}
