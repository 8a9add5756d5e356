//! Unit records
//!
//! The identifier (instruction number) is the business key; the UNIQUE
//! constraint on it is the only duplicate detection.

use lltrack_common::db::Unit;
use lltrack_common::{time, Result, UnitStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::{begin_write, non_blank};

const UNIT_COLUMNS: &str = "id, identifier, name, status, current_sample, created_at, updated_at, image_path, notes";

/// Fields supplied when creating a unit
#[derive(Debug, Clone, Default)]
pub struct NewUnit {
    pub identifier: String,
    /// Display name; defaults to the identifier
    pub name: Option<String>,
    pub image_path: Option<String>,
    pub notes: Option<String>,
}

impl NewUnit {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }
}

pub(crate) fn unit_from_row(row: &SqliteRow) -> Result<Unit> {
    Ok(Unit {
        id: row.try_get("id")?,
        identifier: row.try_get("identifier")?,
        name: row.try_get("name")?,
        status: row.try_get("status")?,
        current_sample: row.try_get("current_sample")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        image_path: row.try_get("image_path")?,
        notes: row.try_get("notes")?,
    })
}

/// Insert a unit in the initial status
///
/// Returns `(true, Some(id))` on insert and `(false, None)` when the
/// identifier already exists.
pub async fn create_unit(pool: &SqlitePool, unit: &NewUnit) -> Result<(bool, Option<i64>)> {
    let name = non_blank(unit.name.as_deref()).unwrap_or(&unit.identifier);
    let now = time::now_db_string();

    let result = sqlx::query(
        r#"
        INSERT INTO units (identifier, name, status, created_at, updated_at, image_path, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&unit.identifier)
    .bind(name)
    .bind(UnitStatus::INITIAL.as_str())
    .bind(&now)
    .bind(&now)
    .bind(non_blank(unit.image_path.as_deref()))
    .bind(non_blank(unit.notes.as_deref()))
    .execute(pool)
    .await
    .map_err(lltrack_common::Error::from);

    match result {
        Ok(done) => {
            let id = done.last_insert_rowid();
            info!(id, identifier = %unit.identifier, "Unit created");
            Ok((true, Some(id)))
        }
        Err(e) if e.is_unique_violation() => {
            debug!(identifier = %unit.identifier, "Unit already exists");
            Ok((false, None))
        }
        Err(e) => Err(e),
    }
}

/// Look up a unit id by its identifier
pub async fn find_unit_id(pool: &SqlitePool, identifier: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM units WHERE identifier = ?")
        .bind(identifier)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

pub async fn get_unit(pool: &SqlitePool, id: i64) -> Result<Option<Unit>> {
    let row = sqlx::query(&format!("SELECT {} FROM units WHERE id = ?", UNIT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(unit_from_row).transpose()
}

/// All units ordered by display name
pub async fn list_units(pool: &SqlitePool) -> Result<Vec<Unit>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM units ORDER BY name, id",
        UNIT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(unit_from_row).collect()
}

/// Delete a unit together with its history and samples
///
/// Returns whether a unit row existed. Children are removed explicitly in the
/// same transaction as well as through ON DELETE CASCADE, so databases
/// opened without foreign key enforcement are cleaned up too.
pub async fn delete_unit(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = begin_write(pool).await?;

    sqlx::query("DELETE FROM status_history WHERE unit_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM samples WHERE unit_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM units WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    if deleted > 0 {
        info!(id, "Unit deleted");
    }
    Ok(deleted > 0)
}
