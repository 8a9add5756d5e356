//! Status workflow: transitions and their audit trail
//!
//! Transitions are unrestricted; any status may follow any other. Each
//! successful change updates the unit and appends one history row inside a
//! single transaction.

use lltrack_common::db::StatusHistoryEntry;
use lltrack_common::{time, Result, UnitStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::{begin_write, non_blank};

/// Maximum number of history entries returned per unit
pub const HISTORY_LIMIT: i64 = 50;

fn entry_from_row(row: &SqliteRow) -> Result<StatusHistoryEntry> {
    Ok(StatusHistoryEntry {
        id: row.try_get("id")?,
        unit_id: row.try_get("unit_id")?,
        old_status: row.try_get("old_status")?,
        new_status: row.try_get("new_status")?,
        changed_at: row.try_get("changed_at")?,
        notes: row.try_get("notes")?,
    })
}

/// Move a unit to `new_status`, recording the transition
///
/// Returns `false` without touching the database when `new_status` is not a
/// known status, and `false` when the unit does not exist.
pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    new_status: &str,
    note: Option<&str>,
) -> Result<bool> {
    let Ok(status) = new_status.parse::<UnitStatus>() else {
        debug!(id, new_status, "Rejected unknown status");
        return Ok(false);
    };

    let mut tx = begin_write(pool).await?;

    let old_status: Option<String> = sqlx::query_scalar("SELECT status FROM units WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(old_status) = old_status else {
        debug!(id, "Status change for unknown unit");
        return Ok(false);
    };

    let now = time::now_db_string();

    sqlx::query("UPDATE units SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO status_history (unit_id, old_status, new_status, changed_at, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&old_status)
    .bind(status.as_str())
    .bind(&now)
    .bind(non_blank(note))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(id, from = %old_status, to = %status, "Unit status changed");
    Ok(true)
}

/// Most recent transitions first, at most [`HISTORY_LIMIT`] entries
pub async fn get_history(pool: &SqlitePool, unit_id: i64) -> Result<Vec<StatusHistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, unit_id, old_status, new_status, changed_at, notes
        FROM status_history
        WHERE unit_id = ?
        ORDER BY changed_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(unit_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}
