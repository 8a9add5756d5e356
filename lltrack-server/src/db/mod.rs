//! Record store: units, status history and samples
//!
//! Every function takes the shared pool and returns `lltrack_common::Result`.
//! Soft failures (duplicate identifier, unknown unit, unknown status) are
//! reported as booleans; anything else from SQLite propagates as an error.

use lltrack_common::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};

pub mod history;
pub mod samples;
pub mod units;

pub use history::{get_history, set_status, HISTORY_LIMIT};
pub use samples::{add_sample, get_samples, NewSample};
pub use units::{create_unit, delete_unit, find_unit_id, get_unit, list_units, NewUnit};

/// Start a write transaction holding the database write lock from the outset
///
/// A deferred transaction that reads before writing cannot wait out another
/// writer: SQLite reports `SQLITE_BUSY` at the lock upgrade without consulting
/// the busy timeout. `BEGIN IMMEDIATE` queues on the busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Treat blank optional text as absent
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
