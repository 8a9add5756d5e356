//! Database initialization
//!
//! Creates the database file and the three tracking tables on first run.
//! `CREATE TABLE IF NOT EXISTS` makes initialization idempotent; there is no
//! migration step.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // foreign_keys is a per-connection pragma; set it through the connect
    // options so every pooled connection enforces ON DELETE CASCADE
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to a single connection that never expires; every connection to
/// `sqlite::memory:` would otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes if missing
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_units_table(pool).await?;
    create_status_history_table(pool).await?;
    create_samples_table(pool).await?;
    Ok(())
}

async fn create_units_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            identifier TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'inserted',
            current_sample TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            image_path TEXT,
            notes TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_units_name ON units(name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_status_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS status_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE CASCADE,
            old_status TEXT,
            new_status TEXT NOT NULL,
            changed_at TEXT NOT NULL,
            notes TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_status_history_unit ON status_history(unit_id, changed_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_samples_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE CASCADE,
            sample_name TEXT NOT NULL,
            material TEXT,
            created_at TEXT NOT NULL,
            notes TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_unit ON samples(unit_id, created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
