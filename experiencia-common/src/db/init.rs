//! Database initialization
//!
//! The primary store is created on first run with the current schema; later
//! runs open it and apply pending migrations. Both the primary store and the
//! search index open their SQLite files through [`connect`] so they share the
//! same pragmas.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Open (creating if needed) a SQLite database file
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Applied to every pooled connection. WAL allows concurrent readers with one writer.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Initialize the primary store: connect, create tables, run migrations
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    let pool = connect(db_path).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Idempotent - safe to call on every startup
    create_schema_version_table(&pool).await?;
    create_experiencia_table(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the experiencia table
///
/// `id` is assigned by SQLite and never reused (AUTOINCREMENT).
/// `version` counts writes to the row and orders search index mirrors.
pub async fn create_experiencia_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS experiencia (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titulo TEXT NOT NULL,
            descripcion TEXT,
            localizacion TEXT,
            fecha TEXT,
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
