//! Database schema migrations
//!
//! Versioned, idempotent schema upgrades tracked in the `schema_version`
//! table. Tables are created with the current schema by `init_database`;
//! migrations bring databases written by older builds up to date.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - users upgrade from any older version
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Check before altering** - every migration must be safe to re-run
//! 4. **Use ALTER TABLE** - prefer it over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: Index experiencia.fecha for date-sorted listings
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Index experiencia.fecha");

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_experiencia_fecha ON experiencia(fecha)")
        .execute(pool)
        .await?;

    Ok(())
}
