//! Tests for database initialization and schema migrations

use experiencia_common::db::init::{connect, init_database, BUSY_TIMEOUT_MS};
use experiencia_common::db::migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("experiencia.db");
    assert!(!db_path.exists());

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("deeper").join("experiencia.db");

    init_database(&db_path).await.expect("Should create nested path");
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("experiencia.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO experiencia (titulo) VALUES ('Kept across restarts')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.expect("Failed to open existing database");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM experiencia")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_schema_version_recorded() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("experiencia.db")).await.unwrap();

    let version = get_schema_version(&pool).await.unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);

    // Re-running is a no-op
    run_migrations(&pool).await.unwrap();
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_migration_indexes_unversioned_table() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("unversioned.db");

    // A table created before schema_version was tracked
    {
        let pool = connect(&db_path).await.unwrap();
        sqlx::query(
            "CREATE TABLE experiencia (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                titulo TEXT NOT NULL,
                descripcion TEXT,
                localizacion TEXT,
                fecha TEXT,
                version INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO experiencia (titulo) VALUES ('Existing row')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

    let has_index: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_experiencia_fecha'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(has_index, 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM experiencia")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_pragmas_apply_to_every_connection() {
    let dir = TempDir::new().unwrap();
    let pool = connect(&dir.path().join("pragmas.db")).await.unwrap();

    // Hold two connections at once so both are distinct
    let mut first = pool.acquire().await.unwrap();
    let mut second = pool.acquire().await.unwrap();

    for conn in [&mut first, &mut second] {
        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);

        let busy_timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        assert_eq!(busy_timeout, BUSY_TIMEOUT_MS as i64);
    }
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let dir = TempDir::new().unwrap();
    let pool = connect(&dir.path().join("wal.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
