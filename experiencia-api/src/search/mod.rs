//! Search index
//!
//! A denormalised, query-optimised copy of the primary store kept in its own
//! SQLite database. It has no write path of its own: every document arrives
//! as a mirror of a committed primary write and may lag behind it.

pub mod query;

use async_trait::async_trait;
use chrono::Utc;
use experiencia_common::{db, Error, Experiencia, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;
use tracing::debug;

use crate::pagination::{Page, Pageable};
pub use query::SearchQuery;

/// Operations the service needs from a search backend
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Upsert the document for `experiencia.id()`
    async fn save(&self, experiencia: &Experiencia) -> Result<()>;

    /// Remove a document; missing ids are not an error
    async fn delete_by_id(&self, id: i64) -> Result<()>;

    /// Query the index (see [`query`] for the syntax)
    async fn search(&self, query: &str, pageable: &Pageable) -> Result<Page<Experiencia>>;

    async fn count(&self) -> Result<i64>;

    /// Drop every document
    async fn clear(&self) -> Result<()>;
}

fn index_error(e: sqlx::Error) -> Error {
    Error::Search(e.to_string())
}

/// Search index stored in a separate SQLite database file
#[derive(Clone)]
pub struct SqliteSearchIndex {
    pool: SqlitePool,
}

impl SqliteSearchIndex {
    /// Open (creating if needed) the index database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating the index table if missing
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS experiencia_index (
                id INTEGER PRIMARY KEY,
                titulo TEXT,
                descripcion TEXT,
                localizacion TEXT,
                fecha TEXT,
                version INTEGER NOT NULL,
                indexed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SearchIndex for SqliteSearchIndex {
    /// Older versions never overwrite newer ones, so a mirror that arrives
    /// late for an earlier primary write is dropped.
    async fn save(&self, experiencia: &Experiencia) -> Result<()> {
        let id = experiencia
            .id()
            .ok_or_else(|| Error::Search("cannot index a record without id".to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO experiencia_index (id, titulo, descripcion, localizacion, fecha, version, indexed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                titulo = excluded.titulo,
                descripcion = excluded.descripcion,
                localizacion = excluded.localizacion,
                fecha = excluded.fecha,
                version = excluded.version,
                indexed_at = excluded.indexed_at
            WHERE excluded.version >= experiencia_index.version
            "#,
        )
        .bind(id)
        .bind(experiencia.titulo())
        .bind(experiencia.descripcion())
        .bind(experiencia.localizacion())
        .bind(experiencia.fecha())
        .bind(experiencia.version())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(index_error)?;

        if result.rows_affected() == 0 {
            debug!(id, version = experiencia.version(), "Skipped stale index write");
        }

        Ok(())
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM experiencia_index WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(index_error)?;

        Ok(())
    }

    async fn search(&self, query: &str, pageable: &Pageable) -> Result<Page<Experiencia>> {
        let parsed = SearchQuery::parse(query);

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM experiencia_index");
        parsed.push_where(&mut count_qb);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(index_error)?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, titulo, descripcion, localizacion, fecha, version FROM experiencia_index",
        );
        parsed.push_where(&mut qb);
        qb.push(format!(" ORDER BY {} LIMIT ", pageable.order_by()));
        qb.push_bind(pageable.size);
        qb.push(" OFFSET ");
        qb.push_bind(pageable.offset());

        let rows = qb
            .build_query_as::<Experiencia>()
            .fetch_all(&self.pool)
            .await
            .map_err(index_error)?;

        Ok(Page::new(rows, pageable, total))
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM experiencia_index")
            .fetch_one(&self.pool)
            .await
            .map_err(index_error)
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM experiencia_index")
            .execute(&self.pool)
            .await
            .map_err(index_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqliteSearchIndex) {
        let dir = TempDir::new().unwrap();
        let index = SqliteSearchIndex::open(&dir.path().join("search.db")).await.unwrap();
        (dir, index)
    }

    fn doc(id: i64, titulo: &str, localizacion: &str, version: i64) -> Experiencia {
        Experiencia::new()
            .with_id(id)
            .with_titulo(titulo)
            .with_localizacion(localizacion)
            .with_fecha(NaiveDate::from_ymd_opt(2020, 1, id as u32).unwrap())
            .with_version(version)
    }

    fn ids(page: &Page<Experiencia>) -> Vec<i64> {
        page.content.iter().filter_map(|e| e.id()).collect()
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let (_dir, index) = setup().await;

        index.save(&doc(1, "Trip to coast", "Coastline", 1)).await.unwrap();
        index.save(&doc(1, "Trip to coast", "Mountains", 2)).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        let page = index.search("localizacion:Mountains", &Pageable::default()).await.unwrap();
        assert_eq!(ids(&page), vec![1]);
    }

    #[tokio::test]
    async fn test_stale_version_is_ignored() {
        let (_dir, index) = setup().await;

        index.save(&doc(1, "Trip to coast", "Mountains", 3)).await.unwrap();
        index.save(&doc(1, "Trip to coast", "Coastline", 2)).await.unwrap();

        let page = index.search("Mountains", &Pageable::default()).await.unwrap();
        assert_eq!(ids(&page), vec![1]);
        let page = index.search("Coastline", &Pageable::default()).await.unwrap();
        assert!(page.content.is_empty());
    }

    #[tokio::test]
    async fn test_save_without_id_fails() {
        let (_dir, index) = setup().await;
        let result = index.save(&Experiencia::new().with_titulo("Transient")).await;
        assert!(matches!(result, Err(Error::Search(_))));
    }

    #[tokio::test]
    async fn test_search_queries() {
        let (_dir, index) = setup().await;
        index.save(&doc(1, "Trip to coast", "Coastline", 1)).await.unwrap();
        index.save(&doc(2, "Mountain hike", "Pyrenees", 1)).await.unwrap();
        index.save(&doc(3, "Coastal walk", "Galicia", 1)).await.unwrap();

        let all = Pageable::default();
        assert_eq!(ids(&index.search("*", &all).await.unwrap()), vec![1, 2, 3]);
        assert_eq!(ids(&index.search("coast", &all).await.unwrap()), vec![1, 3]);
        assert_eq!(ids(&index.search("coast -galicia", &all).await.unwrap()), vec![1]);
        assert_eq!(ids(&index.search("hike OR galicia", &all).await.unwrap()), vec![2, 3]);
        assert_eq!(ids(&index.search("titulo:\"to coast\"", &all).await.unwrap()), vec![1]);
        assert_eq!(ids(&index.search("id:2", &all).await.unwrap()), vec![2]);
        assert_eq!(ids(&index.search("fecha:2020-01-03", &all).await.unwrap()), vec![3]);
        assert!(index.search("nothing-here", &all).await.unwrap().content.is_empty());
    }

    #[tokio::test]
    async fn test_negation_keeps_documents_with_absent_fields() {
        let (_dir, index) = setup().await;
        // No descripcion, no fecha
        let sparse = Experiencia::new()
            .with_id(1)
            .with_titulo("Trip to coast")
            .with_localizacion("Coastline")
            .with_version(1);
        index.save(&sparse).await.unwrap();
        index.save(&doc(2, "Coastal walk", "Galicia", 1)).await.unwrap();

        let all = Pageable::default();
        assert_eq!(ids(&index.search("coast -galicia", &all).await.unwrap()), vec![1]);
        assert_eq!(ids(&index.search("-fecha:2020-01-02", &all).await.unwrap()), vec![1]);
        assert_eq!(ids(&index.search("NOT descripcion:rain", &all).await.unwrap()), vec![1, 2]);
        assert_eq!(ids(&index.search("+coast -walk", &all).await.unwrap()), vec![1]);
        assert_eq!(ids(&index.search("-fecha:2020*", &all).await.unwrap()), vec![1]);
        assert!(index.search("descripcion:rain", &all).await.unwrap().content.is_empty());
    }

    #[tokio::test]
    async fn test_search_pages() {
        let (_dir, index) = setup().await;
        for id in 1..=5 {
            index.save(&doc(id, "Trip", "Somewhere", 1)).await.unwrap();
        }

        let page = index.search("trip", &Pageable::of(1, 2)).await.unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(ids(&page), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (_dir, index) = setup().await;
        index.save(&doc(1, "Trip to coast", "Coastline", 1)).await.unwrap();
        index.save(&doc(2, "Mountain hike", "Pyrenees", 1)).await.unwrap();

        index.delete_by_id(1).await.unwrap();
        index.delete_by_id(1).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
