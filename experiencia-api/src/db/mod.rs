//! Primary store access
//!
//! The `experiencia` table is the system of record. Every write runs inside
//! a [`StoreTx`]: the transaction commits explicitly and rolls back when
//! dropped, so no exit path leaves it open.

use experiencia_common::{Error, Experiencia, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::pagination::{Page, Pageable};

const COLUMNS: &str = "id, titulo, descripcion, localizacion, fecha, version";

/// Gateway to the primary store
#[derive(Clone)]
pub struct ExperienciaStore {
    pool: SqlitePool,
}

impl ExperienciaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write transaction
    pub async fn begin(&self) -> Result<StoreTx> {
        Ok(StoreTx {
            tx: self.pool.begin().await?,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Experiencia>> {
        let row = sqlx::query_as::<_, Experiencia>(&format!(
            "SELECT {} FROM experiencia WHERE id = ?",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn exists_by_id(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM experiencia WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM experiencia")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// One page of records in the requested order (identity order by default)
    pub async fn find_all(&self, pageable: &Pageable) -> Result<Page<Experiencia>> {
        let total = self.count().await?;

        let rows = sqlx::query_as::<_, Experiencia>(&format!(
            "SELECT {} FROM experiencia ORDER BY {} LIMIT ? OFFSET ?",
            COLUMNS,
            pageable.order_by()
        ))
        .bind(pageable.size)
        .bind(pageable.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows, pageable, total))
    }

    /// Up to `limit` records with id greater than `after_id`, in id order
    pub async fn find_batch_after(&self, after_id: i64, limit: i64) -> Result<Vec<Experiencia>> {
        let rows = sqlx::query_as::<_, Experiencia>(&format!(
            "SELECT {} FROM experiencia WHERE id > ? ORDER BY id ASC LIMIT ?",
            COLUMNS
        ))
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Save in a transaction of its own
    pub async fn save(&self, experiencia: Experiencia) -> Result<Experiencia> {
        let mut tx = self.begin().await?;
        let saved = tx.save(experiencia).await?;
        tx.commit().await?;
        Ok(saved)
    }

    /// Delete in a transaction of its own; returns whether a row was removed
    pub async fn delete_by_id(&self, id: i64) -> Result<bool> {
        let mut tx = self.begin().await?;
        let deleted = tx.delete_by_id(id).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

/// A write transaction against the primary store
///
/// Dropping it without calling [`StoreTx::commit`] rolls back.
pub struct StoreTx {
    tx: Transaction<'static, Sqlite>,
}

impl StoreTx {
    pub async fn exists_by_id(&mut self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM experiencia WHERE id = ?)")
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(exists)
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Experiencia>> {
        let row = sqlx::query_as::<_, Experiencia>(&format!(
            "SELECT {} FROM experiencia WHERE id = ?",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row)
    }

    /// Insert when `id` is absent, otherwise overwrite the row with that id
    ///
    /// Returns the stored record with its assigned id and new version.
    /// Updating an id that does not exist fails with `NotFound`.
    pub async fn save(&mut self, experiencia: Experiencia) -> Result<Experiencia> {
        match experiencia.id() {
            None => self.insert(&experiencia).await,
            Some(id) => self.update(id, &experiencia).await,
        }
    }

    async fn insert(&mut self, e: &Experiencia) -> Result<Experiencia> {
        let saved = sqlx::query_as::<_, Experiencia>(&format!(
            "INSERT INTO experiencia (titulo, descripcion, localizacion, fecha, version)
             VALUES (?, ?, ?, ?, 1)
             RETURNING {}",
            COLUMNS
        ))
        .bind(e.titulo())
        .bind(e.descripcion())
        .bind(e.localizacion())
        .bind(e.fecha())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(saved)
    }

    async fn update(&mut self, id: i64, e: &Experiencia) -> Result<Experiencia> {
        let saved = sqlx::query_as::<_, Experiencia>(&format!(
            "UPDATE experiencia
             SET titulo = ?, descripcion = ?, localizacion = ?, fecha = ?, version = version + 1
             WHERE id = ?
             RETURNING {}",
            COLUMNS
        ))
        .bind(e.titulo())
        .bind(e.descripcion())
        .bind(e.localizacion())
        .bind(e.fecha())
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        saved.ok_or_else(|| Error::NotFound(format!("experiencia {}", id)))
    }

    /// Idempotent: deleting a missing id is not an error
    pub async fn delete_by_id(&mut self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM experiencia WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
