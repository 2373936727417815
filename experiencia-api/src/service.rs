//! Experiencia service
//!
//! Writes commit to the primary store first and are then mirrored to the
//! search index. The mirror runs after commit and never undoes it: its
//! outcome is reported next to the stored value instead.

use experiencia_common::{Error, Experiencia};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::ExperienciaStore;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{Page, Pageable};
use crate::search::SearchIndex;

/// Rows per batch when rebuilding the index
pub const REINDEX_BATCH_SIZE: i64 = 500;

/// Result of mirroring a committed write to the search index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    Synced,
    Failed(String),
}

impl IndexOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, IndexOutcome::Synced)
    }

    /// Value for the `X-Index-Status` header
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexOutcome::Synced => "synced",
            IndexOutcome::Failed(_) => "failed",
        }
    }
}

/// A committed write together with what happened to its mirror
#[derive(Debug, Clone)]
pub struct Mirrored<T> {
    pub value: T,
    pub index: IndexOutcome,
}

#[derive(Clone)]
pub struct ExperienciaService {
    store: ExperienciaStore,
    index: Arc<dyn SearchIndex>,
}

impl ExperienciaService {
    pub fn new(store: ExperienciaStore, index: Arc<dyn SearchIndex>) -> Self {
        Self { store, index }
    }

    pub fn store(&self) -> &ExperienciaStore {
        &self.store
    }

    /// Insert a new record; it must not carry an id
    pub async fn create(&self, experiencia: Experiencia) -> ApiResult<Mirrored<Experiencia>> {
        debug!("Request to save Experiencia : {}", experiencia);
        if experiencia.id().is_some() {
            return Err(ApiError::bad_request_alert(
                "idexists",
                "A new experiencia cannot already have an ID",
            ));
        }
        experiencia.validate().map_err(ApiError::Validation)?;

        let mut tx = self.store.begin().await?;
        let saved = tx.save(experiencia).await?;
        tx.commit().await?;

        let index = self.mirror_save(&saved).await;
        Ok(Mirrored { value: saved, index })
    }

    /// Replace every field of an existing record
    pub async fn update(&self, id: i64, experiencia: Experiencia) -> ApiResult<Mirrored<Experiencia>> {
        debug!("Request to update Experiencia : {}, {}", id, experiencia);
        check_body_id(id, &experiencia)?;
        experiencia.validate().map_err(ApiError::Validation)?;

        let mut tx = self.store.begin().await?;
        if !tx.exists_by_id(id).await? {
            return Err(entity_not_found());
        }
        let saved = tx.save(experiencia).await?;
        tx.commit().await?;

        let index = self.mirror_save(&saved).await;
        Ok(Mirrored { value: saved, index })
    }

    /// Overwrite only the fields present in `patch`
    ///
    /// Load, merge and save share one transaction. A missing target is
    /// `NotFound`, unlike [`Self::update`].
    pub async fn partial_update(&self, id: i64, patch: Experiencia) -> ApiResult<Mirrored<Experiencia>> {
        debug!("Request to partially update Experiencia : {}, {}", id, patch);
        check_body_id(id, &patch)?;

        let mut tx = self.store.begin().await?;
        let existing = tx.find_by_id(id).await?.ok_or(ApiError::NotFound)?;

        let merged = existing.merge(&patch);
        merged.validate().map_err(ApiError::Validation)?;

        let saved = match tx.save(merged).await {
            Ok(saved) => saved,
            Err(Error::NotFound(_)) => return Err(ApiError::NotFound),
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;

        let index = self.mirror_save(&saved).await;
        Ok(Mirrored { value: saved, index })
    }

    pub async fn find_one(&self, id: i64) -> ApiResult<Option<Experiencia>> {
        debug!("Request to get Experiencia : {}", id);
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn find_all(&self, pageable: &Pageable) -> ApiResult<Page<Experiencia>> {
        debug!("Request to get all Experiencias");
        Ok(self.store.find_all(pageable).await?)
    }

    /// Remove from the store, then from the index; missing ids are fine
    pub async fn delete(&self, id: i64) -> ApiResult<Mirrored<()>> {
        debug!("Request to delete Experiencia : {}", id);
        self.store.delete_by_id(id).await?;

        let index = match self.index.delete_by_id(id).await {
            Ok(()) => IndexOutcome::Synced,
            Err(e) => {
                warn!("Failed to remove Experiencia {} from search index: {}", id, e);
                IndexOutcome::Failed(e.to_string())
            }
        };

        Ok(Mirrored { value: (), index })
    }

    /// Query the index; results may lag behind the store
    pub async fn search(&self, query: &str, pageable: &Pageable) -> ApiResult<Page<Experiencia>> {
        debug!("Request to search for a page of Experiencias for query {}", query);
        Ok(self.index.search(query, pageable).await?)
    }

    /// Rebuild the index from the store, returning the number of documents written
    pub async fn reindex(&self) -> ApiResult<usize> {
        info!("Rebuilding search index");
        self.index.clear().await?;

        let mut written = 0;
        let mut after_id = 0;
        loop {
            let batch = self.store.find_batch_after(after_id, REINDEX_BATCH_SIZE).await?;
            let Some(last) = batch.last().and_then(Experiencia::id) else {
                break;
            };
            for experiencia in &batch {
                self.index.save(experiencia).await?;
            }
            written += batch.len();
            after_id = last;
        }

        info!("Search index rebuilt with {} documents", written);
        Ok(written)
    }

    async fn mirror_save(&self, saved: &Experiencia) -> IndexOutcome {
        match self.index.save(saved).await {
            Ok(()) => IndexOutcome::Synced,
            Err(e) => {
                warn!("Failed to index Experiencia {:?}: {}", saved.id(), e);
                IndexOutcome::Failed(e.to_string())
            }
        }
    }
}

fn check_body_id(id: i64, experiencia: &Experiencia) -> ApiResult<()> {
    match experiencia.id() {
        None => Err(ApiError::bad_request_alert("idnull", "Invalid id")),
        Some(body_id) if body_id != id => Err(ApiError::bad_request_alert("idinvalid", "Invalid ID")),
        Some(_) => Ok(()),
    }
}

fn entity_not_found() -> ApiError {
    ApiError::bad_request_alert("idnotfound", "Entity not found")
}
