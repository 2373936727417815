//! `/api/experiencias` and `/api/_search/experiencias` handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        OriginalUri, Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use experiencia_common::Experiencia;
use tracing::{debug, warn};

use super::headers::{entity_creation_alert, entity_deletion_alert, entity_update_alert, with_index_status};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{pagination_headers, Pageable};
use crate::service::Mirrored;
use crate::AppState;

fn report_index<T>(mirrored: &Mirrored<T>, id: Option<i64>) {
    if !mirrored.index.is_synced() {
        warn!("Experiencia {:?} committed but search index is out of date", id);
    }
}

/// POST /api/experiencias
pub async fn create_experiencia(
    State(state): State<AppState>,
    payload: Result<Json<Experiencia>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(experiencia) = payload?;
    debug!("REST request to save Experiencia : {}", experiencia);

    let mirrored = state.service.create(experiencia).await?;
    let id = mirrored.value.id();
    report_index(&mirrored, id);

    let id_text = id.map(|id| id.to_string()).unwrap_or_default();
    let mut headers = entity_creation_alert(&state.application_name, &id_text);
    if let Ok(location) = HeaderValue::from_str(&format!("/api/experiencias/{}", id_text)) {
        headers.insert(header::LOCATION, location);
    }
    let headers = with_index_status(headers, &mirrored.index);

    Ok((StatusCode::CREATED, headers, Json(mirrored.value)))
}

/// PUT /api/experiencias/:id
pub async fn update_experiencia(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Experiencia>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = path?;
    let Json(experiencia) = payload?;
    debug!("REST request to update Experiencia : {}, {}", id, experiencia);

    let mirrored = state.service.update(id, experiencia).await?;
    report_index(&mirrored, Some(id));

    let headers = with_index_status(
        entity_update_alert(&state.application_name, &id.to_string()),
        &mirrored.index,
    );
    Ok((headers, Json(mirrored.value)))
}

/// PATCH /api/experiencias/:id
///
/// Accepts `application/json` and `application/merge-patch+json`.
pub async fn partial_update_experiencia(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Experiencia>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = path?;
    let Json(patch) = payload?;
    debug!("REST request to partial update Experiencia partially : {}, {}", id, patch);

    let mirrored = state.service.partial_update(id, patch).await?;
    report_index(&mirrored, Some(id));

    let headers = with_index_status(
        entity_update_alert(&state.application_name, &id.to_string()),
        &mirrored.index,
    );
    Ok((headers, Json(mirrored.value)))
}

/// GET /api/experiencias
pub async fn get_all_experiencias(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<impl IntoResponse> {
    debug!("REST request to get a page of Experiencias");
    let pageable = Pageable::from_query(&params)?;

    let page = state.service.find_all(&pageable).await?;
    let headers = pagination_headers(&uri, &page);
    Ok((headers, Json(page.content)))
}

/// GET /api/experiencias/:id
pub async fn get_experiencia(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Experiencia>> {
    let Path(id) = path?;
    debug!("REST request to get Experiencia : {}", id);

    state
        .service
        .find_one(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// DELETE /api/experiencias/:id
pub async fn delete_experiencia(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = path?;
    debug!("REST request to delete Experiencia : {}", id);

    let mirrored = state.service.delete(id).await?;
    report_index(&mirrored, Some(id));

    let headers = with_index_status(
        entity_deletion_alert(&state.application_name, &id.to_string()),
        &mirrored.index,
    );
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/_search/experiencias?query=...
pub async fn search_experiencias(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<(HeaderMap, Json<Vec<Experiencia>>)> {
    let query = params
        .iter()
        .find(|(key, _)| key == "query")
        .map(|(_, value)| value.clone())
        .ok_or_else(|| ApiError::BadRequest("Required parameter 'query' is not present".to_string()))?;
    debug!("REST request to search for a page of Experiencias for query {}", query);

    let pageable = Pageable::from_query(&params)?;
    let page = state.service.search(&query, &pageable).await?;
    let headers = pagination_headers(&uri, &page);
    Ok((headers, Json(page.content)))
}
