//! experiencia-api library
//!
//! REST service over the `experiencia` entity: a SQLite primary store with a
//! best-effort search index mirror.

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod search;
pub mod service;

use db::ExperienciaStore;
use search::SearchIndex;
use service::ExperienciaService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ExperienciaService,
    /// Prefix of the alert headers
    pub application_name: String,
}

impl AppState {
    pub fn new(store: ExperienciaStore, index: Arc<dyn SearchIndex>, application_name: impl Into<String>) -> Self {
        Self {
            service: ExperienciaService::new(store, index),
            application_name: application_name.into(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::get;

    let resources = Router::new()
        .route(
            "/api/experiencias",
            get(api::get_all_experiencias).post(api::create_experiencia),
        )
        .route(
            "/api/experiencias/:id",
            get(api::get_experiencia)
                .put(api::update_experiencia)
                .patch(api::partial_update_experiencia)
                .delete(api::delete_experiencia),
        )
        .route("/api/_search/experiencias", get(api::search_experiencias))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::failure_alert_headers,
        ));

    Router::new()
        .merge(resources)
        .merge(api::health_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
