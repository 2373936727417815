//! Alert headers
//!
//! Successful writes carry `X-{app}-alert` / `X-{app}-params`; failures with
//! an entity error key carry `X-{app}-error` / `X-{app}-params`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use experiencia_common::model::ENTITY_NAME;

use crate::error::FailureAlert;
use crate::service::IndexOutcome;
use crate::AppState;

pub const INDEX_STATUS_HEADER: &str = "x-index-status";

fn insert(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, value);
    }
}

fn alert(application_name: &str, message: &str, param: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, &format!("x-{}-alert", application_name), message);
    insert(&mut headers, &format!("x-{}-params", application_name), param);
    headers
}

pub fn entity_creation_alert(application_name: &str, id: &str) -> HeaderMap {
    alert(
        application_name,
        &format!("A new {} is created with identifier {}", ENTITY_NAME, id),
        id,
    )
}

pub fn entity_update_alert(application_name: &str, id: &str) -> HeaderMap {
    alert(
        application_name,
        &format!("A {} is updated with identifier {}", ENTITY_NAME, id),
        id,
    )
}

pub fn entity_deletion_alert(application_name: &str, id: &str) -> HeaderMap {
    alert(
        application_name,
        &format!("A {} is deleted with identifier {}", ENTITY_NAME, id),
        id,
    )
}

pub fn failure_alert(application_name: &str, entity_name: &str, error_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(
        &mut headers,
        &format!("x-{}-error", application_name),
        &format!("error.{}", error_key),
    );
    insert(&mut headers, &format!("x-{}-params", application_name), entity_name);
    headers
}

/// Add `X-Index-Status` to a write response
pub fn with_index_status(mut headers: HeaderMap, outcome: &IndexOutcome) -> HeaderMap {
    headers.insert(INDEX_STATUS_HEADER, HeaderValue::from_static(outcome.as_str()));
    headers
}

/// Middleware turning a [`FailureAlert`] extension into error headers
pub async fn failure_alert_headers(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    if let Some(alert) = response.extensions().get::<FailureAlert>().cloned() {
        let headers = failure_alert(&state.application_name, &alert.entity_name, &alert.error_key);
        response.headers_mut().extend(headers);
    }

    response
}
