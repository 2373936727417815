//! HTTP-facing errors
//!
//! Every failure leaves as a problem-style JSON body. The error key also
//! travels in a [`FailureAlert`] response extension, which
//! [`crate::api::headers::failure_alert_headers`] turns into
//! `X-{app}-error` / `X-{app}-params` headers.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use experiencia_common::model::ENTITY_NAME;
use experiencia_common::FieldError;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::pagination::PageableError;

/// Error key and entity of a failed request, read by the header middleware
#[derive(Debug, Clone)]
pub struct FailureAlert {
    pub entity_name: String,
    pub error_key: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Business rule violation reported against an entity
    #[error("{message}")]
    BadRequestAlert {
        entity_name: String,
        error_key: String,
        message: String,
    },

    #[error("Method argument not valid")]
    Validation(Vec<FieldError>),

    #[error("Not found")]
    NotFound,

    /// Unreadable request (malformed JSON, bad path or query values)
    #[error("{0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] experiencia_common::Error),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn bad_request_alert(error_key: &str, message: impl Into<String>) -> Self {
        ApiError::BadRequestAlert {
            entity_name: ENTITY_NAME.to_string(),
            error_key: error_key.to_string(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequestAlert { .. } | ApiError::Validation(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_key(&self) -> &str {
        match self {
            ApiError::BadRequestAlert { error_key, .. } => error_key,
            ApiError::Validation(_) => "validation",
            ApiError::NotFound => "http.404",
            ApiError::BadRequest(_) => "http.400",
            ApiError::Store(_) => "http.500",
        }
    }

    fn body(&self) -> Value {
        let status = self.status().as_u16();
        let key = self.error_key();

        match self {
            ApiError::BadRequestAlert {
                entity_name,
                message,
                ..
            } => json!({
                "title": message,
                "status": status,
                "entityName": entity_name,
                "errorKey": key,
                "message": format!("error.{}", key),
                "params": entity_name,
            }),
            ApiError::Validation(field_errors) => json!({
                "title": "Method argument not valid",
                "status": status,
                "message": "error.validation",
                "fieldErrors": field_errors,
            }),
            ApiError::NotFound => json!({
                "title": "Not Found",
                "status": status,
                "message": "error.http.404",
            }),
            ApiError::BadRequest(detail) => json!({
                "title": "Bad Request",
                "status": status,
                "detail": detail,
                "message": "error.http.400",
            }),
            ApiError::Store(_) => json!({
                "title": "Internal Server Error",
                "status": status,
                "message": "error.http.500",
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store(e) = &self {
            error!("Request failed: {}", e);
        }

        let alert = match &self {
            ApiError::BadRequestAlert {
                entity_name,
                error_key,
                ..
            } => Some(FailureAlert {
                entity_name: entity_name.clone(),
                error_key: error_key.clone(),
            }),
            _ => None,
        };

        let mut response = (self.status(), Json(self.body())).into_response();
        if let Some(alert) = alert {
            response.extensions_mut().insert(alert);
        }
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PageableError> for ApiError {
    fn from(e: PageableError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}
