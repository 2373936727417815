//! HTTP API handlers

pub mod experiencias;
pub mod headers;
pub mod health;

pub use experiencias::{
    create_experiencia, delete_experiencia, get_all_experiencias, get_experiencia,
    partial_update_experiencia, search_experiencias, update_experiencia,
};
pub use headers::failure_alert_headers;
pub use health::health_routes;
