//! # Experiencia Common Library
//!
//! Shared code for the experiencia service including:
//! - The `Experiencia` entity model and its validation rules
//! - Database initialization and schema migrations
//! - Configuration loading and root folder resolution
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::{Experiencia, FieldError};
