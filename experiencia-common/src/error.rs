//! Common error types for the experiencia service

use thiserror::Error;

/// Common result type for experiencia operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the store, the search index and configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Search index operation error
    #[error("Search index error: {0}")]
    Search(String),
}
