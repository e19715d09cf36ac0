//! Error types for the catalog crate

use thiserror::Error;

/// Errors that can occur while fetching or parsing the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP fetch failed (connect, timeout, non-2xx status)
    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Response body was not valid JSON
    #[error("catalog response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Response was valid JSON but not an array of objects
    #[error("catalog response is not a JSON array")]
    NotAnArray,
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
