//! Error types for the barback import pipeline.
//!
//! An import is aborted only by errors raised before any mutation
//! (`ArchiveOpen`, a scrape payload without a name) or by the final aggregate
//! persistence call. Every other variant is raised for a single row, table,
//! file or image and is contained by the caller, which records it in its
//! report.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for barback.
#[derive(Debug, Error)]
pub enum BarbackError {
    // Import failures
    #[error("Unable to open archive {path:?}: {message}")]
    ArchiveOpen { path: PathBuf, message: String },

    #[error("Unable to import row with id {row_id} to table {table}: {message}")]
    RowInsert {
        table: String,
        row_id: String,
        message: String,
    },

    #[error("Unable to truncate table {table}: {message}")]
    TableTruncate { table: String, message: String },

    #[error("Unable to copy file from {path:?}: {message}")]
    FileCopy { path: PathBuf, message: String },

    // Image failures
    #[error("Image encoding failed: {message}")]
    ImageEncoding { message: String },

    #[error("Image write failed for {path}: {message}")]
    ImageWrite { path: String, message: String },

    #[error("Image error: {message}")]
    Image {
        message: String,
        #[source]
        source: Option<image::ImageError>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for barback operations.
pub type Result<T> = std::result::Result<T, BarbackError>;

impl From<std::io::Error> for BarbackError {
    fn from(err: std::io::Error) -> Self {
        BarbackError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BarbackError {
    fn from(err: serde_json::Error) -> Self {
        BarbackError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for BarbackError {
    fn from(err: rusqlite::Error) -> Self {
        BarbackError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<image::ImageError> for BarbackError {
    fn from(err: image::ImageError) -> Self {
        BarbackError::Image {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for BarbackError {
    fn from(err: reqwest::Error) -> Self {
        BarbackError::Network {
            message: err.to_string(),
        }
    }
}

impl BarbackError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BarbackError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error for one input field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BarbackError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
