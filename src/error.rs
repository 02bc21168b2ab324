// this_file: src/error.rs
//! Error types for the drawcache library

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for drawcache operations
#[derive(Debug, Error)]
pub enum Error {
    /// The rendering backend could not create or update a texture
    #[error("Backend error: {0}")]
    Backend(String),

    /// Font model error (unsupported layout, missing glyph data)
    #[error("Font error: {0}")]
    Font(String),

    /// Font file could not be parsed
    #[error("Invalid font {path}: {reason}")]
    InvalidFont {
        /// Font file path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Scene description failed validation
    #[error("Scene error: {0}")]
    Scene(String),

    /// Invalid input parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// IO operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// PNG encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type alias for drawcache operations
pub type Result<T> = std::result::Result<T, Error>;
