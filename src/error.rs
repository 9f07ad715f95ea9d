// this_file: src/error.rs
//! Error types for the slidesmith library

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for slidesmith operations
#[derive(Debug, Error)]
pub enum Error {
    /// Template, position table or setup is malformed
    #[error("Configuration error in {context}: {reason}")]
    Configuration { context: String, reason: String },

    /// A text section found none of its fields in the row
    #[error("No content for section in template '{template}': fields {fields:?} are all empty")]
    NoContentForSection {
        template: String,
        fields: Vec<String>,
    },

    /// Font file could not be resolved
    #[error("Font not found: {path}")]
    FontNotFound { path: PathBuf },

    /// Font file exists but could not be parsed
    #[error("Invalid font {path}: {reason}")]
    InvalidFont { path: PathBuf, reason: String },

    /// The shrink loop ran out of font sizes
    #[error("Text cannot fit in {width}x{height} box (stopped at size {size}): {text:?}")]
    UnfittableText {
        text: String,
        width: f32,
        height: f32,
        size: f32,
    },

    /// Lower thirds only come in one- and two-field layouts
    #[error("Lower thirds support 1 or 2 fields, got {0}")]
    UnsupportedLowerThirdArity(usize),

    /// Image download or read failed
    #[error("Failed to fetch {locator}: {reason}")]
    ResourceFetch { locator: String, reason: String },

    /// Image decode or encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON parsing or validation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Shorthand for configuration errors tagged with where they came from.
    pub fn config(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for slidesmith operations
pub type Result<T> = std::result::Result<T, Error>;
