//! Error types for the OCR worker
//!
//! Every variant renders to the `{"error": "..."}` protocol response via
//! `Display`. None of them is fatal to the worker process.

use std::path::PathBuf;

use thiserror::Error;

/// Worker-wide result type
pub type Result<T> = std::result::Result<T, OcrError>;

/// OCR worker error type
#[derive(Error, Debug)]
pub enum OcrError {
    /// Request references a directory that does not exist
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Page discovery found nothing to recognize
    #[error("No page_*.png images found in {}", .0.display())]
    NoPages(PathBuf),

    /// A recognition engine failed
    #[error("OCR engine failed: {0}")]
    Engine(String),

    /// Malformed request line
    #[error("Invalid request: {0}")]
    Protocol(String),

    /// The layout engine could not be loaded
    #[error("Layout engine initialization failed: {0}")]
    Init(String),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OcrError {
    /// Whether this error belongs to the NotFound category
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DirectoryNotFound(_) | Self::NoPages(_))
    }
}
