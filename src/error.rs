//! Error types for the WhatsApp date fixer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for date fixer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the date fixer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read EXIF data from {path}: {message}")]
    ExifRead { path: PathBuf, message: String },

    #[error("Failed to write EXIF data to {path}: {message}")]
    ExifWrite { path: PathBuf, message: String },

    #[error("Failed to set file times on {path}: {source}")]
    FileTimes {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to replace {path} with the patched copy: {source}")]
    Replace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}
