//! Error types for the crate

use std::path::PathBuf;

/// Errors raised while configuring models and loading image data
#[derive(thiserror::Error, Debug)]
pub enum DcganError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),
}

/// Result alias for data-layer operations
pub type Result<T> = std::result::Result<T, DcganError>;
