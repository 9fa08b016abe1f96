//! Error type shared by the fallible parts of the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for dataset loading, configuration and plotting.
#[derive(Error, Debug)]
pub enum SignsError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid dataset file {path}: {reason}")]
    InvalidDataset { path: PathBuf, reason: String },
    #[error("incompatible datasets: {0}")]
    DatasetMismatch(String),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("plotting failed: {0}")]
    Plot(String),
}

impl SignsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SignsError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn dataset(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SignsError::InvalidDataset {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SignsError>;
