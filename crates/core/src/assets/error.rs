//! Error types for the asset store.

use std::path::PathBuf;

use thiserror::Error;

use crate::context::Interrupted;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid filename {name:?}: {reason}")]
    InvalidFilename { name: String, reason: &'static str },

    /// Uploaded bytes are not a decodable image.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to encode image: {0}")]
    ImageEncoding(String),

    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Blocking task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl AssetError {
    /// I/O error, mapping `NotFound` to [`AssetError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            AssetError::NotFound { path }
        } else {
            AssetError::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound { .. })
    }
}
