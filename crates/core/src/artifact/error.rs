//! Errors surfaced by artifact operations.

use thiserror::Error;

use crate::assets::AssetError;
use crate::catalog::CatalogError;
use crate::context::Interrupted;
use crate::validation::{FieldError, ValidationErrors};

/// Coarse classification used for status codes and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Cancelled,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{0}")]
    Validation(ValidationErrors),

    /// A referenced direction, author or tag does not exist, or a unique
    /// name is already taken.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl ArtifactError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArtifactError::Validation(_) | ArtifactError::InvalidReference(_) => {
                ErrorKind::Validation
            }
            ArtifactError::NotFound(_) => ErrorKind::NotFound,
            ArtifactError::Storage(_) => ErrorKind::Storage,
            ArtifactError::Interrupted(Interrupted::Cancelled) => ErrorKind::Cancelled,
            ArtifactError::Interrupted(Interrupted::DeadlineExceeded) => {
                ErrorKind::DeadlineExceeded
            }
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ArtifactError::Validation(FieldError::invalid(field, reason).into())
    }
}

impl From<ValidationErrors> for ArtifactError {
    fn from(errors: ValidationErrors) -> Self {
        ArtifactError::Validation(errors)
    }
}

impl From<FieldError> for ArtifactError {
    fn from(error: FieldError) -> Self {
        ArtifactError::Validation(error.into())
    }
}

impl From<CatalogError> for ArtifactError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound(what) => ArtifactError::NotFound(what),
            CatalogError::Constraint(msg) => ArtifactError::InvalidReference(msg),
            CatalogError::Database(msg) | CatalogError::Internal(msg) => {
                ArtifactError::Storage(msg)
            }
        }
    }
}

impl From<AssetError> for ArtifactError {
    fn from(error: AssetError) -> Self {
        match error {
            AssetError::NotFound { path } => {
                ArtifactError::NotFound(format!("file {}", path.display()))
            }
            AssetError::InvalidFilename { name, reason } => {
                ArtifactError::invalid("filename", format!("{:?} {}", name, reason))
            }
            AssetError::InvalidImage(msg) => ArtifactError::invalid("image", msg),
            AssetError::Interrupted(interrupted) => ArtifactError::Interrupted(interrupted),
            other => ArtifactError::Storage(other.to_string()),
        }
    }
}
