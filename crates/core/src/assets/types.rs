//! Types shared by asset store implementations.

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

use crate::catalog::{AssetPointers, ContentType};

/// The directory owned by one catalog item, `<type>s/<id>` under the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemDir {
    pub content_type: ContentType,
    pub id: i64,
}

impl ItemDir {
    pub fn new(content_type: ContentType, id: i64) -> Self {
        Self { content_type, id }
    }

    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.content_type.plural()).join(self.id.to_string())
    }
}

impl fmt::Display for ItemDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_type.plural(), self.id)
    }
}

/// A primary asset supplied with a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Assets written to a private staging directory before their item row
/// exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAssets {
    pub(crate) id: Uuid,
    /// `None` when nothing was uploaded; promotion is then a no-op.
    pub(crate) path: Option<PathBuf>,
    pub(crate) pointers: AssetPointers,
}

impl StagedAssets {
    /// Nothing staged.
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            path: None,
            pointers: AssetPointers::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none()
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Pointers to record on the new row.
    pub fn pointers(&self) -> &AssetPointers {
        &self.pointers
    }
}
