//! Configuration for the filesystem asset store.

use std::path::PathBuf;

use crate::config::StorageConfig;

#[derive(Debug, Clone)]
pub struct AssetStoreConfig {
    /// Directory holding `<type>s/<id>/` folders and the staging area.
    pub root: PathBuf,
    /// Fixed filename of every item's cover image.
    pub image_filename: String,
    /// Chunk size for file writes. The operation context is checked between
    /// chunks.
    pub buffer_size: usize,
    pub jpeg_quality: u8,
}

impl AssetStoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::from(&StorageConfig::default())
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }
}

impl From<&StorageConfig> for AssetStoreConfig {
    fn from(storage: &StorageConfig) -> Self {
        Self {
            root: storage.root.clone(),
            image_filename: storage.image_filename.clone(),
            buffer_size: storage.buffer_size.max(1),
            jpeg_quality: storage.jpeg_quality.clamp(1, 100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_config() {
        let storage = StorageConfig {
            root: PathBuf::from("/srv/libris"),
            image_filename: "cover.jpg".to_string(),
            buffer_size: 0,
            jpeg_quality: 90,
        };
        let config = AssetStoreConfig::from(&storage);
        assert_eq!(config.root, PathBuf::from("/srv/libris"));
        assert_eq!(config.image_filename, "cover.jpg");
        assert_eq!(config.buffer_size, 1);
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = AssetStoreConfig::new("/data").with_buffer_size(16);
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.image_filename, "original.jpg");
        assert_eq!(config.buffer_size, 16);
    }
}
