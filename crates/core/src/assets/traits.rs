//! Trait definitions for asset storage.

use async_trait::async_trait;

use super::error::AssetError;
use super::types::{FileUpload, ItemDir, StagedAssets};
use crate::context::OpContext;

/// Storage for item files and cover images, scoped to one directory per item.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Fixed filename used for every cover image.
    fn image_filename(&self) -> &str;

    /// Check that `name` can be used as a primary asset filename.
    fn validate_filename(&self, name: &str) -> Result<(), AssetError>;

    /// Write `content` to `dir/filename` through a temporary file, replacing
    /// any existing file. Returns the number of bytes written.
    async fn write_file(
        &self,
        ctx: &OpContext,
        dir: ItemDir,
        filename: &str,
        content: &[u8],
    ) -> Result<u64, AssetError>;

    /// Decode `image`, re-encode it as JPEG and write it under the fixed
    /// image filename.
    async fn write_image(&self, ctx: &OpContext, dir: ItemDir, image: &[u8])
        -> Result<(), AssetError>;

    async fn read_file(
        &self,
        ctx: &OpContext,
        dir: ItemDir,
        filename: &str,
    ) -> Result<Vec<u8>, AssetError>;

    async fn remove_file(&self, dir: ItemDir, filename: &str) -> Result<(), AssetError>;

    /// Remove the item directory and everything in it. A missing directory
    /// is not an error.
    async fn remove_all(&self, dir: ItemDir) -> Result<(), AssetError>;

    /// Write the uploads of a create request to a fresh staging directory.
    async fn stage(
        &self,
        ctx: &OpContext,
        file: Option<&FileUpload>,
        image: Option<&[u8]>,
    ) -> Result<StagedAssets, AssetError>;

    /// Atomically move staged assets into the item directory.
    async fn promote(
        &self,
        ctx: &OpContext,
        staged: &StagedAssets,
        dir: ItemDir,
    ) -> Result<(), AssetError>;

    /// Remove a staging directory. Failures are logged, not returned.
    async fn discard(&self, staged: &StagedAssets);
}
