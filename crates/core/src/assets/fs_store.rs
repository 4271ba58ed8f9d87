//! Filesystem asset store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::AssetStoreConfig;
use super::error::AssetError;
use super::traits::AssetStore;
use super::types::{FileUpload, ItemDir, StagedAssets};
use crate::catalog::AssetPointers;
use crate::context::OpContext;
use crate::metrics;

const STAGING_DIR: &str = ".staging";
const MAX_FILENAME_BYTES: usize = 255;

/// Asset store rooted at a local directory.
#[derive(Debug)]
pub struct FsAssetStore {
    config: AssetStoreConfig,
}

/// Decode any supported image format and re-encode it as JPEG.
fn reencode_jpeg(raw: &[u8], quality: u8) -> Result<Vec<u8>, AssetError> {
    let decoded =
        image::load_from_memory(raw).map_err(|e| AssetError::InvalidImage(e.to_string()))?;

    // JPEG has no alpha channel
    let rgb = decoded.to_rgb8();
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&rgb)
        .map_err(|e| AssetError::ImageEncoding(e.to_string()))?;
    Ok(out)
}

/// Rejects names that could escape the item directory.
fn check_path_component(name: &str) -> Result<(), AssetError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name == "." || name == ".." {
        Some("must not be a relative path component")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name.contains('\0') {
        Some("must not contain NUL bytes")
    } else if name.len() > MAX_FILENAME_BYTES {
        Some("is too long")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AssetError::InvalidFilename {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

impl FsAssetStore {
    pub fn new(config: AssetStoreConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Absolute path of an item's directory.
    pub fn item_path(&self, dir: ItemDir) -> PathBuf {
        self.config.root.join(dir.relative_path())
    }

    pub fn staging_root(&self) -> PathBuf {
        self.config.root.join(STAGING_DIR)
    }

    async fn encode_image(&self, image: &[u8]) -> Result<Vec<u8>, AssetError> {
        let raw = image.to_vec();
        let quality = self.config.jpeg_quality;
        tokio::task::spawn_blocking(move || reencode_jpeg(&raw, quality))
            .await
            .map_err(|e| AssetError::TaskFailed(e.to_string()))?
    }

    /// Write `content` to a temporary file in `parent`, then rename it to
    /// `filename`. The temporary file is removed on failure.
    async fn write_atomic(
        &self,
        ctx: &OpContext,
        parent: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<u64, AssetError> {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AssetError::io(parent, e))?;

        let target = parent.join(filename);
        let temp = parent.join(format!(".{}.part", Uuid::new_v4()));

        let written = match self.write_chunks(ctx, &temp, content).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(AssetError::io(&target, e));
        }

        metrics::ASSET_BYTES_WRITTEN.inc_by(written);
        debug!(path = %target.display(), bytes = written, "Wrote asset");
        Ok(written)
    }

    async fn write_chunks(
        &self,
        ctx: &OpContext,
        path: &Path,
        content: &[u8],
    ) -> Result<u64, AssetError> {
        let file = File::create(path)
            .await
            .map_err(|e| AssetError::io(path, e))?;
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, file);
        let mut written = 0u64;

        for chunk in content.chunks(self.config.buffer_size) {
            ctx.check()?;
            writer
                .write_all(chunk)
                .await
                .map_err(|e| AssetError::io(path, e))?;
            written += chunk.len() as u64;
        }

        ctx.check()?;
        writer.flush().await.map_err(|e| AssetError::io(path, e))?;
        writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| AssetError::io(path, e))?;

        Ok(written)
    }

    async fn write_staged(
        &self,
        ctx: &OpContext,
        path: &Path,
        file: Option<&FileUpload>,
        image: Option<&[u8]>,
    ) -> Result<(), AssetError> {
        if let Some(file) = file {
            self.write_atomic(ctx, path, &file.filename, &file.content)
                .await?;
        }
        if let Some(image) = image {
            self.write_atomic(ctx, path, &self.config.image_filename, image)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    fn image_filename(&self) -> &str {
        &self.config.image_filename
    }

    fn validate_filename(&self, name: &str) -> Result<(), AssetError> {
        check_path_component(name)?;
        if name == self.config.image_filename {
            return Err(AssetError::InvalidFilename {
                name: name.to_string(),
                reason: "is reserved for the cover image",
            });
        }
        Ok(())
    }

    async fn write_file(
        &self,
        ctx: &OpContext,
        dir: ItemDir,
        filename: &str,
        content: &[u8],
    ) -> Result<u64, AssetError> {
        self.validate_filename(filename)?;
        ctx.check()?;
        self.write_atomic(ctx, &self.item_path(dir), filename, content)
            .await
    }

    async fn write_image(
        &self,
        ctx: &OpContext,
        dir: ItemDir,
        image: &[u8],
    ) -> Result<(), AssetError> {
        ctx.check()?;
        let encoded = self.encode_image(image).await?;
        ctx.check()?;
        self.write_atomic(ctx, &self.item_path(dir), &self.config.image_filename, &encoded)
            .await?;
        Ok(())
    }

    async fn read_file(
        &self,
        ctx: &OpContext,
        dir: ItemDir,
        filename: &str,
    ) -> Result<Vec<u8>, AssetError> {
        check_path_component(filename)?;
        ctx.check()?;
        let path = self.item_path(dir).join(filename);
        fs::read(&path).await.map_err(|e| AssetError::io(&path, e))
    }

    async fn remove_file(&self, dir: ItemDir, filename: &str) -> Result<(), AssetError> {
        check_path_component(filename)?;
        let path = self.item_path(dir).join(filename);
        fs::remove_file(&path)
            .await
            .map_err(|e| AssetError::io(&path, e))
    }

    async fn remove_all(&self, dir: ItemDir) -> Result<(), AssetError> {
        let path = self.item_path(dir);
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Asset directory already absent");
                Ok(())
            }
            Err(e) => Err(AssetError::io(&path, e)),
        }
    }

    async fn stage(
        &self,
        ctx: &OpContext,
        file: Option<&FileUpload>,
        image: Option<&[u8]>,
    ) -> Result<StagedAssets, AssetError> {
        if file.is_none() && image.is_none() {
            return Ok(StagedAssets::empty());
        }

        if let Some(file) = file {
            self.validate_filename(&file.filename)?;
        }

        // Decode before touching the disk so a bad image leaves nothing behind
        let encoded = match image {
            Some(raw) => Some(self.encode_image(raw).await?),
            None => None,
        };
        ctx.check()?;

        let id = Uuid::new_v4();
        let path = self.staging_root().join(id.to_string());
        let mut staged = StagedAssets {
            id,
            path: Some(path.clone()),
            pointers: AssetPointers::default(),
        };

        if let Err(e) = self
            .write_staged(ctx, &path, file, encoded.as_deref())
            .await
        {
            self.discard(&staged).await;
            return Err(e);
        }

        staged.pointers = AssetPointers {
            local_url: file.map(|f| f.filename.clone()),
            image_url: encoded.map(|_| self.config.image_filename.clone()),
        };
        debug!(staging_id = %id, "Staged assets");
        Ok(staged)
    }

    async fn promote(
        &self,
        ctx: &OpContext,
        staged: &StagedAssets,
        dir: ItemDir,
    ) -> Result<(), AssetError> {
        let Some(source) = staged.path.as_ref() else {
            return Ok(());
        };
        ctx.check()?;

        let target = self.item_path(dir);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AssetError::io(parent, e))?;
        }

        fs::rename(source, &target)
            .await
            .map_err(|e| AssetError::io(&target, e))?;
        debug!(staging_id = %staged.id, item = %dir, "Promoted staged assets");
        Ok(())
    }

    async fn discard(&self, staged: &StagedAssets) {
        let Some(path) = staged.path.as_ref() else {
            return;
        };
        match fs::remove_dir_all(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove staging directory"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ContentType;
    use crate::context::Interrupted;
    use crate::testing::sample_png;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn store(temp: &TempDir) -> FsAssetStore {
        FsAssetStore::new(AssetStoreConfig::new(temp.path()).with_buffer_size(8))
    }

    fn book(id: i64) -> ItemDir {
        ItemDir::new(ContentType::Book, id)
    }

    fn entries(path: &Path) -> Vec<String> {
        match std::fs::read_dir(path) {
            Ok(dir) => {
                let mut names: Vec<String> = dir
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_write_and_read_file() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let ctx = OpContext::unbounded();
        let content = b"the go programming language, chapter one".to_vec();

        let written = store
            .write_file(&ctx, book(1), "go.pdf", &content)
            .await
            .unwrap();
        assert_eq!(written, content.len() as u64);

        let read = store.read_file(&ctx, book(1), "go.pdf").await.unwrap();
        assert_eq!(read, content);
        assert_eq!(entries(&temp.path().join("books/1")), vec!["go.pdf"]);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let ctx = OpContext::unbounded();

        store
            .write_file(&ctx, book(1), "notes.txt", b"first version")
            .await
            .unwrap();
        store
            .write_file(&ctx, book(1), "notes.txt", b"second")
            .await
            .unwrap();

        let read = store.read_file(&ctx, book(1), "notes.txt").await.unwrap();
        assert_eq!(read, b"second");
        assert_eq!(entries(&temp.path().join("books/1")), vec!["notes.txt"]);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let result = store
            .read_file(&OpContext::unbounded(), book(9), "missing.pdf")
            .await;
        assert!(matches!(result, Err(AssetError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_invalid_filenames_rejected() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let ctx = OpContext::unbounded();

        for name in ["", ".", "..", "../escape.pdf", "a/b.pdf", "a\\b.pdf", "original.jpg"] {
            let result = store.write_file(&ctx, book(1), name, b"x").await;
            assert!(
                matches!(result, Err(AssetError::InvalidFilename { .. })),
                "{:?} should be rejected",
                name
            );
        }
        assert!(!temp.path().join("books").exists());
    }

    #[tokio::test]
    async fn test_cancelled_write_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let token = CancellationToken::new();
        let ctx = OpContext::new(token.clone(), Duration::from_secs(5));
        token.cancel();

        let result = store
            .write_file(&ctx, book(1), "big.bin", &[7u8; 64])
            .await;
        assert!(matches!(
            result,
            Err(AssetError::Interrupted(Interrupted::Cancelled))
        ));
        assert!(entries(&temp.path().join("books/1")).is_empty());
    }

    #[tokio::test]
    async fn test_expired_deadline_leaves_no_partial_file() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store
            .write_file(&OpContext::unbounded(), book(1), "data.bin", b"original")
            .await
            .unwrap();

        let ctx = OpContext::new(CancellationToken::new(), Duration::ZERO);
        let result = store
            .write_file(&ctx, book(1), "data.bin", &[1u8; 100])
            .await;
        assert!(matches!(
            result,
            Err(AssetError::Interrupted(Interrupted::DeadlineExceeded))
        ));

        let read = store
            .read_file(&OpContext::unbounded(), book(1), "data.bin")
            .await
            .unwrap();
        assert_eq!(read, b"original");
        assert_eq!(entries(&temp.path().join("books/1")), vec!["data.bin"]);
    }

    #[tokio::test]
    async fn test_write_image_reencodes_jpeg() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let ctx = OpContext::unbounded();

        store
            .write_image(&ctx, book(2), &sample_png())
            .await
            .unwrap();

        let bytes = store
            .read_file(&ctx, book(2), store.image_filename())
            .await
            .unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[tokio::test]
    async fn test_write_invalid_image_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let result = store
            .write_image(&OpContext::unbounded(), book(2), b"definitely not an image")
            .await;
        assert!(matches!(result, Err(AssetError::InvalidImage(_))));
        assert!(!temp.path().join("books/2").exists());
    }

    #[tokio::test]
    async fn test_remove_file_and_directory() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let ctx = OpContext::unbounded();

        store.write_file(&ctx, book(3), "a.txt", b"a").await.unwrap();
        store.write_file(&ctx, book(3), "b.txt", b"b").await.unwrap();

        store.remove_file(book(3), "a.txt").await.unwrap();
        assert_eq!(entries(&temp.path().join("books/3")), vec!["b.txt"]);
        assert!(store.remove_file(book(3), "a.txt").await.unwrap_err().is_not_found());

        store.remove_all(book(3)).await.unwrap();
        assert!(!temp.path().join("books/3").exists());

        // Missing directory is fine
        store.remove_all(book(3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stage_and_promote() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let ctx = OpContext::unbounded();
        let upload = FileUpload::new("lecture.mp3", b"ID3 audio bytes".to_vec());

        let staged = store
            .stage(&ctx, Some(&upload), Some(&sample_png()))
            .await
            .unwrap();
        assert_eq!(staged.pointers().local_url.as_deref(), Some("lecture.mp3"));
        assert_eq!(staged.pointers().image_url.as_deref(), Some("original.jpg"));

        let dir = ItemDir::new(ContentType::Audio, 5);
        store.promote(&ctx, &staged, dir).await.unwrap();

        assert_eq!(
            entries(&temp.path().join("audios/5")),
            vec!["lecture.mp3", "original.jpg"]
        );
        assert!(entries(&store.staging_root()).is_empty());
    }

    #[tokio::test]
    async fn test_stage_nothing_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let ctx = OpContext::unbounded();

        let staged = store.stage(&ctx, None, None).await.unwrap();
        assert!(staged.is_empty());
        store.promote(&ctx, &staged, book(1)).await.unwrap();
        assert!(entries(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_stage_invalid_image_leaves_no_staging() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let upload = FileUpload::new("go.pdf", b"%PDF-1.7".to_vec());

        let result = store
            .stage(&OpContext::unbounded(), Some(&upload), Some(b"garbage"))
            .await;
        assert!(matches!(result, Err(AssetError::InvalidImage(_))));
        assert!(entries(&store.staging_root()).is_empty());
    }

    #[tokio::test]
    async fn test_discard_removes_staging() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let upload = FileUpload::new("go.pdf", b"%PDF-1.7".to_vec());

        let staged = store
            .stage(&OpContext::unbounded(), Some(&upload), None)
            .await
            .unwrap();
        let path = staged.path().unwrap().clone();
        assert!(path.join("go.pdf").exists());

        store.discard(&staged).await;
        assert!(!path.exists());
    }
}
