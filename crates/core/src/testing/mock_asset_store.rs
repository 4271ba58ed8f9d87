//! Asset store wrapper with failure injection.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::assets::{
    AssetError, AssetStore, AssetStoreConfig, FileUpload, FsAssetStore, ItemDir, StagedAssets,
};
use crate::context::OpContext;

/// Asset store operations that can be recorded and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetOp {
    WriteFile,
    WriteImage,
    ReadFile,
    RemoveFile,
    RemoveAll,
    Stage,
    Promote,
    Discard,
}

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAssetCall {
    pub op: AssetOp,
    pub dir: Option<ItemDir>,
    pub filename: Option<String>,
    pub success: bool,
}

/// Real filesystem store whose operations can be failed on demand.
///
/// # Example
///
/// ```rust,ignore
/// use libris_core::testing::{AssetOp, MockAssetStore};
///
/// let assets = MockAssetStore::new(temp.path());
/// assets.set_failing(AssetOp::Promote, true).await;
///
/// // create() now rolls its row back
/// assert_eq!(assets.calls_of(AssetOp::Promote).await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockAssetStore {
    inner: FsAssetStore,
    failing: Arc<RwLock<HashSet<AssetOp>>>,
    delays: Arc<RwLock<HashMap<AssetOp, Duration>>>,
    calls: Arc<RwLock<Vec<RecordedAssetCall>>>,
}

impl MockAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(AssetStoreConfig::new(root))
    }

    pub fn with_config(config: AssetStoreConfig) -> Self {
        Self {
            inner: FsAssetStore::new(config),
            failing: Arc::new(RwLock::new(HashSet::new())),
            delays: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn root(&self) -> &Path {
        self.inner.root()
    }

    pub fn item_path(&self, dir: ItemDir) -> PathBuf {
        self.inner.item_path(dir)
    }

    pub fn staging_root(&self) -> PathBuf {
        self.inner.staging_root()
    }

    /// Make `op` fail with an I/O error until turned off again.
    pub async fn set_failing(&self, op: AssetOp, failing: bool) {
        let mut ops = self.failing.write().await;
        if failing {
            ops.insert(op);
        } else {
            ops.remove(&op);
        }
    }

    /// Sleep for `delay` before running `op`.
    pub async fn set_delay(&self, op: AssetOp, delay: Duration) {
        self.delays.write().await.insert(op, delay);
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedAssetCall> {
        self.calls.read().await.clone()
    }

    pub async fn calls_of(&self, op: AssetOp) -> Vec<RecordedAssetCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.calls.write().await.clear();
        self.failing.write().await.clear();
        self.delays.write().await.clear();
    }

    async fn injected(&self, op: AssetOp) -> Result<(), AssetError> {
        let delay = self.delays.read().await.get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.read().await.contains(&op) {
            return Err(AssetError::Io {
                path: self.inner.root().to_path_buf(),
                source: io::Error::other(format!("injected {:?} failure", op)),
            });
        }
        Ok(())
    }

    async fn record<T>(
        &self,
        op: AssetOp,
        dir: Option<ItemDir>,
        filename: Option<&str>,
        result: &Result<T, AssetError>,
    ) {
        self.calls.write().await.push(RecordedAssetCall {
            op,
            dir,
            filename: filename.map(str::to_string),
            success: result.is_ok(),
        });
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    fn image_filename(&self) -> &str {
        self.inner.image_filename()
    }

    fn validate_filename(&self, name: &str) -> Result<(), AssetError> {
        self.inner.validate_filename(name)
    }

    async fn write_file(
        &self,
        ctx: &OpContext,
        dir: ItemDir,
        filename: &str,
        content: &[u8],
    ) -> Result<u64, AssetError> {
        let result = match self.injected(AssetOp::WriteFile).await {
            Ok(()) => self.inner.write_file(ctx, dir, filename, content).await,
            Err(e) => Err(e),
        };
        self.record(AssetOp::WriteFile, Some(dir), Some(filename), &result)
            .await;
        result
    }

    async fn write_image(
        &self,
        ctx: &OpContext,
        dir: ItemDir,
        image: &[u8],
    ) -> Result<(), AssetError> {
        let result = match self.injected(AssetOp::WriteImage).await {
            Ok(()) => self.inner.write_image(ctx, dir, image).await,
            Err(e) => Err(e),
        };
        self.record(AssetOp::WriteImage, Some(dir), None, &result).await;
        result
    }

    async fn read_file(
        &self,
        ctx: &OpContext,
        dir: ItemDir,
        filename: &str,
    ) -> Result<Vec<u8>, AssetError> {
        let result = match self.injected(AssetOp::ReadFile).await {
            Ok(()) => self.inner.read_file(ctx, dir, filename).await,
            Err(e) => Err(e),
        };
        self.record(AssetOp::ReadFile, Some(dir), Some(filename), &result)
            .await;
        result
    }

    async fn remove_file(&self, dir: ItemDir, filename: &str) -> Result<(), AssetError> {
        let result = match self.injected(AssetOp::RemoveFile).await {
            Ok(()) => self.inner.remove_file(dir, filename).await,
            Err(e) => Err(e),
        };
        self.record(AssetOp::RemoveFile, Some(dir), Some(filename), &result)
            .await;
        result
    }

    async fn remove_all(&self, dir: ItemDir) -> Result<(), AssetError> {
        let result = match self.injected(AssetOp::RemoveAll).await {
            Ok(()) => self.inner.remove_all(dir).await,
            Err(e) => Err(e),
        };
        self.record(AssetOp::RemoveAll, Some(dir), None, &result).await;
        result
    }

    async fn stage(
        &self,
        ctx: &OpContext,
        file: Option<&FileUpload>,
        image: Option<&[u8]>,
    ) -> Result<StagedAssets, AssetError> {
        let result = match self.injected(AssetOp::Stage).await {
            Ok(()) => self.inner.stage(ctx, file, image).await,
            Err(e) => Err(e),
        };
        let filename = file.map(|f| f.filename.as_str());
        self.record(AssetOp::Stage, None, filename, &result).await;
        result
    }

    async fn promote(
        &self,
        ctx: &OpContext,
        staged: &StagedAssets,
        dir: ItemDir,
    ) -> Result<(), AssetError> {
        let result = match self.injected(AssetOp::Promote).await {
            Ok(()) => self.inner.promote(ctx, staged, dir).await,
            Err(e) => Err(e),
        };
        self.record(AssetOp::Promote, Some(dir), None, &result).await;
        result
    }

    async fn discard(&self, staged: &StagedAssets) {
        self.inner.discard(staged).await;
        self.record::<()>(AssetOp::Discard, None, None, &Ok(())).await;
    }
}
