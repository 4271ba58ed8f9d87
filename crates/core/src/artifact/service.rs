//! Lifecycle operations for one content type.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{ArtifactError, ErrorKind};
use super::locks::ItemLocks;
use crate::assets::{AssetStore, FileUpload, ItemDir};
use crate::catalog::{CatalogItem, CatalogStore, ContentType, ItemPage, MetadataUpdate, NewItem};
use crate::context::OpContext;
use crate::metrics;
use crate::query::ListDescriptor;
use crate::validation::{rules, FieldError};

/// Coordinates the catalog row and the on-disk assets of items of a single
/// content type.
///
/// Every operation derives an [`OpContext`] from the caller's token and the
/// configured deadline, and checks it before each irreversible step.
/// Asset-mutating operations on the same item are serialized.
pub struct ArtifactService {
    content_type: ContentType,
    catalog: Arc<dyn CatalogStore>,
    assets: Arc<dyn AssetStore>,
    locks: ItemLocks,
    operation_timeout: Duration,
}

impl ArtifactService {
    pub fn new(
        content_type: ContentType,
        catalog: Arc<dyn CatalogStore>,
        assets: Arc<dyn AssetStore>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            content_type,
            catalog,
            assets,
            locks: ItemLocks::new(),
            operation_timeout,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    fn context(&self, token: &CancellationToken) -> OpContext {
        OpContext::new(token.clone(), self.operation_timeout)
    }

    fn dir(&self, id: i64) -> ItemDir {
        ItemDir::new(self.content_type, id)
    }

    /// Count the outcome and log failures.
    fn observe<T>(
        &self,
        op: &'static str,
        id: Option<i64>,
        started: Instant,
        result: &Result<T, ArtifactError>,
    ) {
        let ct = self.content_type.as_str();
        let outcome = match result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        metrics::ARTIFACT_OPERATIONS
            .with_label_values(&[ct, op, outcome])
            .inc();
        metrics::ARTIFACT_OPERATION_DURATION
            .with_label_values(&[ct, op])
            .observe(started.elapsed().as_secs_f64());

        if let Err(e) = result {
            match e.kind() {
                ErrorKind::Storage => {
                    error!(content_type = ct, op, id, error = %e, "Artifact operation failed")
                }
                ErrorKind::Cancelled | ErrorKind::DeadlineExceeded => {
                    warn!(content_type = ct, op, id, error = %e, "Artifact operation interrupted")
                }
                ErrorKind::Validation | ErrorKind::NotFound => {
                    debug!(content_type = ct, op, id, error = %e, "Artifact operation rejected")
                }
            }
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Stage the uploads, insert the row, then move the assets into the
    /// item directory. Returns the new id once everything is in place.
    ///
    /// The commit runs on its own task, so it completes (or compensates)
    /// even when the caller stops polling midway.
    pub async fn create(
        &self,
        token: &CancellationToken,
        item: NewItem,
        file: Option<FileUpload>,
        image: Option<Vec<u8>>,
    ) -> Result<i64, ArtifactError> {
        let started = Instant::now();
        let job = CreateJob {
            content_type: self.content_type,
            catalog: Arc::clone(&self.catalog),
            assets: Arc::clone(&self.assets),
        };
        let result = match tokio::spawn(job.run(self.context(token), item, file, image)).await {
            Ok(result) => result,
            Err(e) => Err(ArtifactError::Storage(format!("create task failed: {}", e))),
        };
        self.observe("create", result.as_ref().ok().copied(), started, &result);
        result
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Apply a partial metadata update. Asset pointers are never touched.
    pub async fn update(
        &self,
        token: &CancellationToken,
        update: MetadataUpdate,
    ) -> Result<(), ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let result = self.update_inner(&ctx, &update);
        self.observe("update", Some(update.id), started, &result);
        result
    }

    fn update_inner(&self, ctx: &OpContext, update: &MetadataUpdate) -> Result<(), ArtifactError> {
        update.validate(self.content_type)?;
        ctx.check()?;
        self.catalog.update_metadata(self.content_type, update)?;
        info!(
            content_type = self.content_type.as_str(),
            id = update.id,
            "Updated item metadata"
        );
        Ok(())
    }

    /// Record one rating and return the new average.
    pub async fn rate(
        &self,
        token: &CancellationToken,
        id: i64,
        rating: f64,
    ) -> Result<f64, ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let result = self.rate_inner(&ctx, id, rating);
        self.observe("rate", Some(id), started, &result);
        result
    }

    fn rate_inner(&self, ctx: &OpContext, id: i64, rating: f64) -> Result<f64, ArtifactError> {
        rules::positive_id("id", id)?;
        let rating = rules::rating("rating", rating)?;
        ctx.check()?;
        let average = self.catalog.rate(self.content_type, id, rating)?;
        debug!(
            content_type = self.content_type.as_str(),
            id,
            rating,
            average,
            "Recorded rating"
        );
        Ok(average)
    }

    pub async fn bump_download_count(
        &self,
        token: &CancellationToken,
        id: i64,
    ) -> Result<(), ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let result = ctx
            .check()
            .map_err(ArtifactError::from)
            .and_then(|()| {
                self.catalog
                    .bump_download_count(self.content_type, id)
                    .map_err(ArtifactError::from)
            });
        self.observe("bump_download_count", Some(id), started, &result);
        result
    }

    // =========================================================================
    // Assets
    // =========================================================================

    /// Replace the item's primary file.
    ///
    /// With no current file, `old_name` is ignored and `new_name` becomes the
    /// pointer. Otherwise `old_name` must name the current file; the same name
    /// is overwritten in place, a new name is written, recorded, and the old
    /// file removed.
    pub async fn replace_file(
        &self,
        token: &CancellationToken,
        id: i64,
        old_name: &str,
        new_name: &str,
        content: &[u8],
    ) -> Result<(), ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let _guard = self.locks.lock(id).await;
        let result = self
            .replace_file_inner(&ctx, id, old_name, new_name, content)
            .await;
        self.observe("replace_file", Some(id), started, &result);
        result
    }

    async fn replace_file_inner(
        &self,
        ctx: &OpContext,
        id: i64,
        old_name: &str,
        new_name: &str,
        content: &[u8],
    ) -> Result<(), ArtifactError> {
        let ct = self.content_type;
        self.assets.validate_filename(new_name)?;
        ctx.check()?;

        let item = self.catalog.get(ct, id)?;
        let dir = self.dir(id);

        let current = match item.local_url.as_deref() {
            Some(current) if current != old_name => {
                return Err(FieldError::invalid(
                    "old_name",
                    format!("{:?} is not the current file", old_name),
                )
                .into());
            }
            current => current,
        };

        if current == Some(new_name) {
            self.assets.write_file(ctx, dir, new_name, content).await?;
            info!(content_type = ct.as_str(), id, file = new_name, "Overwrote item file");
            return Ok(());
        }

        self.assets.write_file(ctx, dir, new_name, content).await?;

        let persisted = ctx
            .check()
            .map_err(ArtifactError::from)
            .and_then(|()| {
                self.catalog
                    .set_local_url(ct, id, Some(new_name))
                    .map_err(ArtifactError::from)
            });
        if let Err(e) = persisted {
            if let Err(cleanup) = self.assets.remove_file(dir, new_name).await {
                warn!(
                    content_type = ct.as_str(),
                    id,
                    path = %dir,
                    file = new_name,
                    error = %cleanup,
                    "Failed to remove new file after pointer update failed"
                );
            }
            return Err(e);
        }

        if let Some(old) = current {
            if let Err(e) = self.assets.remove_file(dir, old).await {
                metrics::ORPHANED_FILES.inc();
                warn!(
                    content_type = ct.as_str(),
                    id,
                    path = %dir,
                    file = old,
                    error = %e,
                    "Old file left behind after replacement"
                );
            }
        }

        info!(
            content_type = ct.as_str(),
            id,
            old = current,
            new = new_name,
            "Replaced item file"
        );
        Ok(())
    }

    /// Re-encode and store the cover image, setting the pointer if unset.
    pub async fn replace_image(
        &self,
        token: &CancellationToken,
        id: i64,
        image: &[u8],
    ) -> Result<(), ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let _guard = self.locks.lock(id).await;
        let result = self.replace_image_inner(&ctx, id, image).await;
        self.observe("replace_image", Some(id), started, &result);
        result
    }

    async fn replace_image_inner(
        &self,
        ctx: &OpContext,
        id: i64,
        image: &[u8],
    ) -> Result<(), ArtifactError> {
        let ct = self.content_type;
        ctx.check()?;
        let item = self.catalog.get(ct, id)?;
        let dir = self.dir(id);

        self.assets.write_image(ctx, dir, image).await?;

        if item.image_url.is_none() {
            let filename = self.assets.image_filename();
            if let Err(e) = self.catalog.set_image_url(ct, id, Some(filename)) {
                // The image did not exist before this call
                if let Err(cleanup) = self.assets.remove_file(dir, filename).await {
                    warn!(
                        content_type = ct.as_str(),
                        id,
                        path = %dir,
                        error = %cleanup,
                        "Failed to remove image after pointer update failed"
                    );
                }
                return Err(e.into());
            }
        }

        info!(content_type = ct.as_str(), id, "Replaced item image");
        Ok(())
    }

    /// Read the primary file and count the download.
    pub async fn download(
        &self,
        token: &CancellationToken,
        id: i64,
    ) -> Result<(String, Vec<u8>), ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let result = self.download_inner(&ctx, id).await;
        self.observe("download", Some(id), started, &result);
        result
    }

    async fn download_inner(
        &self,
        ctx: &OpContext,
        id: i64,
    ) -> Result<(String, Vec<u8>), ArtifactError> {
        let ct = self.content_type;
        ctx.check()?;
        let item = self.catalog.get(ct, id)?;
        let filename = item
            .local_url
            .ok_or_else(|| ArtifactError::NotFound(format!("{} {} has no file", ct, id)))?;

        let bytes = self.assets.read_file(ctx, self.dir(id), &filename).await?;
        self.catalog.bump_download_count(ct, id)?;

        debug!(content_type = ct.as_str(), id, file = %filename, bytes = bytes.len(), "Served download");
        Ok((filename, bytes))
    }

    /// Read the cover image.
    pub async fn image(&self, token: &CancellationToken, id: i64) -> Result<Vec<u8>, ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let result = self.image_inner(&ctx, id).await;
        self.observe("image", Some(id), started, &result);
        result
    }

    async fn image_inner(&self, ctx: &OpContext, id: i64) -> Result<Vec<u8>, ArtifactError> {
        ctx.check()?;
        let item = self.catalog.get(self.content_type, id)?;
        let filename = item.image_url.ok_or_else(|| {
            ArtifactError::NotFound(format!("{} {} has no image", self.content_type, id))
        })?;
        Ok(self.assets.read_file(ctx, self.dir(id), &filename).await?)
    }

    /// Remove the item directory, then the row.
    pub async fn delete(&self, token: &CancellationToken, id: i64) -> Result<(), ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let _guard = self.locks.lock(id).await;
        let result = self.delete_inner(&ctx, id).await;
        self.observe("delete", Some(id), started, &result);
        result
    }

    async fn delete_inner(&self, ctx: &OpContext, id: i64) -> Result<(), ArtifactError> {
        let ct = self.content_type;
        if !self.catalog.exists(ct, id)? {
            return Err(ArtifactError::NotFound(format!("{} {}", ct, id)));
        }
        ctx.check()?;

        let dir = self.dir(id);
        self.assets.remove_all(dir).await?;
        // Files are gone; the row removal completes the delete regardless of
        // the context.
        self.catalog.delete(ct, id)?;

        info!(content_type = ct.as_str(), id, path = %dir, "Deleted item");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_all(
        &self,
        token: &CancellationToken,
        descriptor: &ListDescriptor,
    ) -> Result<ItemPage, ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let result = ctx
            .check()
            .map_err(ArtifactError::from)
            .and_then(|()| {
                self.catalog
                    .list(self.content_type, descriptor)
                    .map_err(ArtifactError::from)
            });
        self.observe("get_all", None, started, &result);
        result
    }

    pub async fn get_by_id(
        &self,
        token: &CancellationToken,
        id: i64,
    ) -> Result<CatalogItem, ArtifactError> {
        let started = Instant::now();
        let ctx = self.context(token);
        let result = ctx
            .check()
            .map_err(ArtifactError::from)
            .and_then(|()| {
                self.catalog
                    .get(self.content_type, id)
                    .map_err(ArtifactError::from)
            });
        self.observe("get_by_id", Some(id), started, &result);
        result
    }

    /// Number of rows of this content type.
    pub fn count(&self) -> Result<u64, ArtifactError> {
        Ok(self.catalog.count(self.content_type)?)
    }
}

/// Owned handles for one create, detached from the request future.
struct CreateJob {
    content_type: ContentType,
    catalog: Arc<dyn CatalogStore>,
    assets: Arc<dyn AssetStore>,
}

impl CreateJob {
    async fn run(
        self,
        ctx: OpContext,
        item: NewItem,
        file: Option<FileUpload>,
        image: Option<Vec<u8>>,
    ) -> Result<i64, ArtifactError> {
        let ct = self.content_type;
        if item.content_type != ct {
            return Err(ArtifactError::invalid(
                "type",
                format!("expected {}, got {}", ct, item.content_type),
            ));
        }
        ctx.check()?;

        let staged = self
            .assets
            .stage(&ctx, file.as_ref(), image.as_deref())
            .await?;

        if let Err(e) = ctx.check() {
            self.assets.discard(&staged).await;
            return Err(e.into());
        }

        let id = match self.catalog.insert(&item, staged.pointers()) {
            Ok(id) => id,
            Err(e) => {
                self.assets.discard(&staged).await;
                return Err(e.into());
            }
        };

        let dir = ItemDir::new(ct, id);
        if let Err(e) = self.assets.promote(&ctx, &staged, dir).await {
            error!(
                content_type = ct.as_str(),
                id,
                path = %dir,
                error = %e,
                "Promoting staged assets failed, removing row"
            );
            metrics::CREATE_COMPENSATIONS.inc();
            if let Err(delete_err) = self.catalog.delete(ct, id) {
                error!(
                    content_type = ct.as_str(),
                    id,
                    error = %delete_err,
                    "Compensating delete failed, row left without assets"
                );
            }
            self.assets.discard(&staged).await;
            return Err(e.into());
        }

        info!(
            content_type = ct.as_str(),
            id,
            title = %item.title,
            file = staged.pointers().local_url.as_deref(),
            image = staged.pointers().image_url.is_some(),
            "Created item"
        );
        Ok(id)
    }
}
