//! Relational catalog of learning resources.
//!
//! Each content type lives in its own table with a tag link table next to
//! it. Directions, authors and tags are shared reference tables.

mod references;
mod sqlite;
mod types;

pub use sqlite::SqliteCatalogStore;
pub use types::*;

use crate::query::ListDescriptor;

/// Storage for catalog item rows.
pub trait CatalogStore: Send + Sync {
    /// Insert a row with its tags and asset pointers, returning the new id.
    fn insert(&self, item: &NewItem, assets: &AssetPointers) -> Result<i64, CatalogError>;

    fn get(&self, content_type: ContentType, id: i64) -> Result<CatalogItem, CatalogError>;

    fn exists(&self, content_type: ContentType, id: i64) -> Result<bool, CatalogError>;

    /// Execute a screened list descriptor.
    ///
    /// Unknown sort fields fall back to `id ASC`; unknown filter fields are
    /// ignored.
    fn list(
        &self,
        content_type: ContentType,
        descriptor: &ListDescriptor,
    ) -> Result<ItemPage, CatalogError>;

    /// Apply the supplied metadata fields. A supplied tag list replaces the
    /// item's tags.
    fn update_metadata(
        &self,
        content_type: ContentType,
        update: &MetadataUpdate,
    ) -> Result<(), CatalogError>;

    fn set_local_url(
        &self,
        content_type: ContentType,
        id: i64,
        local_url: Option<&str>,
    ) -> Result<(), CatalogError>;

    fn set_image_url(
        &self,
        content_type: ContentType,
        id: i64,
        image_url: Option<&str>,
    ) -> Result<(), CatalogError>;

    /// Fold one rating into the running mean and return the new mean.
    fn rate(&self, content_type: ContentType, id: i64, rating: f64) -> Result<f64, CatalogError>;

    fn bump_download_count(&self, content_type: ContentType, id: i64) -> Result<(), CatalogError>;

    fn delete(&self, content_type: ContentType, id: i64) -> Result<(), CatalogError>;

    /// Number of rows of one content type.
    fn count(&self, content_type: ContentType) -> Result<u64, CatalogError>;
}

/// Storage for the shared reference entities.
pub trait ReferenceStore: Send + Sync {
    fn list_directions(&self) -> Result<Vec<Direction>, CatalogError>;

    fn create_direction(&self, name: &str) -> Result<Direction, CatalogError>;

    fn list_authors(&self) -> Result<Vec<Author>, CatalogError>;

    fn create_author(&self, full_name: &str) -> Result<Author, CatalogError>;

    fn list_tags(&self) -> Result<Vec<Tag>, CatalogError>;

    fn create_tag(&self, name: &str) -> Result<Tag, CatalogError>;
}
