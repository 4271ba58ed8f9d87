//! On-disk storage for item assets.
//!
//! Every item owns `<root>/<type>s/<id>/`, holding at most one primary file
//! (named by the item's `local_url`) and a cover image under a fixed name.
//! Writes go through a temporary file and a rename, so a failed or
//! interrupted write never leaves a truncated file at the final path.
//!
//! Create requests stage their uploads under `<root>/.staging/<uuid>/` before
//! the item row exists; the staging directory is renamed into place once the
//! id is known.

mod config;
mod error;
mod fs_store;
mod traits;
mod types;

pub use config::AssetStoreConfig;
pub use error::AssetError;
pub use fs_store::FsAssetStore;
pub use traits::AssetStore;
pub use types::{FileUpload, ItemDir, StagedAssets};
