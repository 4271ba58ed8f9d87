//! Catalog item lifecycle: the catalog row and its assets kept in step.

mod error;
mod locks;
mod service;

pub use error::{ArtifactError, ErrorKind};
pub use locks::{ItemGuard, ItemLocks};
pub use service::ArtifactService;
