pub mod artifact;
pub mod assets;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod context;
pub mod metrics;
pub mod query;
pub mod testing;
pub mod validation;

pub use artifact::{ArtifactError, ArtifactService, ErrorKind};
pub use assets::{AssetError, AssetStore, AssetStoreConfig, FileUpload, FsAssetStore, ItemDir};
pub use auth::{
    create_authenticator, AnonymousAuthenticator, ApiKeyAuthenticator, AuthError, AuthRequest,
    Authenticator, Identity,
};
pub use catalog::{
    AssetPointers, Author, CatalogError, CatalogItem, CatalogStore, ContentType, Difficulty,
    Direction, ItemPage, MetadataUpdate, NewItem, ReferenceStore, SqliteCatalogStore, Tag,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use context::{Interrupted, OpContext};
pub use query::{ListDescriptor, QueryTranslator, RawListParams, SortDirection};
pub use validation::{FieldError, NewItemBuilder, ValidationErrors};
