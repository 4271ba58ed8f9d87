use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use libris_core::{
    ArtifactService, AssetStore, Authenticator, CatalogStore, Config, ContentType,
    QueryTranslator, ReferenceStore, SanitizedConfig,
};

/// One artifact service per content type.
struct Services {
    books: ArtifactService,
    articles: ArtifactService,
    audios: ArtifactService,
    videos: ArtifactService,
}

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    services: Services,
    references: Arc<dyn ReferenceStore>,
    translator: QueryTranslator,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        catalog: Arc<dyn CatalogStore>,
        references: Arc<dyn ReferenceStore>,
        assets: Arc<dyn AssetStore>,
        shutdown: CancellationToken,
    ) -> Self {
        let timeout = Duration::from_secs(config.server.operation_timeout_secs);
        let service = |content_type| {
            ArtifactService::new(
                content_type,
                Arc::clone(&catalog),
                Arc::clone(&assets),
                timeout,
            )
        };
        let services = Services {
            books: service(ContentType::Book),
            articles: service(ContentType::Article),
            audios: service(ContentType::Audio),
            videos: service(ContentType::Video),
        };
        let translator = QueryTranslator::new(&config.query);

        Self {
            config,
            authenticator,
            services,
            references,
            translator,
            shutdown,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn service(&self, content_type: ContentType) -> &ArtifactService {
        match content_type {
            ContentType::Book => &self.services.books,
            ContentType::Article => &self.services.articles,
            ContentType::Audio => &self.services.audios,
            ContentType::Video => &self.services.videos,
        }
    }

    pub fn references(&self) -> &dyn ReferenceStore {
        self.references.as_ref()
    }

    pub fn translator(&self) -> &QueryTranslator {
        &self.translator
    }

    /// Token for one request; cancelled when the server shuts down.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
