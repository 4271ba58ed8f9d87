//! Common test utilities for end-to-end tests.
//!
//! The fixture builds the real router over a scratch database and asset
//! directory, so requests exercise every layer in-process.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use libris_core::config::{
    AuthConfig, AuthMethod, Config, DatabaseConfig, QueryConfig, ServerConfig, StorageConfig,
};
use libris_core::{
    create_authenticator, AssetStore, AssetStoreConfig, CatalogStore, FsAssetStore,
    ReferenceStore, SqliteCatalogStore,
};
use libris_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use libris_core::testing::sample_png;

const BOUNDARY: &str = "libris-test-boundary";

/// Test fixture for E2E testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_create_book() {
///     let fixture = TestFixture::new().await;
///     let form = Multipart::new().text("title", "Go Basics");
///     let response = fixture.post_multipart("/api/v1/books", form).await;
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub catalog: Arc<SqliteCatalogStore>,
    pub storage_root: PathBuf,
    pub shutdown: CancellationToken,
    /// Keeps the database and assets alive for the fixture's lifetime
    pub temp_dir: TempDir,
    api_key: Option<String>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Bytes,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Require this API key on mutating routes
    pub api_key: Option<String>,
    pub max_upload_bytes: usize,
    pub operation_timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_upload_bytes: 1024 * 1024,
            operation_timeout_secs: 30,
        }
    }
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// A valid Book form for direction 1 and author 1.
pub fn book_form(title: &str) -> Multipart {
    Multipart::new()
        .text("title", title)
        .text("direction_id", "1")
        .text("difficulty", "junior")
        .text("author_id", "1")
        .text("language", "en")
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage_root = temp_dir.path().join("storage");

        let config = Config {
            auth: AuthConfig {
                method: if test_config.api_key.is_some() {
                    AuthMethod::ApiKey
                } else {
                    AuthMethod::None
                },
                api_key: test_config.api_key.clone(),
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
                max_upload_bytes: test_config.max_upload_bytes,
                operation_timeout_secs: test_config.operation_timeout_secs,
            },
            database: DatabaseConfig {
                path: temp_dir.path().join("test.db"),
            },
            storage: StorageConfig {
                root: storage_root.clone(),
                ..Default::default()
            },
            query: QueryConfig::default(),
        };

        let catalog = Arc::new(
            SqliteCatalogStore::new(&config.database.path).expect("Failed to create catalog"),
        );
        catalog.create_direction("Programming").unwrap();
        catalog.create_author("Rob Pike").unwrap();
        catalog.create_tag("go").unwrap();

        let assets = Arc::new(FsAssetStore::new(AssetStoreConfig::from(&config.storage)));
        let authenticator = Arc::from(create_authenticator(&config.auth).unwrap());
        let shutdown = CancellationToken::new();

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Arc::clone(&catalog) as Arc<dyn CatalogStore>,
            Arc::clone(&catalog) as Arc<dyn ReferenceStore>,
            assets as Arc<dyn AssetStore>,
            shutdown.clone(),
        ));

        Self {
            router: create_router(state),
            catalog,
            storage_root,
            shutdown,
            temp_dir,
            api_key: test_config.api_key,
        }
    }

    /// Directory holding one item's assets.
    pub fn item_dir(&self, collection: &str, id: i64) -> PathBuf {
        self.storage_root.join(collection).join(id.to_string())
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send("GET", path, None, Body::empty()).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send("DELETE", path, None, Body::empty()).await
    }

    pub async fn patch(&self, path: &str) -> TestResponse {
        self.send("PATCH", path, None, Body::empty()).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> TestResponse {
        self.send(
            "POST",
            path,
            Some("application/json"),
            Body::from(serde_json::to_vec(&body).unwrap()),
        )
        .await
    }

    pub async fn put_json(&self, path: &str, body: Value) -> TestResponse {
        self.send(
            "PUT",
            path,
            Some("application/json"),
            Body::from(serde_json::to_vec(&body).unwrap()),
        )
        .await
    }

    pub async fn put_bytes(&self, path: &str, body: &[u8]) -> TestResponse {
        self.send(
            "PUT",
            path,
            Some("application/octet-stream"),
            Body::from(body.to_vec()),
        )
        .await
    }

    pub async fn post_multipart(&self, path: &str, form: Multipart) -> TestResponse {
        let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
        self.send("POST", path, Some(&content_type), Body::from(form.finish()))
            .await
    }

    /// Create a book and return its id.
    pub async fn create_book(&self, form: Multipart) -> i64 {
        let response = self.post_multipart("/api/v1/books", form).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        created_id(&response.body)
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        content_type: Option<&str>,
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        self.send_request(builder.body(body).unwrap()).await
    }

    /// Send a prepared request as-is.
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            bytes,
        }
    }
}

/// Extract the id from `"<Type> created successfully. id: <id>"`.
pub fn created_id(body: &Value) -> i64 {
    body["infoMsg"]
        .as_str()
        .and_then(|msg| msg.rsplit("id: ").next())
        .and_then(|id| id.trim().parse().ok())
        .unwrap_or_else(|| panic!("no id in {:?}", body))
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
