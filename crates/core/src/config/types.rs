use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for request bodies (multipart creates, raw replacements).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Deadline applied to every artifact operation.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_operation_timeout() -> u64 {
    30
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared key, required when `method = "api_key"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::ApiKey => "api_key",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("libris.db")
}

/// Asset storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding `<type>s/<id>/` asset folders.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Fixed filename of every item's cover image.
    #[serde(default = "default_image_filename")]
    pub image_filename: String,
    /// Chunk size used when streaming content to disk.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// JPEG quality used when re-encoding cover images (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            image_filename: default_image_filename(),
            buffer_size: default_buffer_size(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("storage")
}

fn default_image_filename() -> String {
    "original.jpg".to_string()
}

fn default_buffer_size() -> usize {
    64 * 1024
}

fn default_jpeg_quality() -> u8 {
    85
}

/// List endpoint pagination defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> u32 {
    20
}

fn default_max_limit() -> u32 {
    100
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
                api_key_configured: config
                    .auth
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            storage: config.storage.clone(),
            query: config.query.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[auth]
method = "none"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::None);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "libris.db");
        assert_eq!(config.storage.root.to_str().unwrap(), "storage");
        assert_eq!(config.storage.image_filename, "original.jpg");
        assert_eq!(config.query.default_limit, 20);
        assert_eq!(config.query.max_limit, 100);
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[auth]
method = "api_key"
api_key = "s3cret"

[server]
host = "127.0.0.1"
port = 9000
max_upload_bytes = 1024
operation_timeout_secs = 5

[database]
path = "/data/catalog.sqlite"

[storage]
root = "/data/assets"
image_filename = "cover.jpg"
jpeg_quality = 70

[query]
default_limit = 10
max_limit = 50
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::ApiKey);
        assert_eq!(config.auth.api_key.as_deref(), Some("s3cret"));
        assert_eq!(config.server.max_upload_bytes, 1024);
        assert_eq!(config.server.operation_timeout_secs, 5);
        assert_eq!(config.storage.root.to_str().unwrap(), "/data/assets");
        assert_eq!(config.storage.image_filename, "cover.jpg");
        assert_eq!(config.storage.jpeg_quality, 70);
        assert_eq!(config.storage.buffer_size, 64 * 1024);
        assert_eq!(config.query.default_limit, 10);
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            auth: AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some("top-secret".to_string()),
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            query: QueryConfig::default(),
        };
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.auth.method, "api_key");
        assert!(sanitized.auth.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("top-secret"));
    }
}
