use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration beyond what serde enforces.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.server.operation_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "server.operation_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    let query = &config.query;
    if query.default_limit == 0 || query.max_limit == 0 {
        return Err(ConfigError::ValidationError(
            "query limits cannot be 0".to_string(),
        ));
    }
    if query.default_limit > query.max_limit {
        return Err(ConfigError::ValidationError(format!(
            "query.default_limit ({}) exceeds query.max_limit ({})",
            query.default_limit, query.max_limit
        )));
    }

    let storage = &config.storage;
    if !(1..=100).contains(&storage.jpeg_quality) {
        return Err(ConfigError::ValidationError(
            "storage.jpeg_quality must be between 1 and 100".to_string(),
        ));
    }
    if storage.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "storage.buffer_size cannot be 0".to_string(),
        ));
    }
    let image = storage.image_filename.as_str();
    if image.is_empty() || image.contains(['/', '\\']) || image == "." || image == ".." {
        return Err(ConfigError::ValidationError(format!(
            "storage.image_filename is not a plain file name: {:?}",
            image
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, DatabaseConfig, QueryConfig, ServerConfig, StorageConfig};

    fn valid_config() -> Config {
        Config {
            auth: AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            query: QueryConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_api_key_required() {
        let mut config = valid_config();
        config.auth.method = AuthMethod::ApiKey;
        assert!(validate_config(&config).is_err());

        config.auth.api_key = Some("key".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_default_limit_above_max() {
        let mut config = valid_config();
        config.query.default_limit = 500;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("default_limit"));
    }

    #[test]
    fn test_validate_image_filename_with_separator() {
        let mut config = valid_config();
        config.storage.image_filename = "../cover.jpg".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_jpeg_quality_range() {
        let mut config = valid_config();
        config.storage.jpeg_quality = 0;
        assert!(validate_config(&config).is_err());
    }
}
