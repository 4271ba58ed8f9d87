//! Request authentication for catalog mutations.
//!
//! Reads are public; the server runs mutating routes (create, update,
//! replace, rate, delete, reference management) through an [`Authenticator`].

mod api_key;

pub use api_key::ApiKeyAuthenticator;

use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Request data an authenticator may inspect. Header names are lowercase.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Who performed a request, attached to request extensions by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub method: &'static str,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            method: AuthMethod::None.as_str(),
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    fn method(&self) -> AuthMethod;
}

/// Accepts every request as anonymous. Only used when explicitly configured.
#[derive(Debug, Default)]
pub struct AnonymousAuthenticator;

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::None
    }
}

/// Build the authenticator selected by `[auth]`.
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(AnonymousAuthenticator)),
        AuthMethod::ApiKey => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "api_key must be set when using the api_key method".to_string(),
                    )
                })?;
            Ok(Box::new(ApiKeyAuthenticator::new(key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_request() -> AuthRequest {
        AuthRequest {
            headers: HashMap::new(),
            source_ip: "10.0.0.1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_anonymous_authenticator_accepts_everything() {
        let identity = AnonymousAuthenticator
            .authenticate(&empty_request())
            .await
            .unwrap();
        assert_eq!(identity, Identity::anonymous());
    }

    #[test]
    fn test_factory_none() {
        let auth = create_authenticator(&AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        })
        .unwrap();
        assert_eq!(auth.method(), AuthMethod::None);
    }

    #[test]
    fn test_factory_api_key() {
        let auth = create_authenticator(&AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("k".to_string()),
        })
        .unwrap();
        assert_eq!(auth.method(), AuthMethod::ApiKey);
    }

    #[test]
    fn test_factory_api_key_blank_key_rejected() {
        let result = create_authenticator(&AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some(String::new()),
        });
        assert!(matches!(result, Err(AuthError::ConfigurationError(_))));
    }
}
