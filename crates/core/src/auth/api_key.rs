use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};
use crate::config::AuthMethod;

/// Shared-key authenticator for catalog editors.
///
/// The key travels as `Authorization: Bearer <key>` or `X-API-Key: <key>`.
pub struct ApiKeyAuthenticator {
    expected_key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self {
            expected_key: api_key,
        }
    }

    fn presented_key<'a>(request: &'a AuthRequest) -> Option<&'a str> {
        let bearer = request.header("authorization").and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        });
        bearer.or_else(|| request.header("x-api-key"))
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let key = Self::presented_key(request).ok_or(AuthError::NotAuthenticated)?;

        if keys_match(key.as_bytes(), self.expected_key.as_bytes()) {
            Ok(Identity {
                subject: "editor".to_string(),
                method: AuthMethod::ApiKey.as_str(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::ApiKey
    }
}

/// Length-revealing but otherwise constant-time comparison.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request_with(headers: &[(&str, &str)]) -> AuthRequest {
        AuthRequest {
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            source_ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_bearer_key_accepted() {
        let auth = ApiKeyAuthenticator::new("shelf-key".to_string());
        let identity = auth
            .authenticate(&request_with(&[("Authorization", "Bearer shelf-key")]))
            .await
            .unwrap();
        assert_eq!(identity.subject, "editor");
        assert_eq!(identity.method, "api_key");
    }

    #[tokio::test]
    async fn test_bearer_scheme_case_insensitive() {
        let auth = ApiKeyAuthenticator::new("shelf-key".to_string());
        assert!(auth
            .authenticate(&request_with(&[("Authorization", "BEARER shelf-key")]))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_x_api_key_header_accepted() {
        let auth = ApiKeyAuthenticator::new("shelf-key".to_string());
        assert!(auth
            .authenticate(&request_with(&[("X-API-Key", "shelf-key")]))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        let auth = ApiKeyAuthenticator::new("shelf-key".to_string());
        let result = auth
            .authenticate(&request_with(&[("X-API-Key", "shelf-kez")]))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_key_rejected() {
        let auth = ApiKeyAuthenticator::new("shelf-key".to_string());
        let result = auth.authenticate(&request_with(&[])).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"abc", b"abc"));
        assert!(!keys_match(b"abc", b"abd"));
        assert!(!keys_match(b"abc", b"ab"));
        assert!(keys_match(b"", b""));
    }
}
