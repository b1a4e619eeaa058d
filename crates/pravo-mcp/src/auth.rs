//! Endpoint authentication.
//!
//! Two credentials are accepted: an API key in `X-Api-Key`, or a bearer
//! token `<user_uuid>.<signature>` whose signature is the hex SHA-256 of
//! `"<secret>:<user_uuid>"`. The bearer form identifies the caller, which
//! scopes document reads; the API key grants service access with the
//! public view. `initialize` and `ping` stay open for client discovery.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Who the caller is, once authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// Service access via API key; sees public documents only.
    Service,
    /// An identified user; sees public documents plus their own.
    User(Uuid),
    /// No credentials presented.
    Anonymous,
}

/// Auth material the server was configured with.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub bearer_secret: Option<String>,
}

impl AuthConfig {
    /// Whether any credential is configured at all. An endpoint without
    /// credentials runs open (development mode).
    pub fn is_open(&self) -> bool {
        self.api_key.is_none() && self.bearer_secret.is_none()
    }

    /// The signature expected for a user id under the configured secret.
    pub fn sign(&self, user_id: &Uuid) -> Option<String> {
        let secret = self.bearer_secret.as_deref()?;
        let digest = Sha256::digest(format!("{secret}:{user_id}").as_bytes());
        Some(hex::encode(digest))
    }
}

/// Resolves the caller from request headers.
pub fn authenticate(headers: &HeaderMap, config: &AuthConfig) -> Caller {
    if let (Some(expected), Some(presented)) = (
        config.api_key.as_deref(),
        headers.get("x-api-key").and_then(|v| v.to_str().ok()),
    ) {
        if presented == expected {
            return Caller::Service;
        }
    }

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        if let Some((user_raw, signature)) = token.split_once('.') {
            if let Ok(user_id) = Uuid::parse_str(user_raw) {
                if config.sign(&user_id).as_deref() == Some(signature) {
                    return Caller::User(user_id);
                }
            }
        }
    }

    Caller::Anonymous
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(key: &str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::HeaderName::from_bytes(key.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_api_key_grants_service_access() {
        let config = AuthConfig {
            api_key: Some("k-123".into()),
            bearer_secret: None,
        };
        assert_eq!(
            authenticate(&headers_with("x-api-key", "k-123"), &config),
            Caller::Service
        );
        assert_eq!(
            authenticate(&headers_with("x-api-key", "wrong"), &config),
            Caller::Anonymous
        );
    }

    #[test]
    fn test_bearer_token_identifies_user() {
        let config = AuthConfig {
            api_key: None,
            bearer_secret: Some("secret".into()),
        };
        let user = Uuid::new_v4();
        let token = format!("{user}.{}", config.sign(&user).unwrap());
        assert_eq!(
            authenticate(
                &headers_with("authorization", &format!("Bearer {token}")),
                &config
            ),
            Caller::User(user)
        );
    }

    #[test]
    fn test_forged_signature_rejected() {
        let config = AuthConfig {
            api_key: None,
            bearer_secret: Some("secret".into()),
        };
        let user = Uuid::new_v4();
        let token = format!("{user}.{}", "f".repeat(64));
        assert_eq!(
            authenticate(
                &headers_with("authorization", &format!("Bearer {token}")),
                &config
            ),
            Caller::Anonymous
        );
    }
}
