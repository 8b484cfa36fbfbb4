//! Authentication utilities
//!
//! Provides:
//! - JWT token generation and validation
//! - Caller identity (`{id, role}`) extraction from a bearer header or session cookie

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Role name carried by elevated accounts
pub const DIRECTOR_ROLE: &str = "director";

/// Authorization role. Anything other than `director` is a contributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Director,
    Contributor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Director => DIRECTOR_ROLE,
            Role::Contributor => "contributor",
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case(DIRECTOR_ROLE) {
            Role::Director
        } else {
            Role::Contributor
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved identity of the caller, threaded explicitly through every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
    pub email: Option<String>,
}

impl Caller {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role, email: None }
    }

    pub fn director(id: Uuid) -> Self {
        Self::new(id, Role::Director)
    }

    pub fn contributor(id: Uuid) -> Self {
        Self::new(id, Role::Contributor)
    }

    pub fn is_director(&self) -> bool {
        self.role == Role::Director
    }

    /// Require the director role
    pub fn require_director(&self) -> Result<()> {
        if self.is_director() {
            Ok(())
        } else {
            Err(AppError::forbidden("Director role required"))
        }
    }

    /// Require the director role or that the caller is `user_id`
    pub fn require_self_or_director(&self, user_id: Uuid) -> Result<()> {
        if self.is_director() || self.id == user_id {
            Ok(())
        } else {
            Err(AppError::forbidden("Access limited to the account owner or a director"))
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Role name
    pub role: String,

    /// Account email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl TryFrom<JwtClaims> for Caller {
    type Error = AppError;

    fn try_from(claims: JwtClaims) -> Result<Self> {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
        Ok(Caller {
            id,
            role: Role::from(claims.role.as_str()),
            email: claims.email,
        })
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
    cookie_name: String,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
            cookie_name: "token".to_string(),
        }
    }

    /// Use a different session cookie name
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, user_id: Uuid, role: Role, email: Option<String>) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            email,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }

    /// Resolve the caller from request headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Caller> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token)
            .or_else(|| token_from_cookies(headers, &self.cookie_name))
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing bearer token or session cookie".to_string(),
            })?;

        let claims = self.validate_token(token)?;
        Caller::try_from(claims)
    }
}

/// Extract token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Find a named cookie across all Cookie headers
pub fn token_from_cookies<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

/// Axum extractor for the caller identity
impl<S> FromRequestParts<S> for Caller
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let jwt = Arc::<JwtManager>::from_ref(state);
        let caller = jwt.authenticate(&parts.headers)?;

        tracing::debug!(caller_id = %caller.id, role = %caller.role, "Caller authenticated");

        Ok(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from("director"), Role::Director);
        assert_eq!(Role::from("Director"), Role::Director);
        assert_eq!(Role::from("researcher"), Role::Contributor);
        assert_eq!(Role::from(""), Role::Contributor);
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("abc.def"), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_token_from_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc123"));
        assert_eq!(token_from_cookies(&headers, "token"), Some("abc123"));
        assert_eq!(token_from_cookies(&headers, "session"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let user_id = Uuid::new_v4();

        let token = manager
            .generate_token(user_id, Role::Director, Some("d@coe.edu".into()))
            .unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "director");

        let caller = Caller::try_from(claims).unwrap();
        assert!(caller.is_director());
        assert_eq!(caller.email.as_deref(), Some("d@coe.edu"));
    }

    #[test]
    fn test_authenticate_from_header_and_cookie() {
        let manager = JwtManager::new("test_secret", 3600).with_cookie_name("session");
        let user_id = Uuid::new_v4();
        let token = manager.generate_token(user_id, Role::Contributor, None).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(manager.authenticate(&headers).unwrap().id, user_id);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("session={}", token)).unwrap(),
        );
        let caller = manager.authenticate(&headers).unwrap();
        assert_eq!(caller.role, Role::Contributor);
    }

    #[test]
    fn test_authenticate_rejects_missing_and_forged_tokens() {
        let manager = JwtManager::new("test_secret", 3600);
        assert!(matches!(
            manager.authenticate(&HeaderMap::new()),
            Err(AppError::Unauthorized { .. })
        ));

        let forged = JwtManager::new("other_secret", 3600)
            .generate_token(Uuid::new_v4(), Role::Director, None)
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", forged)).unwrap(),
        );
        assert!(matches!(manager.authenticate(&headers), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_self_or_director() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(Caller::contributor(me).require_self_or_director(me).is_ok());
        assert!(Caller::contributor(me).require_self_or_director(other).is_err());
        assert!(Caller::director(me).require_self_or_director(other).is_ok());
        assert!(Caller::contributor(me).require_director().is_err());
    }
}
