//! Bearer token handling.
//!
//! Tokens are HS256 JWTs carrying `{"userId": "<uuid>"}`. Issuance normally
//! happens in the account service; [`issue_token`] exists for tooling and
//! tests that share the same secret.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tracker_core::{defaults, Error, Result, UserId};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a token for `user` valid for `ttl_secs` seconds.
pub fn issue_token(secret: &[u8], user: UserId, ttl_secs: i64) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        user_id: user,
        iat: now,
        exp: now + ttl_secs,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}

/// Sign a token with the default lifetime.
pub fn issue_default_token(secret: &[u8], user: UserId) -> Result<String> {
    issue_token(secret, user, defaults::TOKEN_TTL_SECS)
}

/// Verify signature and expiry, returning the authenticated user.
pub fn verify_token(secret: &[u8], token: &str) -> Result<UserId> {
    let validation = Validation::new(Algorithm::HS256);
    match decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation) {
        Ok(data) => Ok(data.claims.user_id),
        Err(e) => {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                debug!("Rejected expired token");
                Err(Error::Unauthorized("Token expired".into()))
            } else {
                debug!(error = %e, "Rejected invalid token");
                Err(Error::Unauthorized("Invalid token".into()))
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor for routes that require an authenticated user.
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth {
    pub user_id: UserId,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        let user_id = verify_token(state.jwt_secret(), token)?;
        Ok(RequireAuth { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn test_issue_then_verify() {
        let user = UserId::random();
        let token = issue_default_token(SECRET, user).unwrap();
        assert_eq!(verify_token(SECRET, &token).unwrap(), user);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(SECRET, UserId::random(), -3600).unwrap();
        let err = verify_token(SECRET, &token).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(msg) if msg == "Token expired"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_default_token(SECRET, UserId::random()).unwrap();
        assert!(verify_token(b"other-secret", &token).is_err());
        assert!(verify_token(SECRET, "not.a.jwt").is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
