//! Bearer token issuance and validation.
//!
//! Stateless HS256 JWTs: the token carries the user's identity and role, so
//! request handling never needs a session store. Expiry is validated on every
//! decode and surfaces as a reason-specific 401.

use crate::error::ApiError;
use crate::types::role::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issue a signed access token for an authenticated user.
pub fn issue_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id,
        email: email.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| ApiError::internal(format!("Failed to sign token: {err}")))
}

/// Decode and validate an access token, distinguishing expiry from any other
/// defect so the caller gets an accurate 401 message.
pub fn decode_token(token: &str, secret: &str) -> Result<TokenClaims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ApiError::authentication("Token expired")
        }
        _ => ApiError::authentication("Invalid token"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn issued_tokens_decode_back() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "doc@medicore.dev", Role::Doctor, SECRET, 24).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "doc@medicore.dev");
        assert_eq!(claims.role, Role::Doctor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_tokens_report_expiry() {
        let token = issue_token(Uuid::new_v4(), "a@b.c", Role::Admin, SECRET, -1).unwrap();
        let err = decode_token(&token, SECRET).unwrap_err();
        assert_eq!(err.to_string(), "Token expired");
    }

    #[test]
    fn garbage_tokens_are_invalid() {
        let err = decode_token("not-a-jwt", SECRET).unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issue_token(Uuid::new_v4(), "a@b.c", Role::Lab, SECRET, 24).unwrap();
        let err = decode_token(&token, "other-secret").unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");
    }
}
