//! Authentication context extraction.
//!
//! [`AuthContext`] is an axum extractor: adding it to a handler's signature
//! makes the route require a valid `Authorization: Bearer <token>` header.
//! The token is decoded against the server's configured secret and the
//! caller's identity and role become available to the handler.

use crate::auth::tokens::decode_token;
use crate::error::ApiError;
use crate::server::MediCoreServer;
use crate::types::role::Role;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use uuid::Uuid;

/// The authenticated caller, decoded from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    /// Construct directly (tests).
    pub fn new(user_id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    /// Reject callers whose role is not in `allowed` with a 403 that names
    /// the required and current roles.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::authorization(allowed, self.role))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn extract_token(parts: &Parts) -> Result<String, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Access token required"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::to_owned)
        .ok_or_else(|| {
            ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>")
        })
}

#[async_trait]
impl FromRequestParts<MediCoreServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &MediCoreServer,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let claims = decode_token(&token, &server.config.jwt_secret)?;
        Ok(AuthContext {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/patients");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn missing_header_requires_token() {
        let err = extract_token(&parts_with_auth(None)).unwrap_err();
        assert_eq!(err.to_string(), "Access token required");
    }

    #[test]
    fn non_bearer_header_is_rejected() {
        let err = extract_token(&parts_with_auth(Some("Basic dXNlcjpwYXNz"))).unwrap_err();
        assert!(err.to_string().contains("Bearer"));
    }

    #[test]
    fn bearer_token_is_stripped() {
        let token = extract_token(&parts_with_auth(Some("Bearer abc.def.ghi"))).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn role_gate_names_required_and_current() {
        let ctx = AuthContext::new(Uuid::new_v4(), "lab@medicore.dev", Role::Lab);
        assert!(ctx.require_role(&[Role::Admin, Role::Lab]).is_ok());

        let err = ctx.require_role(&[Role::Admin, Role::Reception]).unwrap_err();
        match err {
            ApiError::Authorization { required, current } => {
                assert_eq!(required, vec![Role::Admin, Role::Reception]);
                assert_eq!(current, Role::Lab);
            }
            other => panic!("expected authorization error, got {other:?}"),
        }
    }
}
