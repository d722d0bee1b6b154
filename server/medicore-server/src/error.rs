//! API error taxonomy and the standard response envelope.
//!
//! Every failure a handler can produce maps onto exactly one HTTP status:
//! validation 400, authentication 401, authorization 403, missing entity 404,
//! conflicting state 409, anything unexpected 500. Failure bodies always carry
//! a `message` field; the 403 body additionally reports the required and
//! current roles.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billing_ledger::BillingError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::role::Role;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("Insufficient permissions")]
    Authorization { required: Vec<Role>, current: Role },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn authorization(required: &[Role], current: Role) -> Self {
        Self::Authorization {
            required: required.to_vec(),
            current,
        }
    }

    /// Plain 403 without the role bookkeeping (ownership checks).
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// `entity` is the display name of the missing record ("Bill", "Patient").
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Record".to_string()),
            other => ApiError::Database(other),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Validation(message) | BillingError::InvalidPayment(message) => {
                ApiError::Validation(message)
            }
        }
    }
}

/// Wire form of a failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Role>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Authorization { required, current } => ErrorBody {
                message: "Insufficient permissions".to_string(),
                required: Some(required.clone()),
                current: Some(*current),
            },
            ApiError::Database(err) => {
                tracing::error!(error = %err, "database error");
                ErrorBody {
                    message: internal_message(&format!("{err}")),
                    required: None,
                    current: None,
                }
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                ErrorBody {
                    message: internal_message(detail),
                    required: None,
                    current: None,
                }
            }
            other => ErrorBody {
                message: other.to_string(),
                required: None,
                current: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

// Detail is only echoed back in development mode; production gets the
// generic message and the detail stays in the logs.
fn internal_message(detail: &str) -> String {
    if std::env::var("APP_ENV").map(|env| env == "development").unwrap_or(true) {
        detail.to_string()
    } else {
        "Internal Server Error".to_string()
    }
}

/// Standard success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Metadata attached to list responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationInfo {
    pub page: i32,
    pub page_size: i32,
    pub total_pages: i32,
    pub has_next: bool,
    pub has_previous: bool,
}

pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

pub fn api_success_with_meta<T>(data: T, metadata: ResponseMetadata) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: Some(metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::authentication("no token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::authorization(&[Role::Admin], Role::Lab).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::not_found("Bill").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::conflict("duplicate").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn billing_errors_map_to_validation() {
        let err: ApiError = BillingError::invalid_payment("too much").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "too much");
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(ApiError::not_found("Bill").to_string(), "Bill not found");
    }
}
