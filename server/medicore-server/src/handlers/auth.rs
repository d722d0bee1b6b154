//! Registration, login, and self-service account management.

use crate::auth::password::{hash_password, verify_password};
use crate::auth::tokens::issue_token;
use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::users::{insert_user, CreateUserRequest, UserRow, USER_COLUMNS};
use crate::middleware::{AppJson, AuthContext};
use crate::server::MediCoreServer;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_required};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl RequestValidation for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.email, "Email and password are required");
        validate_required!(self.password, "Email and password are required");
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    pub user: UserRow,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl RequestValidation for ChangePasswordRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.current_password, "Current and new passwords are required");
        validate_required!(self.new_password, "Current and new passwords are required");
        validate_field!(
            self.new_password,
            self.new_password.len() >= 8,
            "New password must be at least 8 characters"
        );
        Ok(())
    }
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserRow),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already in use")
    ),
    tag = "auth"
)]
pub async fn register(
    State(server): State<MediCoreServer>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserRow>>), ApiError> {
    req.validate()?;
    let user = insert_user(&server, &req).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(api_success(user))))
}

/// Log in and receive a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authentication successful", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials or inactive account")
    ),
    tag = "auth"
)]
pub async fn login(
    State(server): State<MediCoreServer>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    req.validate()?;

    #[derive(sqlx::FromRow)]
    struct CredentialRow {
        password_hash: String,
        #[sqlx(flatten)]
        user: UserRow,
    }

    let row = sqlx::query_as::<_, CredentialRow>(&format!(
        "SELECT password_hash, {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(&req.email)
    .fetch_optional(&server.db_pool)
    .await?;

    let Some(CredentialRow {
        password_hash,
        user,
    }) = row
    else {
        return Err(ApiError::authentication("Invalid email or password"));
    };
    if !verify_password(&req.password, &password_hash)? {
        return Err(ApiError::authentication("Invalid email or password"));
    }
    if !user.is_active {
        return Err(ApiError::authentication("Invalid or inactive user"));
    }

    let token = issue_token(
        user.id,
        &user.email,
        user.role,
        &server.config.jwt_secret,
        server.config.jwt_ttl_hours,
    )?;

    tracing::info!(user_id = %user.id, "login succeeded");
    Ok(Json(api_success(LoginResponse { token, user })))
}

/// Fetch the caller's own profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Caller profile", body = UserRow),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<UserRow>>, ApiError> {
    let user = fetch_user(&server, auth.user_id).await?;
    Ok(Json(api_success(user)))
}

/// Update the caller's own profile
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserRow),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserRow>>, ApiError> {
    let user = sqlx::query_as::<_, UserRow>(&format!(
        r#"
        UPDATE users
        SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            phone = COALESCE($3, phone),
            updated_at = NOW()
        WHERE id = $4
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.phone)
    .bind(auth.user_id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(api_success(user)))
}

/// Change the caller's own password
#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password incorrect or payload invalid"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    req.validate()?;

    let stored_hash =
        sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(auth.user_id)
            .fetch_optional(&server.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;

    if !verify_password(&req.current_password, &stored_hash)? {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let new_hash = hash_password(&req.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&new_hash)
        .bind(auth.user_id)
        .execute(&server.db_pool)
        .await?;

    tracing::info!(user_id = %auth.user_id, "password changed");
    Ok(Json(api_success(serde_json::json!({
        "message": "Password changed successfully"
    }))))
}

/// Log out (stateless tokens: acknowledgement only)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logout acknowledged")),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(auth: AuthContext) -> Json<ApiResponse<serde_json::Value>> {
    tracing::debug!(user_id = %auth.user_id, "logout");
    Json(api_success(serde_json::json!({
        "message": "Logout successful"
    })))
}

async fn fetch_user(server: &MediCoreServer, id: Uuid) -> Result<UserRow, ApiError> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(&server.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_both_fields() {
        let req = LoginRequest {
            email: "a@b.c".to_string(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn change_password_requires_current() {
        let req = ChangePasswordRequest {
            current_password: String::new(),
            new_password: "longer-than-8".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn change_password_rejects_short_replacement() {
        let req = ChangePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "tiny".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
