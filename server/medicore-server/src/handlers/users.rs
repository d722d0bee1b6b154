//! User administration (admin only).

use crate::auth::password::hash_password;
use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::{AppJson, AuthContext};
use crate::server::MediCoreServer;
use crate::types::pagination::PaginationParams;
use crate::types::role::Role;
use crate::utils::query_builder::ListQuery;
use crate::validation::RequestValidation;
use crate::{validate_email, validate_field, validate_length, validate_required};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// A user account; the password hash never leaves the database layer.
#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub(crate) const USER_COLUMNS: &str =
    "id, email, first_name, last_name, role, phone, is_active, created_at, updated_at";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
}

impl RequestValidation for CreateUserRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.email, "All required fields must be provided");
        validate_required!(self.password, "All required fields must be provided");
        validate_required!(self.first_name, "All required fields must be provided");
        validate_required!(self.last_name, "All required fields must be provided");
        validate_email!(self.email, "Invalid email format");
        validate_length!(self.password, 8, 128, "Password must be between 8 and 128 characters");
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl RequestValidation for UpdateUserRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(ref email) = self.email {
            validate_email!(email, "Invalid email format");
        }
        if let Some(ref first_name) = self.first_name {
            validate_required!(first_name, "First name cannot be blank");
        }
        if let Some(ref last_name) = self.last_name {
            validate_required!(last_name, "Last name cannot be blank");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersParams {
    pub search: Option<String>,
    pub role: Option<Role>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// List users (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    params(ListUsersParams),
    responses(
        (status = 200, description = "Users retrieved successfully", body = Vec<UserRow>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<ApiResponse<Vec<UserRow>>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let base = format!("SELECT {USER_COLUMNS} FROM users");
    let mut query = ListQuery::new(base);
    query
        .search(
            &["first_name", "last_name", "email", "phone"],
            params.search.as_deref(),
        )
        .filter_eq("role", params.role)
        .order_by("created_at", "DESC")
        .paginate(params.pagination.page(), params.pagination.page_size());
    let users: Vec<UserRow> = query.build_query_as().fetch_all(&server.db_pool).await?;

    let mut count = ListQuery::new("SELECT COUNT(*) FROM users");
    count
        .search(
            &["first_name", "last_name", "email", "phone"],
            params.search.as_deref(),
        )
        .filter_eq("role", params.role);
    let total: i64 = count.build_query_scalar().fetch_one(&server.db_pool).await?;

    Ok(Json(crate::error::api_success_with_meta(
        users,
        params.pagination.to_metadata(total),
    )))
}

/// Get a single user (admin only)
#[utoipa::path(
    get,
    path = "/api/users/:id",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved successfully", body = UserRow),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserRow>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let user = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(api_success(user)))
}

/// Create a user (admin only)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserRow),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already in use")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserRow>>), ApiError> {
    auth.require_role(&[Role::Admin])?;
    req.validate()?;

    let user = insert_user(&server, &req).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "user created");
    Ok((StatusCode::CREATED, Json(api_success(user))))
}

/// Shared by admin creation and self-service registration.
pub(crate) async fn insert_user(
    server: &MediCoreServer,
    req: &CreateUserRequest,
) -> Result<UserRow, ApiError> {
    let existing = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&req.email)
        .fetch_one(&server.db_pool)
        .await?;
    if existing {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let password_hash = hash_password(&req.password)?;
    let user = sqlx::query_as::<_, UserRow>(&format!(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(req.role)
    .bind(&req.phone)
    .fetch_one(&server.db_pool)
    .await?;
    Ok(user)
}

/// Update a user (admin only)
#[utoipa::path(
    put,
    path = "/api/users/:id",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = UserRow),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserRow>>, ApiError> {
    auth.require_role(&[Role::Admin])?;
    req.validate()?;

    if let Some(ref email) = req.email {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id != $2)",
        )
        .bind(email)
        .bind(id)
        .fetch_one(&server.db_pool)
        .await?;
        if taken {
            return Err(ApiError::conflict("User with this email already exists"));
        }
    }

    let user = sqlx::query_as::<_, UserRow>(&format!(
        r#"
        UPDATE users
        SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            role = COALESCE($5, role),
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $7
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(req.role)
    .bind(req.is_active)
    .bind(id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(api_success(user)))
}

/// Reset a user's password (admin only)
#[utoipa::path(
    put,
    path = "/api/users/:id/password",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserPasswordRequest,
    responses(
        (status = 200, description = "Password updated successfully"),
        (status = 400, description = "Password is required"),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn update_user_password(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateUserPasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;
    validate_required!(req.password, "Password is required");
    validate_length!(req.password, 8, 128, "Password must be between 8 and 128 characters");

    let password_hash = hash_password(&req.password)?;
    let updated = sqlx::query(
        "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(&password_hash)
    .bind(id)
    .execute(&server.db_pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("User"));
    }
    Ok(Json(api_success(serde_json::json!({
        "message": "User password updated successfully"
    }))))
}

/// Flip a user's active flag (admin only)
#[utoipa::path(
    put,
    path = "/api/users/:id/toggle-status",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Status toggled"),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn toggle_user_status(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let is_active = sqlx::query_scalar::<_, bool>(
        "UPDATE users SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING is_active",
    )
    .bind(id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("User"))?;

    let verb = if is_active { "activated" } else { "deactivated" };
    Ok(Json(api_success(serde_json::json!({
        "message": format!("User {verb} successfully"),
        "isActive": is_active
    }))))
}

/// Delete a user (admin only); an admin cannot delete their own account.
#[utoipa::path(
    delete,
    path = "/api/users/:id",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    if id == auth.user_id {
        return Err(ApiError::validation("Cannot delete your own account"));
    }

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&server.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(user_id = %id, "user deleted");
    Ok(Json(api_success(serde_json::json!({
        "message": "User deleted successfully"
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateUserRequest {
        CreateUserRequest {
            email: "nurse@medicore.dev".to_string(),
            password: "S3cure-pass!".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Okafor".to_string(),
            role: Role::Reception,
            phone: None,
        }
    }

    #[test]
    fn create_request_accepts_valid_payload() {
        assert!(create_request().validate().is_ok());
    }

    #[test]
    fn create_request_requires_email() {
        let mut req = create_request();
        req.email = " ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_request_rejects_short_password() {
        let mut req = create_request();
        req.password = "short".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_rejects_bad_email() {
        let req = UpdateUserRequest {
            first_name: None,
            last_name: None,
            email: Some("nope".to_string()),
            phone: None,
            role: None,
            is_active: None,
        };
        assert!(req.validate().is_err());
    }
}
