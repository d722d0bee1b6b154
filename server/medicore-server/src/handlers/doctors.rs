//! Doctor profiles (user accounts with a clinical record attached).

use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse};
use crate::middleware::{AppJson, AuthContext};
use crate::server::MediCoreServer;
use crate::types::pagination::PaginationParams;
use crate::types::role::Role;
use crate::utils::query_builder::ListQuery;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_range, validate_required};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow, Clone)]
pub struct DoctorRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: String,
    pub license_number: String,
    pub experience: i32,
    pub consultation_fee: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

const DOCTOR_SELECT: &str = r#"
SELECT d.id, d.user_id, d.specialization, d.license_number, d.experience,
       d.consultation_fee, d.created_at, d.updated_at,
       u.first_name, u.last_name, u.email, u.phone
FROM doctors d
JOIN users u ON d.user_id = u.id
"#;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    pub user_id: Uuid,
    pub specialization: String,
    pub license_number: String,
    pub experience: i32,
    pub consultation_fee: Decimal,
}

impl RequestValidation for CreateDoctorRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.specialization, "Specialization is required");
        validate_required!(self.license_number, "License number is required");
        validate_range!(self.experience, 0, 80, "Experience must be between 0 and 80 years");
        validate_field!(
            self.consultation_fee,
            self.consultation_fee >= Decimal::ZERO,
            "Consultation fee cannot be negative"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub experience: Option<i32>,
    pub consultation_fee: Option<Decimal>,
}

impl RequestValidation for UpdateDoctorRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(experience) = self.experience {
            validate_range!(experience, 0, 80, "Experience must be between 0 and 80 years");
        }
        if let Some(fee) = self.consultation_fee {
            validate_field!(
                fee,
                fee >= Decimal::ZERO,
                "Consultation fee cannot be negative"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDoctorsParams {
    pub search: Option<String>,
    pub specialization: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// List doctors
#[utoipa::path(
    get,
    path = "/api/doctors",
    params(ListDoctorsParams),
    responses(
        (status = 200, description = "Doctors retrieved successfully", body = Vec<DoctorRow>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn list_doctors(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Query(params): Query<ListDoctorsParams>,
) -> Result<Json<ApiResponse<Vec<DoctorRow>>>, ApiError> {
    let mut query = ListQuery::new(DOCTOR_SELECT);
    query
        .search(
            &["u.first_name", "u.last_name", "d.specialization"],
            params.search.as_deref(),
        )
        .filter_eq("d.specialization", params.specialization.clone())
        .order_by("u.first_name", "ASC")
        .paginate(params.pagination.page(), params.pagination.page_size());
    let doctors: Vec<DoctorRow> = query.build_query_as().fetch_all(&server.db_pool).await?;

    let mut count = ListQuery::new(
        "SELECT COUNT(*) FROM doctors d JOIN users u ON d.user_id = u.id",
    );
    count
        .search(
            &["u.first_name", "u.last_name", "d.specialization"],
            params.search.as_deref(),
        )
        .filter_eq("d.specialization", params.specialization.clone());
    let total: i64 = count.build_query_scalar().fetch_one(&server.db_pool).await?;

    Ok(Json(api_success_with_meta(
        doctors,
        params.pagination.to_metadata(total),
    )))
}

/// Get a single doctor
#[utoipa::path(
    get,
    path = "/api/doctors/:id",
    params(("id" = Uuid, Path, description = "Doctor ID")),
    responses(
        (status = 200, description = "Doctor retrieved successfully", body = DoctorRow),
        (status = 404, description = "Doctor not found")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn get_doctor(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DoctorRow>>, ApiError> {
    let doctor =
        sqlx::query_as::<_, DoctorRow>(&format!("{DOCTOR_SELECT} WHERE d.id = $1"))
            .bind(id)
            .fetch_optional(&server.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Doctor"))?;
    Ok(Json(api_success(doctor)))
}

/// Create a doctor profile for an existing user (admin only)
#[utoipa::path(
    post,
    path = "/api/doctors",
    request_body = CreateDoctorRequest,
    responses(
        (status = 201, description = "Doctor created successfully", body = DoctorRow),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User already has a doctor profile")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn create_doctor(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DoctorRow>>), ApiError> {
    auth.require_role(&[Role::Admin])?;
    req.validate()?;

    let user_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(req.user_id)
            .fetch_one(&server.db_pool)
            .await?;
    if !user_exists {
        return Err(ApiError::not_found("User"));
    }

    let already_doctor =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM doctors WHERE user_id = $1)")
            .bind(req.user_id)
            .fetch_one(&server.db_pool)
            .await?;
    if already_doctor {
        return Err(ApiError::conflict("User already has a doctor profile"));
    }

    let doctor_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO doctors (id, user_id, specialization, license_number, experience, consultation_fee)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.user_id)
    .bind(&req.specialization)
    .bind(&req.license_number)
    .bind(req.experience)
    .bind(req.consultation_fee)
    .fetch_one(&server.db_pool)
    .await?;

    let doctor =
        sqlx::query_as::<_, DoctorRow>(&format!("{DOCTOR_SELECT} WHERE d.id = $1"))
            .bind(doctor_id)
            .fetch_one(&server.db_pool)
            .await?;

    tracing::info!(doctor_id = %doctor.id, user_id = %doctor.user_id, "doctor profile created");
    Ok((StatusCode::CREATED, Json(api_success(doctor))))
}

/// Update a doctor profile (admin only)
#[utoipa::path(
    put,
    path = "/api/doctors/:id",
    params(("id" = Uuid, Path, description = "Doctor ID")),
    request_body = UpdateDoctorRequest,
    responses(
        (status = 200, description = "Doctor updated successfully", body = DoctorRow),
        (status = 404, description = "Doctor not found")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn update_doctor(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateDoctorRequest>,
) -> Result<Json<ApiResponse<DoctorRow>>, ApiError> {
    auth.require_role(&[Role::Admin])?;
    req.validate()?;

    let updated = sqlx::query(
        r#"
        UPDATE doctors
        SET
            specialization = COALESCE($1, specialization),
            license_number = COALESCE($2, license_number),
            experience = COALESCE($3, experience),
            consultation_fee = COALESCE($4, consultation_fee),
            updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(&req.specialization)
    .bind(&req.license_number)
    .bind(req.experience)
    .bind(req.consultation_fee)
    .bind(id)
    .execute(&server.db_pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Doctor"));
    }

    let doctor =
        sqlx::query_as::<_, DoctorRow>(&format!("{DOCTOR_SELECT} WHERE d.id = $1"))
            .bind(id)
            .fetch_one(&server.db_pool)
            .await?;
    Ok(Json(api_success(doctor)))
}

/// Delete a doctor profile (admin only)
#[utoipa::path(
    delete,
    path = "/api/doctors/:id",
    params(("id" = Uuid, Path, description = "Doctor ID")),
    responses(
        (status = 200, description = "Doctor deleted"),
        (status = 404, description = "Doctor not found")
    ),
    tag = "doctors",
    security(("bearer_auth" = []))
)]
pub async fn delete_doctor(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let deleted = sqlx::query("DELETE FROM doctors WHERE id = $1")
        .bind(id)
        .execute(&server.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Doctor"));
    }

    Ok(Json(api_success(serde_json::json!({
        "message": "Doctor deleted successfully"
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn create_request() -> CreateDoctorRequest {
        CreateDoctorRequest {
            user_id: Uuid::new_v4(),
            specialization: "Cardiology".to_string(),
            license_number: "LIC-2210".to_string(),
            experience: 9,
            consultation_fee: dec!(150),
        }
    }

    #[test]
    fn accepts_valid_doctor() {
        assert!(create_request().validate().is_ok());
    }

    #[test]
    fn rejects_blank_specialization() {
        let mut req = create_request();
        req.specialization = "  ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_negative_fee() {
        let mut req = create_request();
        req.consultation_fee = dec!(-1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_implausible_experience() {
        let mut req = create_request();
        req.experience = 120;
        assert!(req.validate().is_err());
    }
}
