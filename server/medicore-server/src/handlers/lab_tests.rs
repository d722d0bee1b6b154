//! Lab test orders and results.

use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse};
use crate::handlers::{ensure_doctor_exists, ensure_patient_exists};
use crate::middleware::{AppJson, AuthContext};
use crate::server::MediCoreServer;
use crate::types::pagination::PaginationParams;
use crate::types::role::Role;
use crate::utils::query_builder::ListQuery;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_required};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Lab test lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum LabTestStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl LabTestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LabTestStatus::Pending => "pending",
            LabTestStatus::Processing => "processing",
            LabTestStatus::Completed => "completed",
            LabTestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(LabTestStatus::Pending),
            "processing" => Some(LabTestStatus::Processing),
            "completed" => Some(LabTestStatus::Completed),
            "cancelled" => Some(LabTestStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for LabTestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow, Clone)]
pub struct LabTestRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub test_name: String,
    pub test_type: String,
    pub status: LabTestStatus,
    pub results: Option<String>,
    pub result_file: Option<String>,
    pub normal_ranges: Option<String>,
    pub technician: Option<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
}

const LAB_TEST_SELECT: &str = r#"
SELECT lt.id, lt.patient_id, lt.doctor_id, lt.test_name, lt.test_type, lt.status,
       lt.results, lt.result_file, lt.normal_ranges, lt.technician, lt.completed_at,
       lt.created_at, lt.updated_at,
       p.first_name AS patient_first_name, p.last_name AS patient_last_name,
       u.first_name AS doctor_first_name, u.last_name AS doctor_last_name
FROM lab_tests lt
JOIN patients p ON lt.patient_id = p.id
JOIN doctors d ON lt.doctor_id = d.id
JOIN users u ON d.user_id = u.id
"#;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabTestRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub test_name: String,
    pub test_type: String,
    pub normal_ranges: Option<String>,
    pub technician: Option<String>,
}

impl RequestValidation for CreateLabTestRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.test_name, "Test name and test type are required");
        validate_required!(self.test_type, "Test name and test type are required");
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLabTestRequest {
    pub test_name: Option<String>,
    pub test_type: Option<String>,
    pub status: Option<String>,
    pub results: Option<String>,
    pub result_file: Option<String>,
    pub normal_ranges: Option<String>,
    pub technician: Option<String>,
}

impl RequestValidation for UpdateLabTestRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(ref status) = self.status {
            validate_field!(
                status,
                LabTestStatus::parse(status).is_some(),
                "Status must be one of pending, processing, completed, cancelled"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListLabTestsParams {
    pub search: Option<String>,
    pub status: Option<LabTestStatus>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// List lab tests
#[utoipa::path(
    get,
    path = "/api/lab-tests",
    params(ListLabTestsParams),
    responses(
        (status = 200, description = "Lab tests retrieved successfully", body = Vec<LabTestRow>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "lab-tests",
    security(("bearer_auth" = []))
)]
pub async fn list_lab_tests(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Query(params): Query<ListLabTestsParams>,
) -> Result<Json<ApiResponse<Vec<LabTestRow>>>, ApiError> {
    let mut query = ListQuery::new(LAB_TEST_SELECT);
    query
        .search(&["lt.test_name", "lt.test_type"], params.search.as_deref())
        .filter_eq("lt.status", params.status)
        .filter_eq("lt.doctor_id", params.doctor_id)
        .filter_eq("lt.patient_id", params.patient_id)
        .order_by("lt.created_at", "DESC")
        .paginate(params.pagination.page(), params.pagination.page_size());
    let lab_tests: Vec<LabTestRow> = query.build_query_as().fetch_all(&server.db_pool).await?;

    let mut count = ListQuery::new("SELECT COUNT(*) FROM lab_tests lt");
    count
        .search(&["lt.test_name", "lt.test_type"], params.search.as_deref())
        .filter_eq("lt.status", params.status)
        .filter_eq("lt.doctor_id", params.doctor_id)
        .filter_eq("lt.patient_id", params.patient_id);
    let total: i64 = count.build_query_scalar().fetch_one(&server.db_pool).await?;

    Ok(Json(api_success_with_meta(
        lab_tests,
        params.pagination.to_metadata(total),
    )))
}

/// Get a single lab test
#[utoipa::path(
    get,
    path = "/api/lab-tests/:id",
    params(("id" = Uuid, Path, description = "Lab test ID")),
    responses(
        (status = 200, description = "Lab test retrieved successfully", body = LabTestRow),
        (status = 404, description = "Lab test not found")
    ),
    tag = "lab-tests",
    security(("bearer_auth" = []))
)]
pub async fn get_lab_test(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LabTestRow>>, ApiError> {
    let lab_test = fetch_lab_test(&server.db_pool, id).await?;
    Ok(Json(api_success(lab_test)))
}

/// Order a lab test (admin/lab)
#[utoipa::path(
    post,
    path = "/api/lab-tests",
    request_body = CreateLabTestRequest,
    responses(
        (status = 201, description = "Lab test created successfully", body = LabTestRow),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Patient or doctor not found")
    ),
    tag = "lab-tests",
    security(("bearer_auth" = []))
)]
pub async fn create_lab_test(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<CreateLabTestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LabTestRow>>), ApiError> {
    auth.require_role(&[Role::Admin, Role::Lab])?;
    req.validate()?;

    ensure_patient_exists(&server.db_pool, req.patient_id).await?;
    ensure_doctor_exists(&server.db_pool, req.doctor_id).await?;

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO lab_tests (id, patient_id, doctor_id, test_name, test_type, status, normal_ranges, technician)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
        "#,
    )
    .bind(id)
    .bind(req.patient_id)
    .bind(req.doctor_id)
    .bind(&req.test_name)
    .bind(&req.test_type)
    .bind(&req.normal_ranges)
    .bind(&req.technician)
    .execute(&server.db_pool)
    .await?;

    let lab_test = fetch_lab_test(&server.db_pool, id).await?;
    tracing::info!(lab_test_id = %id, "lab test ordered");
    Ok((StatusCode::CREATED, Json(api_success(lab_test))))
}

/// Update a lab test (admin/lab); completion stamps `completed_at` once.
#[utoipa::path(
    put,
    path = "/api/lab-tests/:id",
    params(("id" = Uuid, Path, description = "Lab test ID")),
    request_body = UpdateLabTestRequest,
    responses(
        (status = 200, description = "Lab test updated successfully", body = LabTestRow),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Lab test not found")
    ),
    tag = "lab-tests",
    security(("bearer_auth" = []))
)]
pub async fn update_lab_test(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateLabTestRequest>,
) -> Result<Json<ApiResponse<LabTestRow>>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Lab])?;
    req.validate()?;
    let status = req.status.as_deref().and_then(LabTestStatus::parse);

    let updated = sqlx::query(
        r#"
        UPDATE lab_tests
        SET
            test_name = COALESCE($1, test_name),
            test_type = COALESCE($2, test_type),
            status = COALESCE($3, status),
            results = COALESCE($4, results),
            result_file = COALESCE($5, result_file),
            normal_ranges = COALESCE($6, normal_ranges),
            technician = COALESCE($7, technician),
            completed_at = CASE
                WHEN COALESCE($3, status) = 'completed' THEN COALESCE(completed_at, NOW())
                ELSE completed_at
            END,
            updated_at = NOW()
        WHERE id = $8
        "#,
    )
    .bind(&req.test_name)
    .bind(&req.test_type)
    .bind(status)
    .bind(&req.results)
    .bind(&req.result_file)
    .bind(&req.normal_ranges)
    .bind(&req.technician)
    .bind(id)
    .execute(&server.db_pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Lab test"));
    }

    let lab_test = fetch_lab_test(&server.db_pool, id).await?;
    Ok(Json(api_success(lab_test)))
}

/// Delete a lab test (admin only)
#[utoipa::path(
    delete,
    path = "/api/lab-tests/:id",
    params(("id" = Uuid, Path, description = "Lab test ID")),
    responses(
        (status = 200, description = "Lab test deleted"),
        (status = 404, description = "Lab test not found")
    ),
    tag = "lab-tests",
    security(("bearer_auth" = []))
)]
pub async fn delete_lab_test(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let deleted = sqlx::query("DELETE FROM lab_tests WHERE id = $1")
        .bind(id)
        .execute(&server.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Lab test"));
    }

    Ok(Json(api_success(serde_json::json!({
        "message": "Lab test deleted successfully"
    }))))
}

async fn fetch_lab_test(pool: &PgPool, id: Uuid) -> Result<LabTestRow, ApiError> {
    sqlx::query_as::<_, LabTestRow>(&format!("{LAB_TEST_SELECT} WHERE lt.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Lab test"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_name_and_type() {
        let req = CreateLabTestRequest {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            test_name: "CBC".to_string(),
            test_type: " ".to_string(),
            normal_ranges: None,
            technician: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_rejects_unknown_status() {
        let req = UpdateLabTestRequest {
            test_name: None,
            test_type: None,
            status: Some("misplaced".to_string()),
            results: None,
            result_file: None,
            normal_ranges: None,
            technician: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_accepts_known_status() {
        let req = UpdateLabTestRequest {
            test_name: None,
            test_type: None,
            status: Some("completed".to_string()),
            results: Some("Within normal limits".to_string()),
            result_file: None,
            normal_ranges: None,
            technician: None,
        };
        assert!(req.validate().is_ok());
    }
}
