//! Treatment records: diagnosis, prescription, follow-up.

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
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow, Clone)]
pub struct TreatmentRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub diagnosis: String,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub specialization: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
}

const TREATMENT_SELECT: &str = r#"
SELECT t.id, t.patient_id, t.doctor_id, t.diagnosis, t.prescription, t.notes,
       t.follow_up_date, t.created_at, t.updated_at,
       p.first_name AS patient_first_name, p.last_name AS patient_last_name,
       d.specialization,
       u.first_name AS doctor_first_name, u.last_name AS doctor_last_name
FROM treatments t
JOIN patients p ON t.patient_id = p.id
JOIN doctors d ON t.doctor_id = d.id
JOIN users u ON d.user_id = u.id
"#;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTreatmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub diagnosis: String,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl RequestValidation for CreateTreatmentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.diagnosis, "Diagnosis is required");
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTreatmentRequest {
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl RequestValidation for UpdateTreatmentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(ref diagnosis) = self.diagnosis {
            validate_field!(
                diagnosis,
                !diagnosis.trim().is_empty(),
                "Diagnosis cannot be blank"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListTreatmentsParams {
    pub search: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// List treatments
#[utoipa::path(
    get,
    path = "/api/treatments",
    params(ListTreatmentsParams),
    responses(
        (status = 200, description = "Treatments retrieved successfully", body = Vec<TreatmentRow>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "treatments",
    security(("bearer_auth" = []))
)]
pub async fn list_treatments(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Query(params): Query<ListTreatmentsParams>,
) -> Result<Json<ApiResponse<Vec<TreatmentRow>>>, ApiError> {
    let mut query = ListQuery::new(TREATMENT_SELECT);
    query
        .search(&["t.diagnosis", "t.prescription"], params.search.as_deref())
        .filter_eq("t.doctor_id", params.doctor_id)
        .filter_eq("t.patient_id", params.patient_id)
        .order_by("t.created_at", "DESC")
        .paginate(params.pagination.page(), params.pagination.page_size());
    let treatments: Vec<TreatmentRow> = query.build_query_as().fetch_all(&server.db_pool).await?;

    let mut count = ListQuery::new("SELECT COUNT(*) FROM treatments t");
    count
        .search(&["t.diagnosis", "t.prescription"], params.search.as_deref())
        .filter_eq("t.doctor_id", params.doctor_id)
        .filter_eq("t.patient_id", params.patient_id);
    let total: i64 = count.build_query_scalar().fetch_one(&server.db_pool).await?;

    Ok(Json(api_success_with_meta(
        treatments,
        params.pagination.to_metadata(total),
    )))
}

/// Get a single treatment
#[utoipa::path(
    get,
    path = "/api/treatments/:id",
    params(("id" = Uuid, Path, description = "Treatment ID")),
    responses(
        (status = 200, description = "Treatment retrieved successfully", body = TreatmentRow),
        (status = 404, description = "Treatment not found")
    ),
    tag = "treatments",
    security(("bearer_auth" = []))
)]
pub async fn get_treatment(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TreatmentRow>>, ApiError> {
    let treatment = fetch_treatment(&server.db_pool, id).await?;
    Ok(Json(api_success(treatment)))
}

/// Record a treatment (admin/doctor)
#[utoipa::path(
    post,
    path = "/api/treatments",
    request_body = CreateTreatmentRequest,
    responses(
        (status = 201, description = "Treatment created successfully", body = TreatmentRow),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Patient or doctor not found")
    ),
    tag = "treatments",
    security(("bearer_auth" = []))
)]
pub async fn create_treatment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<CreateTreatmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TreatmentRow>>), ApiError> {
    auth.require_role(&[Role::Admin, Role::Doctor])?;
    req.validate()?;

    ensure_patient_exists(&server.db_pool, req.patient_id).await?;
    ensure_doctor_exists(&server.db_pool, req.doctor_id).await?;

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO treatments (id, patient_id, doctor_id, diagnosis, prescription, notes, follow_up_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(req.patient_id)
    .bind(req.doctor_id)
    .bind(&req.diagnosis)
    .bind(&req.prescription)
    .bind(&req.notes)
    .bind(req.follow_up_date)
    .execute(&server.db_pool)
    .await?;

    let treatment = fetch_treatment(&server.db_pool, id).await?;
    tracing::info!(treatment_id = %id, "treatment recorded");
    Ok((StatusCode::CREATED, Json(api_success(treatment))))
}

/// Update a treatment (admin/doctor)
#[utoipa::path(
    put,
    path = "/api/treatments/:id",
    params(("id" = Uuid, Path, description = "Treatment ID")),
    request_body = UpdateTreatmentRequest,
    responses(
        (status = 200, description = "Treatment updated successfully", body = TreatmentRow),
        (status = 404, description = "Treatment not found")
    ),
    tag = "treatments",
    security(("bearer_auth" = []))
)]
pub async fn update_treatment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateTreatmentRequest>,
) -> Result<Json<ApiResponse<TreatmentRow>>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Doctor])?;
    req.validate()?;

    let updated = sqlx::query(
        r#"
        UPDATE treatments
        SET
            diagnosis = COALESCE($1, diagnosis),
            prescription = COALESCE($2, prescription),
            notes = COALESCE($3, notes),
            follow_up_date = COALESCE($4, follow_up_date),
            updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(&req.diagnosis)
    .bind(&req.prescription)
    .bind(&req.notes)
    .bind(req.follow_up_date)
    .bind(id)
    .execute(&server.db_pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Treatment"));
    }

    let treatment = fetch_treatment(&server.db_pool, id).await?;
    Ok(Json(api_success(treatment)))
}

/// Delete a treatment (admin only)
#[utoipa::path(
    delete,
    path = "/api/treatments/:id",
    params(("id" = Uuid, Path, description = "Treatment ID")),
    responses(
        (status = 200, description = "Treatment deleted"),
        (status = 404, description = "Treatment not found")
    ),
    tag = "treatments",
    security(("bearer_auth" = []))
)]
pub async fn delete_treatment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let deleted = sqlx::query("DELETE FROM treatments WHERE id = $1")
        .bind(id)
        .execute(&server.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Treatment"));
    }

    Ok(Json(api_success(serde_json::json!({
        "message": "Treatment deleted successfully"
    }))))
}

async fn fetch_treatment(pool: &PgPool, id: Uuid) -> Result<TreatmentRow, ApiError> {
    sqlx::query_as::<_, TreatmentRow>(&format!("{TREATMENT_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Treatment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_a_diagnosis() {
        let req = CreateTreatmentRequest {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            diagnosis: String::new(),
            prescription: None,
            notes: None,
            follow_up_date: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_accepts_empty_payload() {
        let req = UpdateTreatmentRequest {
            diagnosis: None,
            prescription: None,
            notes: None,
            follow_up_date: None,
        };
        assert!(req.validate().is_ok());
    }
}
