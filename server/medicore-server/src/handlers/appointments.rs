//! Appointment scheduling with doctor slot-conflict checks.

use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse};
use crate::handlers::{doctor_id_for_user, ensure_doctor_exists, ensure_patient_exists};
use crate::middleware::{AppJson, AuthContext};
use crate::server::MediCoreServer;
use crate::types::pagination::PaginationParams;
use crate::types::role::Role;
use crate::utils::query_builder::ListQuery;
use crate::utils::time::{date_bounds, today_bounds};
use crate::validation::RequestValidation;
use crate::{validate_field, validate_required};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Appointment lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow, Clone)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub specialization: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
}

const APPOINTMENT_SELECT: &str = r#"
SELECT a.id, a.patient_id, a.doctor_id, a.date_time, a.status, a.reason, a.notes,
       a.created_at, a.updated_at,
       p.first_name AS patient_first_name, p.last_name AS patient_last_name,
       p.email AS patient_email, p.phone AS patient_phone,
       d.specialization,
       u.first_name AS doctor_first_name, u.last_name AS doctor_last_name
FROM appointments a
JOIN patients p ON a.patient_id = p.id
JOIN doctors d ON a.doctor_id = d.id
JOIN users u ON d.user_id = u.id
"#;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub reason: String,
    pub notes: Option<String>,
}

impl RequestValidation for CreateAppointmentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(
            self.reason,
            "Patient ID, doctor ID, date/time, and reason are required"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub date_time: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListAppointmentsParams {
    pub search: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub doctor_id: Option<Uuid>,
    /// Restrict to one local calendar day (YYYY-MM-DD)
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Another live appointment for the same doctor at the same instant?
/// Cancelled appointments release their slot; completed ones do not.
async fn has_conflict(
    pool: &PgPool,
    doctor_id: Uuid,
    date_time: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Result<bool, ApiError> {
    let exists = match exclude {
        Some(exclude_id) => {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM appointments \
                 WHERE doctor_id = $1 AND date_time = $2 AND id != $3 AND status != 'cancelled')",
            )
            .bind(doctor_id)
            .bind(date_time)
            .bind(exclude_id)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM appointments \
                 WHERE doctor_id = $1 AND date_time = $2 AND status != 'cancelled')",
            )
            .bind(doctor_id)
            .bind(date_time)
            .fetch_one(pool)
            .await?
        }
    };
    Ok(exists)
}

/// List appointments; doctors only see their own schedule.
#[utoipa::path(
    get,
    path = "/api/appointments",
    params(ListAppointmentsParams),
    responses(
        (status = 200, description = "Appointments retrieved successfully", body = Vec<AppointmentRow>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn list_appointments(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Query(params): Query<ListAppointmentsParams>,
) -> Result<Json<ApiResponse<Vec<AppointmentRow>>>, ApiError> {
    let own_doctor_id = if auth.role == Role::Doctor {
        doctor_id_for_user(&server.db_pool, auth.user_id).await?
    } else {
        None
    };
    let window = params.date.map(date_bounds);

    let mut query = ListQuery::new(APPOINTMENT_SELECT);
    query
        .search(&["a.reason", "a.notes"], params.search.as_deref())
        .filter_eq("a.status", params.status)
        .filter_eq("a.doctor_id", params.doctor_id)
        .filter_eq("a.doctor_id", own_doctor_id)
        .filter_window("a.date_time", window)
        .order_by("a.date_time", "DESC")
        .paginate(params.pagination.page(), params.pagination.page_size());
    let appointments: Vec<AppointmentRow> =
        query.build_query_as().fetch_all(&server.db_pool).await?;

    let mut count = ListQuery::new("SELECT COUNT(*) FROM appointments a");
    count
        .search(&["a.reason", "a.notes"], params.search.as_deref())
        .filter_eq("a.status", params.status)
        .filter_eq("a.doctor_id", params.doctor_id)
        .filter_eq("a.doctor_id", own_doctor_id)
        .filter_window("a.date_time", params.date.map(date_bounds));
    let total: i64 = count.build_query_scalar().fetch_one(&server.db_pool).await?;

    Ok(Json(api_success_with_meta(
        appointments,
        params.pagination.to_metadata(total),
    )))
}

/// Get a single appointment
#[utoipa::path(
    get,
    path = "/api/appointments/:id",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment retrieved successfully", body = AppointmentRow),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn get_appointment(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AppointmentRow>>, ApiError> {
    let appointment = fetch_appointment(&server.db_pool, id).await?;
    Ok(Json(api_success(appointment)))
}

/// Book an appointment (admin/reception)
#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment created successfully", body = AppointmentRow),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Patient or doctor not found"),
        (status = 409, description = "Doctor already booked at this time")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn create_appointment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AppointmentRow>>), ApiError> {
    auth.require_role(&[Role::Admin, Role::Reception])?;
    req.validate()?;

    ensure_patient_exists(&server.db_pool, req.patient_id).await?;
    ensure_doctor_exists(&server.db_pool, req.doctor_id).await?;

    if has_conflict(&server.db_pool, req.doctor_id, req.date_time, None).await? {
        return Err(ApiError::conflict(
            "Doctor has a conflicting appointment at this time",
        ));
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO appointments (id, patient_id, doctor_id, date_time, status, reason, notes)
        VALUES ($1, $2, $3, $4, 'scheduled', $5, $6)
        "#,
    )
    .bind(id)
    .bind(req.patient_id)
    .bind(req.doctor_id)
    .bind(req.date_time)
    .bind(&req.reason)
    .bind(&req.notes)
    .execute(&server.db_pool)
    .await?;

    let appointment = fetch_appointment(&server.db_pool, id).await?;
    tracing::info!(appointment_id = %id, doctor_id = %req.doctor_id, "appointment booked");
    Ok((StatusCode::CREATED, Json(api_success(appointment))))
}

/// Reschedule or edit an appointment (admin/reception)
#[utoipa::path(
    put,
    path = "/api/appointments/:id",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated successfully", body = AppointmentRow),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Doctor already booked at this time")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn update_appointment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateAppointmentRequest>,
) -> Result<Json<ApiResponse<AppointmentRow>>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Reception])?;

    let status = match req.status.as_deref() {
        Some(value) => {
            Some(AppointmentStatus::parse(value).ok_or_else(|| {
                ApiError::validation("Status must be one of scheduled, completed, cancelled")
            })?)
        }
        None => None,
    };

    let existing = sqlx::query_as::<_, (Uuid,)>(
        "SELECT doctor_id FROM appointments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Appointment"))?;

    if let Some(date_time) = req.date_time {
        if has_conflict(&server.db_pool, existing.0, date_time, Some(id)).await? {
            return Err(ApiError::conflict(
                "Doctor has a conflicting appointment at this time",
            ));
        }
    }

    sqlx::query(
        r#"
        UPDATE appointments
        SET
            date_time = COALESCE($1, date_time),
            reason = COALESCE($2, reason),
            notes = COALESCE($3, notes),
            status = COALESCE($4, status),
            updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(req.date_time)
    .bind(&req.reason)
    .bind(&req.notes)
    .bind(status)
    .bind(id)
    .execute(&server.db_pool)
    .await?;

    let appointment = fetch_appointment(&server.db_pool, id).await?;
    Ok(Json(api_success(appointment)))
}

/// Cancel an appointment; doctors may only cancel their own.
#[utoipa::path(
    put,
    path = "/api/appointments/:id/cancel",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    request_body = CancelAppointmentRequest,
    responses(
        (status = 200, description = "Appointment cancelled"),
        (status = 400, description = "Already cancelled"),
        (status = 403, description = "Not this doctor's appointment"),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn cancel_appointment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    body: Option<AppJson<CancelAppointmentRequest>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Reception, Role::Doctor])?;
    let req = body.map(|AppJson(req)| req).unwrap_or(CancelAppointmentRequest { reason: None });

    let (doctor_id, status) = sqlx::query_as::<_, (Uuid, AppointmentStatus)>(
        "SELECT doctor_id, status FROM appointments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Appointment"))?;

    if status == AppointmentStatus::Cancelled {
        return Err(ApiError::validation("Appointment is already cancelled"));
    }
    ensure_doctor_owns(&server, &auth, doctor_id).await?;

    let reason = req.reason.unwrap_or_else(|| "No reason provided".to_string());
    sqlx::query(
        r#"
        UPDATE appointments
        SET status = 'cancelled',
            notes = COALESCE(notes, '') || E'\nCancelled: ' || $1,
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(&reason)
    .bind(id)
    .execute(&server.db_pool)
    .await?;

    tracing::info!(appointment_id = %id, "appointment cancelled");
    Ok(Json(api_success(serde_json::json!({
        "message": "Appointment cancelled successfully"
    }))))
}

/// Mark a scheduled appointment completed (admin/doctor).
#[utoipa::path(
    put,
    path = "/api/appointments/:id/complete",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment completed"),
        (status = 400, description = "Appointment is not scheduled"),
        (status = 403, description = "Not this doctor's appointment"),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn complete_appointment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Doctor])?;

    let (doctor_id, status) = sqlx::query_as::<_, (Uuid, AppointmentStatus)>(
        "SELECT doctor_id, status FROM appointments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Appointment"))?;

    if status != AppointmentStatus::Scheduled {
        return Err(ApiError::validation(
            "Only scheduled appointments can be completed",
        ));
    }
    ensure_doctor_owns(&server, &auth, doctor_id).await?;

    sqlx::query("UPDATE appointments SET status = 'completed', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&server.db_pool)
        .await?;

    Ok(Json(api_success(serde_json::json!({
        "message": "Appointment completed successfully"
    }))))
}

/// Today's schedule; doctors see their own slice.
#[utoipa::path(
    get,
    path = "/api/appointments/today/list",
    responses(
        (status = 200, description = "Today's appointments", body = Vec<AppointmentRow>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn today_appointments(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<AppointmentRow>>>, ApiError> {
    let own_doctor_id = if auth.role == Role::Doctor {
        doctor_id_for_user(&server.db_pool, auth.user_id).await?
    } else {
        None
    };

    let mut query = ListQuery::new(APPOINTMENT_SELECT);
    query
        .filter_window("a.date_time", Some(today_bounds()))
        .filter_eq("a.doctor_id", own_doctor_id)
        .order_by("a.date_time", "ASC");
    let appointments: Vec<AppointmentRow> =
        query.build_query_as().fetch_all(&server.db_pool).await?;

    Ok(Json(api_success(appointments)))
}

/// Remove an appointment entirely (admin only)
#[utoipa::path(
    delete,
    path = "/api/appointments/:id",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment deleted"),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn delete_appointment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let deleted = sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(id)
        .execute(&server.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Appointment"));
    }

    Ok(Json(api_success(serde_json::json!({
        "message": "Appointment deleted successfully"
    }))))
}

async fn fetch_appointment(pool: &PgPool, id: Uuid) -> Result<AppointmentRow, ApiError> {
    sqlx::query_as::<_, AppointmentRow>(&format!("{APPOINTMENT_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment"))
}

/// Doctors may only mutate their own appointments.
async fn ensure_doctor_owns(
    server: &MediCoreServer,
    auth: &AuthContext,
    appointment_doctor_id: Uuid,
) -> Result<(), ApiError> {
    if auth.role != Role::Doctor {
        return Ok(());
    }
    match doctor_id_for_user(&server.db_pool, auth.user_id).await? {
        Some(own_id) if own_id == appointment_doctor_id => Ok(()),
        _ => Err(ApiError::forbidden("Access denied")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_round_trips() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("no-show"), None);
    }

    #[test]
    fn create_requires_a_reason() {
        let req = CreateAppointmentRequest {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date_time: Utc::now(),
            reason: "  ".to_string(),
            notes: None,
        };
        assert!(req.validate().is_err());
    }
}
