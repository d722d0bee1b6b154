//! Patient records and their clinical sub-resources.

use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse};
use crate::handlers::ensure_patient_exists;
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
use billing_ledger::{BillStatus, ItemCategory};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const GENDERS: [&str; 3] = ["male", "female", "other"];

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow, Clone)]
pub struct PatientRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub blood_group: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub blood_group: Option<String>,
}

impl RequestValidation for CreatePatientRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(
            self.first_name,
            "First name, last name, date of birth, and gender are required"
        );
        validate_required!(
            self.last_name,
            "First name, last name, date of birth, and gender are required"
        );
        validate_field!(
            self.gender,
            GENDERS.contains(&self.gender.as_str()),
            "Gender must be one of male, female, other"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub blood_group: Option<String>,
}

impl RequestValidation for UpdatePatientRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(ref gender) = self.gender {
            validate_field!(
                gender,
                GENDERS.contains(&gender.as_str()),
                "Gender must be one of male, female, other"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPatientsParams {
    pub search: Option<String>,
    pub gender: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// List patients
#[utoipa::path(
    get,
    path = "/api/patients",
    params(ListPatientsParams),
    responses(
        (status = 200, description = "Patients retrieved successfully", body = Vec<PatientRow>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn list_patients(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Query(params): Query<ListPatientsParams>,
) -> Result<Json<ApiResponse<Vec<PatientRow>>>, ApiError> {
    let mut query = ListQuery::new("SELECT * FROM patients");
    query
        .search(
            &["first_name", "last_name", "email", "phone"],
            params.search.as_deref(),
        )
        .filter_eq("gender", params.gender.clone())
        .order_by("created_at", "DESC")
        .paginate(params.pagination.page(), params.pagination.page_size());
    let patients: Vec<PatientRow> = query.build_query_as().fetch_all(&server.db_pool).await?;

    let mut count = ListQuery::new("SELECT COUNT(*) FROM patients");
    count
        .search(
            &["first_name", "last_name", "email", "phone"],
            params.search.as_deref(),
        )
        .filter_eq("gender", params.gender.clone());
    let total: i64 = count.build_query_scalar().fetch_one(&server.db_pool).await?;

    Ok(Json(api_success_with_meta(
        patients,
        params.pagination.to_metadata(total),
    )))
}

/// Get a single patient
#[utoipa::path(
    get,
    path = "/api/patients/:id",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient retrieved successfully", body = PatientRow),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PatientRow>>, ApiError> {
    let patient = sqlx::query_as::<_, PatientRow>("SELECT * FROM patients WHERE id = $1")
        .bind(id)
        .fetch_optional(&server.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Patient"))?;
    Ok(Json(api_success(patient)))
}

/// Register a patient (admin/reception)
#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient created successfully", body = PatientRow),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Role not allowed")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn create_patient(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PatientRow>>), ApiError> {
    auth.require_role(&[Role::Admin, Role::Reception])?;
    req.validate()?;

    let patient = sqlx::query_as::<_, PatientRow>(
        r#"
        INSERT INTO patients (
            id, first_name, last_name, email, phone, date_of_birth, gender,
            address, emergency_contact, emergency_phone, medical_history,
            allergies, blood_group
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(req.date_of_birth)
    .bind(&req.gender)
    .bind(&req.address)
    .bind(&req.emergency_contact)
    .bind(&req.emergency_phone)
    .bind(&req.medical_history)
    .bind(&req.allergies)
    .bind(&req.blood_group)
    .fetch_one(&server.db_pool)
    .await?;

    tracing::info!(patient_id = %patient.id, "patient registered");
    Ok((StatusCode::CREATED, Json(api_success(patient))))
}

/// Update a patient (admin/reception)
#[utoipa::path(
    put,
    path = "/api/patients/:id",
    params(("id" = Uuid, Path, description = "Patient ID")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated successfully", body = PatientRow),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn update_patient(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdatePatientRequest>,
) -> Result<Json<ApiResponse<PatientRow>>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Reception])?;
    req.validate()?;

    let patient = sqlx::query_as::<_, PatientRow>(
        r#"
        UPDATE patients
        SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            date_of_birth = COALESCE($5, date_of_birth),
            gender = COALESCE($6, gender),
            address = COALESCE($7, address),
            emergency_contact = COALESCE($8, emergency_contact),
            emergency_phone = COALESCE($9, emergency_phone),
            medical_history = COALESCE($10, medical_history),
            allergies = COALESCE($11, allergies),
            blood_group = COALESCE($12, blood_group),
            updated_at = NOW()
        WHERE id = $13
        RETURNING *
        "#,
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(req.date_of_birth)
    .bind(&req.gender)
    .bind(&req.address)
    .bind(&req.emergency_contact)
    .bind(&req.emergency_phone)
    .bind(&req.medical_history)
    .bind(&req.allergies)
    .bind(&req.blood_group)
    .bind(id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Patient"))?;

    Ok(Json(api_success(patient)))
}

/// Delete a patient (admin only)
#[utoipa::path(
    delete,
    path = "/api/patients/:id",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient deleted"),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn delete_patient(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let deleted = sqlx::query("DELETE FROM patients WHERE id = $1")
        .bind(id)
        .execute(&server.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Patient"));
    }

    tracing::info!(patient_id = %id, "patient deleted");
    Ok(Json(api_success(serde_json::json!({
        "message": "Patient deleted successfully"
    }))))
}

// ---------------------------------------------------------------------------
// Sub-resource listings
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct PatientAppointmentRow {
    pub id: Uuid,
    pub date_time: chrono::DateTime<chrono::Utc>,
    pub status: String,
    pub reason: String,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub specialization: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
}

/// Appointments of one patient
#[utoipa::path(
    get,
    path = "/api/patients/:id/appointments",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Appointments for the patient", body = Vec<PatientAppointmentRow>),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient_appointments(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PatientAppointmentRow>>>, ApiError> {
    ensure_patient_exists(&server.db_pool, id).await?;

    let appointments = sqlx::query_as::<_, PatientAppointmentRow>(
        r#"
        SELECT a.id, a.date_time, a.status, a.reason, a.notes, a.created_at,
               d.specialization,
               u.first_name AS doctor_first_name, u.last_name AS doctor_last_name
        FROM appointments a
        JOIN doctors d ON a.doctor_id = d.id
        JOIN users u ON d.user_id = u.id
        WHERE a.patient_id = $1
        ORDER BY a.date_time DESC
        "#,
    )
    .bind(id)
    .fetch_all(&server.db_pool)
    .await?;

    Ok(Json(api_success(appointments)))
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct PatientTreatmentRow {
    pub id: Uuid,
    pub diagnosis: String,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub specialization: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
}

/// Treatments of one patient
#[utoipa::path(
    get,
    path = "/api/patients/:id/treatments",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Treatments for the patient", body = Vec<PatientTreatmentRow>),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient_treatments(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PatientTreatmentRow>>>, ApiError> {
    ensure_patient_exists(&server.db_pool, id).await?;

    let treatments = sqlx::query_as::<_, PatientTreatmentRow>(
        r#"
        SELECT t.id, t.diagnosis, t.prescription, t.notes, t.follow_up_date, t.created_at,
               d.specialization,
               u.first_name AS doctor_first_name, u.last_name AS doctor_last_name
        FROM treatments t
        JOIN doctors d ON t.doctor_id = d.id
        JOIN users u ON d.user_id = u.id
        WHERE t.patient_id = $1
        ORDER BY t.created_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&server.db_pool)
    .await?;

    Ok(Json(api_success(treatments)))
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct PatientLabTestRow {
    pub id: Uuid,
    pub test_name: String,
    pub test_type: String,
    pub status: String,
    pub results: Option<String>,
    pub result_file: Option<String>,
    pub normal_ranges: Option<String>,
    pub technician: Option<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub specialization: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
}

/// Lab tests of one patient
#[utoipa::path(
    get,
    path = "/api/patients/:id/lab-tests",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Lab tests for the patient", body = Vec<PatientLabTestRow>),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient_lab_tests(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PatientLabTestRow>>>, ApiError> {
    ensure_patient_exists(&server.db_pool, id).await?;

    let lab_tests = sqlx::query_as::<_, PatientLabTestRow>(
        r#"
        SELECT lt.id, lt.test_name, lt.test_type, lt.status, lt.results, lt.result_file,
               lt.normal_ranges, lt.technician, lt.completed_at, lt.created_at,
               d.specialization,
               u.first_name AS doctor_first_name, u.last_name AS doctor_last_name
        FROM lab_tests lt
        JOIN doctors d ON lt.doctor_id = d.id
        JOIN users u ON d.user_id = u.id
        WHERE lt.patient_id = $1
        ORDER BY lt.created_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&server.db_pool)
    .await?;

    Ok(Json(api_success(lab_tests)))
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct PatientBillRow {
    pub id: Uuid,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: BillStatus,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub specialization: Option<String>,
    pub doctor_first_name: Option<String>,
    pub doctor_last_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PatientBill {
    #[serde(flatten)]
    pub bill: PatientBillRow,
    pub items: Vec<BillItemView>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct BillItemView {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub category: ItemCategory,
}

/// Bills of one patient, including line items
#[utoipa::path(
    get,
    path = "/api/patients/:id/bills",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Bills for the patient", body = Vec<PatientBill>),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient_bills(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PatientBill>>>, ApiError> {
    ensure_patient_exists(&server.db_pool, id).await?;

    let bills = sqlx::query_as::<_, PatientBillRow>(
        r#"
        SELECT b.id, b.total_amount, b.paid_amount, b.status, b.payment_method,
               b.notes, b.created_at,
               d.specialization,
               u.first_name AS doctor_first_name, u.last_name AS doctor_last_name
        FROM bills b
        LEFT JOIN doctors d ON b.doctor_id = d.id
        LEFT JOIN users u ON d.user_id = u.id
        WHERE b.patient_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&server.db_pool)
    .await?;

    let items = sqlx::query_as::<_, BillItemView>(
        r#"
        SELECT bi.id, bi.bill_id, bi.description, bi.quantity, bi.unit_price,
               bi.total_price, bi.category
        FROM bill_items bi
        JOIN bills b ON bi.bill_id = b.id
        WHERE b.patient_id = $1
        "#,
    )
    .bind(id)
    .fetch_all(&server.db_pool)
    .await?;

    let mut grouped: std::collections::HashMap<Uuid, Vec<BillItemView>> =
        std::collections::HashMap::new();
    for item in items {
        grouped.entry(item.bill_id).or_default().push(item);
    }

    let bills = bills
        .into_iter()
        .map(|bill| {
            let items = grouped.remove(&bill.id).unwrap_or_default();
            PatientBill { bill, items }
        })
        .collect();

    Ok(Json(api_success(bills)))
}
