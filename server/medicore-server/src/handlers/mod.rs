pub mod appointments;
pub mod auth;
pub mod bills;
pub mod dashboard;
pub mod doctors;
pub mod health;
pub mod lab_tests;
pub mod patients;
pub mod treatments;
pub mod users;

use crate::error::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

/// Doctor record id backing a user account, if the user has one.
pub(crate) async fn doctor_id_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<Uuid>, ApiError> {
    let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM doctors WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

pub(crate) async fn ensure_patient_exists(pool: &PgPool, patient_id: Uuid) -> Result<(), ApiError> {
    ensure_exists(pool, "patients", patient_id, "Patient").await
}

pub(crate) async fn ensure_doctor_exists(pool: &PgPool, doctor_id: Uuid) -> Result<(), ApiError> {
    ensure_exists(pool, "doctors", doctor_id, "Doctor").await
}

async fn ensure_exists(
    pool: &PgPool,
    table: &str,
    id: Uuid,
    entity: &str,
) -> Result<(), ApiError> {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"
    ))
    .bind(id)
    .fetch_one(pool)
    .await?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::not_found(entity))
    }
}
