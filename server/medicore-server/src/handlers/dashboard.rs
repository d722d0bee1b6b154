//! Role-scoped dashboard statistics.
//!
//! Each role maps to a fixed list of named counters via a lookup table; every
//! counter is computed the same way (one aggregate query against the pool), so
//! adding a statistic means adding an enum variant and putting it in the right
//! role lists.

use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::doctor_id_for_user;
use crate::middleware::AuthContext;
use crate::server::MediCoreServer;
use crate::types::role::Role;
use crate::utils::time::today_bounds;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// One named dashboard counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    TotalPatients,
    TotalAppointments,
    TodayAppointments,
    TodayScheduled,
    TodayCompleted,
    TotalTests,
    PendingTests,
    ProcessingTests,
    CompletedTests,
    TotalBills,
    PaidBills,
    PendingBills,
    TotalRevenue,
    TotalCollected,
    TotalUsers,
    ActiveUsers,
    TotalDoctors,
    MyAppointments,
    MyPatients,
    MyLabTests,
    MyTreatments,
    TodayReceived,
    TodayCompletedTests,
}

const ADMIN_STATS: &[Stat] = &[
    Stat::TotalPatients,
    Stat::TotalAppointments,
    Stat::TodayAppointments,
    Stat::TodayScheduled,
    Stat::TodayCompleted,
    Stat::TotalTests,
    Stat::PendingTests,
    Stat::CompletedTests,
    Stat::TotalBills,
    Stat::PaidBills,
    Stat::PendingBills,
    Stat::TotalRevenue,
    Stat::TotalCollected,
    Stat::TotalUsers,
    Stat::ActiveUsers,
    Stat::TotalDoctors,
];

const DOCTOR_STATS: &[Stat] = &[
    Stat::TotalPatients,
    Stat::TotalAppointments,
    Stat::TodayAppointments,
    Stat::TodayScheduled,
    Stat::TodayCompleted,
    Stat::MyAppointments,
    Stat::MyPatients,
    Stat::MyLabTests,
    Stat::MyTreatments,
];

const RECEPTION_STATS: &[Stat] = &[
    Stat::TotalPatients,
    Stat::TotalAppointments,
    Stat::TodayAppointments,
    Stat::TodayScheduled,
    Stat::TodayCompleted,
    Stat::TotalBills,
    Stat::PaidBills,
    Stat::PendingBills,
];

const LAB_STATS: &[Stat] = &[
    Stat::TotalPatients,
    Stat::TotalAppointments,
    Stat::TodayAppointments,
    Stat::TodayScheduled,
    Stat::TodayCompleted,
    Stat::TotalTests,
    Stat::PendingTests,
    Stat::ProcessingTests,
    Stat::CompletedTests,
    Stat::TodayReceived,
    Stat::TodayCompletedTests,
];

/// The statistics a role is allowed to see.
pub fn stats_for_role(role: Role) -> &'static [Stat] {
    match role {
        Role::Admin => ADMIN_STATS,
        Role::Doctor => DOCTOR_STATS,
        Role::Reception => RECEPTION_STATS,
        Role::Lab => LAB_STATS,
    }
}

/// Per-request inputs shared by every counter computation.
struct StatContext {
    today: (DateTime<Utc>, DateTime<Utc>),
    /// Doctor record backing the caller, when the caller is a doctor.
    doctor_id: Option<Uuid>,
}

impl Stat {
    /// JSON key for the counter.
    pub fn key(self) -> &'static str {
        match self {
            Stat::TotalPatients => "totalPatients",
            Stat::TotalAppointments => "totalAppointments",
            Stat::TodayAppointments => "todayAppointments",
            Stat::TodayScheduled => "todayScheduled",
            Stat::TodayCompleted => "todayCompleted",
            Stat::TotalTests => "totalTests",
            Stat::PendingTests => "pendingTests",
            Stat::ProcessingTests => "processingTests",
            Stat::CompletedTests => "completedTests",
            Stat::TotalBills => "totalBills",
            Stat::PaidBills => "paidBills",
            Stat::PendingBills => "pendingBills",
            Stat::TotalRevenue => "totalRevenue",
            Stat::TotalCollected => "totalCollected",
            Stat::TotalUsers => "totalUsers",
            Stat::ActiveUsers => "activeUsers",
            Stat::TotalDoctors => "totalDoctors",
            Stat::MyAppointments => "myAppointments",
            Stat::MyPatients => "myPatients",
            Stat::MyLabTests => "myLabTests",
            Stat::MyTreatments => "myTreatments",
            Stat::TodayReceived => "todayReceived",
            Stat::TodayCompletedTests => "todayCompletedTests",
        }
    }

    async fn compute(
        self,
        pool: &PgPool,
        ctx: &StatContext,
    ) -> Result<serde_json::Value, ApiError> {
        let (today_start, today_end) = ctx.today;
        let value = match self {
            Stat::TotalPatients => count(pool, "SELECT COUNT(*) FROM patients").await?,
            Stat::TotalAppointments => count(pool, "SELECT COUNT(*) FROM appointments").await?,
            Stat::TodayAppointments => {
                count_in_window(
                    pool,
                    "SELECT COUNT(*) FROM appointments WHERE date_time >= $1 AND date_time < $2",
                    today_start,
                    today_end,
                )
                .await?
            }
            Stat::TodayScheduled => {
                count_in_window(
                    pool,
                    "SELECT COUNT(*) FROM appointments \
                     WHERE status = 'scheduled' AND date_time >= $1 AND date_time < $2",
                    today_start,
                    today_end,
                )
                .await?
            }
            Stat::TodayCompleted => {
                count_in_window(
                    pool,
                    "SELECT COUNT(*) FROM appointments \
                     WHERE status = 'completed' AND date_time >= $1 AND date_time < $2",
                    today_start,
                    today_end,
                )
                .await?
            }
            Stat::TotalTests => count(pool, "SELECT COUNT(*) FROM lab_tests").await?,
            Stat::PendingTests => {
                count(pool, "SELECT COUNT(*) FROM lab_tests WHERE status = 'pending'").await?
            }
            Stat::ProcessingTests => {
                count(pool, "SELECT COUNT(*) FROM lab_tests WHERE status = 'processing'").await?
            }
            Stat::CompletedTests => {
                count(pool, "SELECT COUNT(*) FROM lab_tests WHERE status = 'completed'").await?
            }
            Stat::TotalBills => count(pool, "SELECT COUNT(*) FROM bills").await?,
            Stat::PaidBills => {
                count(pool, "SELECT COUNT(*) FROM bills WHERE status = 'paid'").await?
            }
            Stat::PendingBills => {
                count(pool, "SELECT COUNT(*) FROM bills WHERE status = 'pending'").await?
            }
            Stat::TotalRevenue => {
                sum(pool, "SELECT COALESCE(SUM(total_amount), 0) FROM bills").await?
            }
            Stat::TotalCollected => {
                sum(pool, "SELECT COALESCE(SUM(paid_amount), 0) FROM bills").await?
            }
            Stat::TotalUsers => count(pool, "SELECT COUNT(*) FROM users").await?,
            Stat::ActiveUsers => {
                count(pool, "SELECT COUNT(*) FROM users WHERE is_active = TRUE").await?
            }
            Stat::TotalDoctors => count(pool, "SELECT COUNT(*) FROM doctors").await?,
            Stat::MyAppointments => {
                count_for_doctor(
                    pool,
                    "SELECT COUNT(*) FROM appointments WHERE doctor_id = $1",
                    ctx.doctor_id,
                )
                .await?
            }
            Stat::MyPatients => {
                count_for_doctor(
                    pool,
                    "SELECT COUNT(DISTINCT patient_id) FROM appointments WHERE doctor_id = $1",
                    ctx.doctor_id,
                )
                .await?
            }
            Stat::MyLabTests => {
                count_for_doctor(
                    pool,
                    "SELECT COUNT(*) FROM lab_tests WHERE doctor_id = $1",
                    ctx.doctor_id,
                )
                .await?
            }
            Stat::MyTreatments => {
                count_for_doctor(
                    pool,
                    "SELECT COUNT(*) FROM treatments WHERE doctor_id = $1",
                    ctx.doctor_id,
                )
                .await?
            }
            Stat::TodayReceived => {
                count_in_window(
                    pool,
                    "SELECT COUNT(*) FROM lab_tests WHERE created_at >= $1 AND created_at < $2",
                    today_start,
                    today_end,
                )
                .await?
            }
            Stat::TodayCompletedTests => {
                count_in_window(
                    pool,
                    "SELECT COUNT(*) FROM lab_tests \
                     WHERE completed_at IS NOT NULL AND completed_at >= $1 AND completed_at < $2",
                    today_start,
                    today_end,
                )
                .await?
            }
        };
        Ok(value)
    }
}

async fn count(pool: &PgPool, sql: &str) -> Result<serde_json::Value, ApiError> {
    let value: i64 = sqlx::query_scalar(sql).fetch_one(pool).await?;
    Ok(serde_json::Value::from(value))
}

async fn count_in_window(
    pool: &PgPool,
    sql: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<serde_json::Value, ApiError> {
    let value: i64 = sqlx::query_scalar(sql)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;
    Ok(serde_json::Value::from(value))
}

async fn count_for_doctor(
    pool: &PgPool,
    sql: &str,
    doctor_id: Option<Uuid>,
) -> Result<serde_json::Value, ApiError> {
    // A doctor-role user without a doctor record simply has empty counters.
    let Some(doctor_id) = doctor_id else {
        return Ok(serde_json::Value::from(0));
    };
    let value: i64 = sqlx::query_scalar(sql)
        .bind(doctor_id)
        .fetch_one(pool)
        .await?;
    Ok(serde_json::Value::from(value))
}

async fn sum(pool: &PgPool, sql: &str) -> Result<serde_json::Value, ApiError> {
    let value: Decimal = sqlx::query_scalar(sql).fetch_one(pool).await?;
    serde_json::to_value(value)
        .map_err(|err| ApiError::internal(format!("Failed to serialize statistic: {err}")))
}

/// Dashboard statistics for the caller's role.
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Role-scoped statistics"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "dashboard",
    security(("bearer_auth" = []))
)]
pub async fn dashboard_stats(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let doctor_id = if auth.role == Role::Doctor {
        doctor_id_for_user(&server.db_pool, auth.user_id).await?
    } else {
        None
    };
    let ctx = StatContext {
        today: today_bounds(),
        doctor_id,
    };

    let mut stats = serde_json::Map::new();
    for stat in stats_for_role(auth.role) {
        let value = stat.compute(&server.db_pool, &ctx).await?;
        stats.insert(stat.key().to_string(), value);
    }

    Ok(Json(api_success(serde_json::Value::Object(stats))))
}
