//! Billing: bill creation, payment lifecycle, and revenue statistics.
//!
//! The arithmetic and status rules live in the `billing-ledger` crate; this
//! module is the HTTP and persistence shell around them.

use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse};
use crate::handlers::patients::BillItemView;
use crate::middleware::{AppJson, AuthContext};
use crate::server::MediCoreServer;
use crate::types::pagination::PaginationParams;
use crate::types::role::Role;
use crate::utils::query_builder::ListQuery;
use crate::validation::RequestValidation;
use crate::validate_field;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use billing_ledger::{
    apply_payment, monthly_breakdown, overview, price_items, BillSnapshot, BillStatus,
    BillingOverview, ItemCategory, MonthlyBucket, NewLineItem,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow, Clone)]
pub struct BillRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: BillStatus,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub specialization: Option<String>,
    pub doctor_first_name: Option<String>,
    pub doctor_last_name: Option<String>,
}

const BILL_SELECT: &str = r#"
SELECT b.id, b.patient_id, b.doctor_id, b.total_amount, b.paid_amount, b.status,
       b.payment_method, b.notes, b.created_at, b.updated_at,
       p.first_name AS patient_first_name, p.last_name AS patient_last_name,
       p.email AS patient_email, p.phone AS patient_phone,
       d.specialization,
       du.first_name AS doctor_first_name, du.last_name AS doctor_last_name
FROM bills b
JOIN patients p ON b.patient_id = p.id
LEFT JOIN doctors d ON b.doctor_id = d.id
LEFT JOIN users du ON d.user_id = du.id
"#;

/// Bill with its line items attached.
#[derive(Debug, Serialize, ToSchema)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: BillRow,
    pub items: Vec<BillItemView>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillItemRequest {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default, rename = "type")]
    pub category: ItemCategory,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub items: Vec<BillItemRequest>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl RequestValidation for CreateBillRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_field!(
            self.items,
            !self.items.is_empty(),
            "Patient ID and items are required"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub paid_amount: Decimal,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBillStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdateResponse {
    pub new_paid_amount: Decimal,
    pub new_status: BillStatus,
    pub balance: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BillingStatsResponse {
    pub overview: BillingOverview,
    pub monthly_stats: Vec<MonthlyBucket>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListBillsParams {
    /// Matches patient name or email
    pub search: Option<String>,
    pub status: Option<BillStatus>,
    pub patient_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// List bills
#[utoipa::path(
    get,
    path = "/api/bills",
    params(ListBillsParams),
    responses(
        (status = 200, description = "Bills retrieved successfully", body = Vec<BillRow>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "bills",
    security(("bearer_auth" = []))
)]
pub async fn list_bills(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Query(params): Query<ListBillsParams>,
) -> Result<Json<ApiResponse<Vec<BillRow>>>, ApiError> {
    let mut query = ListQuery::new(BILL_SELECT);
    query
        .search(
            &["p.first_name", "p.last_name", "p.email"],
            params.search.as_deref(),
        )
        .filter_eq("b.status", params.status)
        .filter_eq("b.patient_id", params.patient_id)
        .order_by("b.created_at", "DESC")
        .paginate(params.pagination.page(), params.pagination.page_size());
    let bills: Vec<BillRow> = query.build_query_as().fetch_all(&server.db_pool).await?;

    let mut count =
        ListQuery::new("SELECT COUNT(*) FROM bills b JOIN patients p ON b.patient_id = p.id");
    count
        .search(
            &["p.first_name", "p.last_name", "p.email"],
            params.search.as_deref(),
        )
        .filter_eq("b.status", params.status)
        .filter_eq("b.patient_id", params.patient_id);
    let total: i64 = count.build_query_scalar().fetch_one(&server.db_pool).await?;

    Ok(Json(api_success_with_meta(
        bills,
        params.pagination.to_metadata(total),
    )))
}

/// Get a single bill with its items
#[utoipa::path(
    get,
    path = "/api/bills/:id",
    params(("id" = Uuid, Path, description = "Bill ID")),
    responses(
        (status = 200, description = "Bill retrieved successfully", body = BillDetail),
        (status = 404, description = "Bill not found")
    ),
    tag = "bills",
    security(("bearer_auth" = []))
)]
pub async fn get_bill(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BillDetail>>, ApiError> {
    let bill = fetch_bill_detail(&server.db_pool, id).await?;
    Ok(Json(api_success(bill)))
}

/// Create a bill (admin/reception).
///
/// Header and item rows are written in one transaction: either the whole bill
/// appears or none of it does.
#[utoipa::path(
    post,
    path = "/api/bills",
    request_body = CreateBillRequest,
    responses(
        (status = 201, description = "Bill created successfully", body = BillDetail),
        (status = 400, description = "Missing patient, empty items, or bad amounts"),
        (status = 403, description = "Role not allowed")
    ),
    tag = "bills",
    security(("bearer_auth" = []))
)]
pub async fn create_bill(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    AppJson(req): AppJson<CreateBillRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BillDetail>>), ApiError> {
    auth.require_role(&[Role::Admin, Role::Reception])?;
    req.validate()?;

    // A bill against a nonexistent patient is malformed input, not a missing
    // resource: the bill is the thing being created.
    let patient_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM patients WHERE id = $1)")
            .bind(req.patient_id)
            .fetch_one(&server.db_pool)
            .await?;
    if !patient_exists {
        return Err(ApiError::validation("Referenced patient does not exist"));
    }
    if let Some(doctor_id) = req.doctor_id {
        let doctor_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM doctors WHERE id = $1)")
                .bind(doctor_id)
                .fetch_one(&server.db_pool)
                .await?;
        if !doctor_exists {
            return Err(ApiError::validation("Referenced doctor does not exist"));
        }
    }

    let new_items: Vec<NewLineItem> = req
        .items
        .iter()
        .map(|item| NewLineItem {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            category: item.category,
        })
        .collect();
    let (priced_items, total_amount) = price_items(&new_items)?;

    let bill_id = Uuid::new_v4();
    let mut tx = server.db_pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO bills (id, patient_id, doctor_id, total_amount, paid_amount, status, payment_method, notes)
        VALUES ($1, $2, $3, $4, 0, 'pending', $5, $6)
        "#,
    )
    .bind(bill_id)
    .bind(req.patient_id)
    .bind(req.doctor_id)
    .bind(total_amount)
    .bind(&req.payment_method)
    .bind(&req.notes)
    .execute(&mut *tx)
    .await?;

    for item in &priced_items {
        sqlx::query(
            r#"
            INSERT INTO bill_items (id, bill_id, description, quantity, unit_price, total_price, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bill_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .bind(item.category)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let bill = fetch_bill_detail(&server.db_pool, bill_id).await?;
    tracing::info!(bill_id = %bill_id, total = %total_amount, "bill created");
    Ok((StatusCode::CREATED, Json(api_success(bill))))
}

/// Record a payment against a bill (admin/reception).
#[utoipa::path(
    put,
    path = "/api/bills/:id/payment",
    params(("id" = Uuid, Path, description = "Bill ID")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = PaymentUpdateResponse),
        (status = 400, description = "Negative amount, overpayment, or cancelled bill"),
        (status = 404, description = "Bill not found")
    ),
    tag = "bills",
    security(("bearer_auth" = []))
)]
pub async fn update_bill_payment(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdatePaymentRequest>,
) -> Result<Json<ApiResponse<PaymentUpdateResponse>>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Reception])?;

    let bill = sqlx::query_as::<_, (Decimal, BillStatus)>(
        "SELECT total_amount, status FROM bills WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&server.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Bill"))?;

    // Rejection happens here, before any write touches the row.
    let outcome = apply_payment(bill.0, bill.1, req.paid_amount)?;

    sqlx::query(
        "UPDATE bills SET paid_amount = $1, status = $2, payment_method = $3, updated_at = NOW() WHERE id = $4",
    )
    .bind(outcome.paid_amount)
    .bind(outcome.status)
    .bind(&req.payment_method)
    .bind(id)
    .execute(&server.db_pool)
    .await?;

    tracing::info!(bill_id = %id, paid = %outcome.paid_amount, status = %outcome.status, "payment recorded");
    Ok(Json(api_success(PaymentUpdateResponse {
        new_paid_amount: outcome.paid_amount,
        new_status: outcome.status,
        balance: outcome.balance,
    })))
}

/// Overwrite a bill's status (admin only).
///
/// Deliberately does not re-derive against the paid amount, so `cancelled`
/// stays reachable and historical statuses can be corrected.
#[utoipa::path(
    put,
    path = "/api/bills/:id/status",
    params(("id" = Uuid, Path, description = "Bill ID")),
    request_body = UpdateBillStatusRequest,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Bill not found")
    ),
    tag = "bills",
    security(("bearer_auth" = []))
)]
pub async fn update_bill_status(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateBillStatusRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let status =
        BillStatus::parse(&req.status).ok_or_else(|| ApiError::validation("Invalid status"))?;

    let updated = sqlx::query("UPDATE bills SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&server.db_pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Bill"));
    }

    tracing::info!(bill_id = %id, status = %status, "bill status overwritten");
    Ok(Json(api_success(serde_json::json!({
        "message": "Bill status updated successfully"
    }))))
}

/// Delete a bill and its items (admin only)
#[utoipa::path(
    delete,
    path = "/api/bills/:id",
    params(("id" = Uuid, Path, description = "Bill ID")),
    responses(
        (status = 200, description = "Bill deleted"),
        (status = 404, description = "Bill not found")
    ),
    tag = "bills",
    security(("bearer_auth" = []))
)]
pub async fn delete_bill(
    State(server): State<MediCoreServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    auth.require_role(&[Role::Admin])?;

    let deleted = sqlx::query("DELETE FROM bills WHERE id = $1")
        .bind(id)
        .execute(&server.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Bill"));
    }

    tracing::info!(bill_id = %id, "bill deleted");
    Ok(Json(api_success(serde_json::json!({
        "message": "Bill deleted successfully"
    }))))
}

/// Billing statistics: per-status totals plus a trailing-12-month breakdown.
#[utoipa::path(
    get,
    path = "/api/bills/stats/overview",
    responses(
        (status = 200, description = "Billing statistics", body = BillingStatsResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "bills",
    security(("bearer_auth" = []))
)]
pub async fn billing_stats(
    State(server): State<MediCoreServer>,
    _auth: AuthContext,
) -> Result<Json<ApiResponse<BillingStatsResponse>>, ApiError> {
    #[derive(FromRow)]
    struct SnapshotRow {
        status: BillStatus,
        total_amount: Decimal,
        paid_amount: Decimal,
        created_at: chrono::DateTime<chrono::Utc>,
    }

    let rows = sqlx::query_as::<_, SnapshotRow>(
        "SELECT status, total_amount, paid_amount, created_at FROM bills",
    )
    .fetch_all(&server.db_pool)
    .await?;

    let snapshots: Vec<BillSnapshot> = rows
        .into_iter()
        .map(|row| BillSnapshot {
            status: row.status,
            total_amount: row.total_amount,
            paid_amount: row.paid_amount,
            created_at: row.created_at,
        })
        .collect();

    let response = BillingStatsResponse {
        overview: overview(&snapshots),
        monthly_stats: monthly_breakdown(&snapshots, Utc::now()),
    };
    Ok(Json(api_success(response)))
}

async fn fetch_bill_detail(pool: &PgPool, id: Uuid) -> Result<BillDetail, ApiError> {
    let bill = sqlx::query_as::<_, BillRow>(&format!("{BILL_SELECT} WHERE b.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill"))?;

    let items = sqlx::query_as::<_, BillItemView>(
        "SELECT id, bill_id, description, quantity, unit_price, total_price, category \
         FROM bill_items WHERE bill_id = $1",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(BillDetail { bill, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_requires_items() {
        let req = CreateBillRequest {
            patient_id: Uuid::new_v4(),
            doctor_id: None,
            items: Vec::new(),
            payment_method: None,
            notes: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn item_category_defaults_to_other() {
        let item: BillItemRequest = serde_json::from_value(serde_json::json!({
            "description": "Dressing",
            "quantity": "1",
            "unitPrice": "12.50"
        }))
        .unwrap();
        assert_eq!(item.category, ItemCategory::Other);
        assert_eq!(item.quantity, dec!(1));
        assert_eq!(item.unit_price, dec!(12.50));
    }

    #[test]
    fn item_category_parses_wire_name() {
        let item: BillItemRequest = serde_json::from_value(serde_json::json!({
            "description": "Consultation",
            "quantity": "1",
            "unitPrice": "100",
            "type": "consultation"
        }))
        .unwrap();
        assert_eq!(item.category, ItemCategory::Consultation);
    }
}
