//! OpenAPI documentation and Swagger UI routes.

use crate::handlers::{
    appointments, auth, bills, dashboard, doctors, health, lab_tests, patients, treatments, users,
};
use crate::server::MediCoreServer;
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MediCore HMS API",
        description = "Hospital management REST API: patients, doctors, appointments, treatments, lab tests, billing, users, and dashboards."
    ),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        auth::update_profile,
        auth::change_password,
        patients::list_patients,
        patients::get_patient,
        patients::create_patient,
        patients::update_patient,
        patients::delete_patient,
        patients::get_patient_appointments,
        patients::get_patient_treatments,
        patients::get_patient_lab_tests,
        patients::get_patient_bills,
        doctors::list_doctors,
        doctors::get_doctor,
        doctors::create_doctor,
        doctors::update_doctor,
        doctors::delete_doctor,
        appointments::list_appointments,
        appointments::get_appointment,
        appointments::create_appointment,
        appointments::update_appointment,
        appointments::cancel_appointment,
        appointments::complete_appointment,
        appointments::today_appointments,
        appointments::delete_appointment,
        treatments::list_treatments,
        treatments::get_treatment,
        treatments::create_treatment,
        treatments::update_treatment,
        treatments::delete_treatment,
        lab_tests::list_lab_tests,
        lab_tests::get_lab_test,
        lab_tests::create_lab_test,
        lab_tests::update_lab_test,
        lab_tests::delete_lab_test,
        bills::list_bills,
        bills::get_bill,
        bills::create_bill,
        bills::update_bill_payment,
        bills::update_bill_status,
        bills::delete_bill,
        bills::billing_stats,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::update_user_password,
        users::toggle_user_status,
        users::delete_user,
        dashboard::dashboard_stats,
    ),
    components(schemas(
        health::HealthResponse,
        crate::types::role::Role,
        crate::error::ErrorBody,
        auth::LoginRequest,
        auth::LoginResponse,
        auth::UpdateProfileRequest,
        auth::ChangePasswordRequest,
        users::UserRow,
        users::CreateUserRequest,
        users::UpdateUserRequest,
        users::UpdateUserPasswordRequest,
        patients::PatientRow,
        patients::CreatePatientRequest,
        patients::UpdatePatientRequest,
        patients::PatientAppointmentRow,
        patients::PatientTreatmentRow,
        patients::PatientLabTestRow,
        patients::PatientBillRow,
        patients::PatientBill,
        patients::BillItemView,
        doctors::DoctorRow,
        doctors::CreateDoctorRequest,
        doctors::UpdateDoctorRequest,
        appointments::AppointmentStatus,
        appointments::AppointmentRow,
        appointments::CreateAppointmentRequest,
        appointments::UpdateAppointmentRequest,
        appointments::CancelAppointmentRequest,
        treatments::TreatmentRow,
        treatments::CreateTreatmentRequest,
        treatments::UpdateTreatmentRequest,
        lab_tests::LabTestStatus,
        lab_tests::LabTestRow,
        lab_tests::CreateLabTestRequest,
        lab_tests::UpdateLabTestRequest,
        bills::BillRow,
        bills::BillDetail,
        bills::BillItemRequest,
        bills::CreateBillRequest,
        bills::UpdatePaymentRequest,
        bills::UpdateBillStatusRequest,
        bills::PaymentUpdateResponse,
        bills::BillingStatsResponse,
        billing_ledger::BillStatus,
        billing_ledger::ItemCategory,
        billing_ledger::BillingOverview,
        billing_ledger::MonthlyBucket,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and dependency checks"),
        (name = "auth", description = "Authentication and self-service account management"),
        (name = "patients", description = "Patient records and clinical history"),
        (name = "doctors", description = "Doctor profiles"),
        (name = "appointments", description = "Appointment scheduling"),
        (name = "treatments", description = "Treatment records"),
        (name = "lab-tests", description = "Lab test orders and results"),
        (name = "bills", description = "Billing and payments"),
        (name = "users", description = "User administration"),
        (name = "dashboard", description = "Role-scoped statistics"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Swagger UI and the raw OpenAPI document.
pub fn create_docs_routes() -> Router<MediCoreServer> {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
