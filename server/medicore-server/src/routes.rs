pub mod paths;

use crate::{
    handlers::{
        appointments, auth, bills, dashboard, doctors, health, lab_tests, patients, treatments,
        users,
    },
    openapi,
    server::MediCoreServer,
};
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Health check routes (no authentication)
pub fn health_routes() -> Router<MediCoreServer> {
    Router::new().route(paths::HEALTH, get(health::health_check))
}

/// Authentication and self-service account routes
pub fn auth_routes() -> Router<MediCoreServer> {
    Router::new()
        .route(paths::auth::REGISTER, post(auth::register))
        .route(paths::auth::LOGIN, post(auth::login))
        .route(paths::auth::LOGOUT, post(auth::logout))
        .route(paths::auth::ME, get(auth::me))
        .route(paths::auth::PROFILE, put(auth::update_profile))
        .route(paths::auth::CHANGE_PASSWORD, put(auth::change_password))
}

/// Patient CRUD and per-patient clinical history
pub fn patient_routes() -> Router<MediCoreServer> {
    Router::new()
        .route(paths::patients::COLLECTION, get(patients::list_patients))
        .route(paths::patients::COLLECTION, post(patients::create_patient))
        .route(paths::patients::BY_ID, get(patients::get_patient))
        .route(paths::patients::BY_ID, put(patients::update_patient))
        .route(paths::patients::BY_ID, delete(patients::delete_patient))
        .route(
            paths::patients::APPOINTMENTS,
            get(patients::get_patient_appointments),
        )
        .route(
            paths::patients::TREATMENTS,
            get(patients::get_patient_treatments),
        )
        .route(
            paths::patients::LAB_TESTS,
            get(patients::get_patient_lab_tests),
        )
        .route(paths::patients::BILLS, get(patients::get_patient_bills))
}

/// Doctor profile routes
pub fn doctor_routes() -> Router<MediCoreServer> {
    Router::new()
        .route(paths::doctors::COLLECTION, get(doctors::list_doctors))
        .route(paths::doctors::COLLECTION, post(doctors::create_doctor))
        .route(paths::doctors::BY_ID, get(doctors::get_doctor))
        .route(paths::doctors::BY_ID, put(doctors::update_doctor))
        .route(paths::doctors::BY_ID, delete(doctors::delete_doctor))
}

/// Appointment scheduling routes
pub fn appointment_routes() -> Router<MediCoreServer> {
    Router::new()
        .route(
            paths::appointments::COLLECTION,
            get(appointments::list_appointments),
        )
        .route(
            paths::appointments::COLLECTION,
            post(appointments::create_appointment),
        )
        .route(
            paths::appointments::TODAY,
            get(appointments::today_appointments),
        )
        .route(
            paths::appointments::BY_ID,
            get(appointments::get_appointment),
        )
        .route(
            paths::appointments::BY_ID,
            put(appointments::update_appointment),
        )
        .route(
            paths::appointments::BY_ID,
            delete(appointments::delete_appointment),
        )
        .route(
            paths::appointments::CANCEL,
            put(appointments::cancel_appointment),
        )
        .route(
            paths::appointments::COMPLETE,
            put(appointments::complete_appointment),
        )
}

/// Treatment record routes
pub fn treatment_routes() -> Router<MediCoreServer> {
    Router::new()
        .route(
            paths::treatments::COLLECTION,
            get(treatments::list_treatments),
        )
        .route(
            paths::treatments::COLLECTION,
            post(treatments::create_treatment),
        )
        .route(paths::treatments::BY_ID, get(treatments::get_treatment))
        .route(paths::treatments::BY_ID, put(treatments::update_treatment))
        .route(
            paths::treatments::BY_ID,
            delete(treatments::delete_treatment),
        )
}

/// Lab test routes
pub fn lab_test_routes() -> Router<MediCoreServer> {
    Router::new()
        .route(paths::lab_tests::COLLECTION, get(lab_tests::list_lab_tests))
        .route(
            paths::lab_tests::COLLECTION,
            post(lab_tests::create_lab_test),
        )
        .route(paths::lab_tests::BY_ID, get(lab_tests::get_lab_test))
        .route(paths::lab_tests::BY_ID, put(lab_tests::update_lab_test))
        .route(paths::lab_tests::BY_ID, delete(lab_tests::delete_lab_test))
}

/// Billing routes
pub fn bill_routes() -> Router<MediCoreServer> {
    Router::new()
        .route(paths::bills::COLLECTION, get(bills::list_bills))
        .route(paths::bills::COLLECTION, post(bills::create_bill))
        .route(paths::bills::STATS_OVERVIEW, get(bills::billing_stats))
        .route(paths::bills::BY_ID, get(bills::get_bill))
        .route(paths::bills::BY_ID, delete(bills::delete_bill))
        .route(paths::bills::PAYMENT, put(bills::update_bill_payment))
        .route(paths::bills::STATUS, put(bills::update_bill_status))
}

/// User administration routes (admin only, enforced in handlers)
pub fn user_routes() -> Router<MediCoreServer> {
    Router::new()
        .route(paths::users::COLLECTION, get(users::list_users))
        .route(paths::users::COLLECTION, post(users::create_user))
        .route(paths::users::BY_ID, get(users::get_user))
        .route(paths::users::BY_ID, put(users::update_user))
        .route(paths::users::BY_ID, delete(users::delete_user))
        .route(paths::users::PASSWORD, put(users::update_user_password))
        .route(
            paths::users::TOGGLE_STATUS,
            put(users::toggle_user_status),
        )
}

/// Dashboard routes
pub fn dashboard_routes() -> Router<MediCoreServer> {
    Router::new().route(paths::dashboard::STATS, get(dashboard::dashboard_stats))
}

/// All `/api` routes
pub fn api_routes() -> Router<MediCoreServer> {
    Router::new()
        .nest(paths::auth::PREFIX, auth_routes())
        .nest(paths::patients::PREFIX, patient_routes())
        .nest(paths::doctors::PREFIX, doctor_routes())
        .nest(paths::appointments::PREFIX, appointment_routes())
        .nest(paths::treatments::PREFIX, treatment_routes())
        .nest(paths::lab_tests::PREFIX, lab_test_routes())
        .nest(paths::bills::PREFIX, bill_routes())
        .nest(paths::users::PREFIX, user_routes())
        .nest(paths::dashboard::PREFIX, dashboard_routes())
}

/// Create all application routes
pub fn create_routes() -> Router<MediCoreServer> {
    Router::new()
        // Health check routes (no authentication required)
        .merge(health_routes())
        // API documentation routes
        .merge(openapi::create_docs_routes())
        // API routes (bearer auth enforced per handler)
        .nest(paths::API, api_routes())
}
