//! Route path constants, grouped per resource.
//!
//! Paths are relative to their resource prefix; `create_routes` nests each
//! group under [`API`].

pub const API: &str = "/api";
pub const HEALTH: &str = "/health";

pub mod auth {
    pub const PREFIX: &str = "/auth";
    pub const REGISTER: &str = "/register";
    pub const LOGIN: &str = "/login";
    pub const LOGOUT: &str = "/logout";
    pub const ME: &str = "/me";
    pub const PROFILE: &str = "/profile";
    pub const CHANGE_PASSWORD: &str = "/change-password";
}

pub mod patients {
    pub const PREFIX: &str = "/patients";
    pub const COLLECTION: &str = "/";
    pub const BY_ID: &str = "/:id";
    pub const APPOINTMENTS: &str = "/:id/appointments";
    pub const TREATMENTS: &str = "/:id/treatments";
    pub const LAB_TESTS: &str = "/:id/lab-tests";
    pub const BILLS: &str = "/:id/bills";
}

pub mod doctors {
    pub const PREFIX: &str = "/doctors";
    pub const COLLECTION: &str = "/";
    pub const BY_ID: &str = "/:id";
}

pub mod appointments {
    pub const PREFIX: &str = "/appointments";
    pub const COLLECTION: &str = "/";
    pub const BY_ID: &str = "/:id";
    pub const CANCEL: &str = "/:id/cancel";
    pub const COMPLETE: &str = "/:id/complete";
    pub const TODAY: &str = "/today/list";
}

pub mod treatments {
    pub const PREFIX: &str = "/treatments";
    pub const COLLECTION: &str = "/";
    pub const BY_ID: &str = "/:id";
}

pub mod lab_tests {
    pub const PREFIX: &str = "/lab-tests";
    pub const COLLECTION: &str = "/";
    pub const BY_ID: &str = "/:id";
}

pub mod bills {
    pub const PREFIX: &str = "/bills";
    pub const COLLECTION: &str = "/";
    pub const BY_ID: &str = "/:id";
    pub const PAYMENT: &str = "/:id/payment";
    pub const STATUS: &str = "/:id/status";
    pub const STATS_OVERVIEW: &str = "/stats/overview";
}

pub mod users {
    pub const PREFIX: &str = "/users";
    pub const COLLECTION: &str = "/";
    pub const BY_ID: &str = "/:id";
    pub const PASSWORD: &str = "/:id/password";
    pub const TOGGLE_STATUS: &str = "/:id/toggle-status";
}

pub mod dashboard {
    pub const PREFIX: &str = "/dashboard";
    pub const STATS: &str = "/stats";
}
