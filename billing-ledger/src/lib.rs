//! Billing ledger for the MediCore hospital management system
//!
//! Provides the billing domain model shared by the HTTP server:
//! - Line-item pricing and bill total computation
//! - Payment application and status derivation
//! - Revenue reporting (per-status overview, trailing-12-month breakdown)

pub mod error;
pub mod ledger;
pub mod models;
pub mod reporting;

pub use error::*;
pub use ledger::*;
pub use models::*;
pub use reporting::*;
