//! Request validation trait and helper macros.
//!
//! Create/update request types implement [`RequestValidation`] so handlers can
//! run `req.validate()?` before touching the database, with consistent 400
//! messages across the API.

use crate::error::ApiError;

/// Validates a request payload before it reaches the database.
pub trait RequestValidation {
    /// Returns `Ok(())` when the payload is acceptable, otherwise a
    /// validation [`ApiError`] carrying the user-facing message.
    fn validate(&self) -> Result<(), ApiError>;
}

/// Validate a field with an arbitrary predicate.
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Validate that a string field is present and non-blank.
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Validate a string length range (inclusive).
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.len();
        validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Basic email shape check.
#[macro_export]
macro_rules! validate_email {
    ($field:expr, $message:expr) => {
        validate_field!($field, $field.contains('@') && $field.contains('.'), $message);
    };
}

/// Validate a numeric range (inclusive).
#[macro_export]
macro_rules! validate_range {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        validate_field!($field, $field >= $min && $field <= $max, $message);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SampleRequest {
        name: String,
        email: String,
        experience: i32,
    }

    impl RequestValidation for SampleRequest {
        fn validate(&self) -> Result<(), ApiError> {
            validate_required!(self.name, "Name is required");
            validate_length!(self.name, 2, 100, "Name must be between 2 and 100 characters");
            validate_email!(self.email, "Invalid email format");
            validate_range!(self.experience, 0, 80, "Experience must be between 0 and 80");
            Ok(())
        }
    }

    fn sample() -> SampleRequest {
        SampleRequest {
            name: "Jordan Doe".to_string(),
            email: "jordan@example.com".to_string(),
            experience: 12,
        }
    }

    #[test]
    fn accepts_valid_payload() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_blank_required_field() {
        let mut req = sample();
        req.name = "   ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_malformed_email() {
        let mut req = sample();
        req.email = "not-an-email".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_number() {
        let mut req = sample();
        req.experience = 200;
        assert!(req.validate().is_err());
    }

    #[test]
    fn validation_errors_are_400s() {
        let mut req = sample();
        req.email = "broken".to_string();
        let err = req.validate().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
