use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BillingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidPayment(String),
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_payment(message: impl Into<String>) -> Self {
        Self::InvalidPayment(message.into())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
