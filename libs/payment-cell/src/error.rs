use thiserror::Error;
use uuid::Uuid;

use shared_backend::BackendError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Checkout not found: {0}")]
    CheckoutNotFound(Uuid),

    #[error("Checkout belongs to another patient")]
    NotCheckoutOwner,

    #[error("Invalid checkout transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Patient already has a checkout in progress")]
    CheckoutInProgress,

    #[error("Payment gateway is not configured")]
    GatewayNotConfigured,

    #[error("Could not create payment order: {0}")]
    OrderCreation(BackendError),

    #[error("Checkout task failed: {0}")]
    Interrupted(String),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::CheckoutNotFound(_) => AppError::NotFound(err.to_string()),
            PaymentError::NotCheckoutOwner => AppError::Auth(err.to_string()),
            PaymentError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            PaymentError::CheckoutInProgress => AppError::Conflict(err.to_string()),
            PaymentError::GatewayNotConfigured | PaymentError::Interrupted(_) => {
                AppError::Internal(err.to_string())
            }
            PaymentError::OrderCreation(inner) => inner.into(),
        }
    }
}
