use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("Contract {0} not found")]
    ContractNotFound(Uuid),

    #[error("Payment for order {0} not found")]
    PaymentNotFound(String),

    #[error("Invalid escrow transition: {0}")]
    InvalidEscrowTransition(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::ProjectNotFound(_)
            | ServiceError::ContractNotFound(_)
            | ServiceError::PaymentNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::InvalidEscrowTransition(_) | ServiceError::Validation(_) => {
                HttpError::bad_request(error.to_string())
            }

            _ => HttpError::server_error(error.to_string()),
        }
    }
}
