use thiserror::Error;
use uuid::Uuid;
use crate::{
    models::marketmodel::*,
    error::{ErrorMessage, HttpError},
};
use axum::http::StatusCode;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Bid {0} not found")]
    BidNotFound(Uuid),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("Notification {0} not found")]
    NotificationNotFound(Uuid),

    #[error("User {actor} is not allowed to {action}")]
    Forbidden { actor: Uuid, action: String },

    #[error("Job {0} is not open for bidding")]
    JobNotOpen(Uuid),

    #[error("Bid {0} is {1} and can no longer be changed")]
    InvalidBidState(Uuid, BidStatus),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Worker {worker_id} already has a bid on job {job_id}")]
    DuplicateBid { job_id: Uuid, worker_id: Uuid },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl ServiceError {
    pub fn forbidden(actor: Uuid, action: impl Into<String>) -> Self {
        ServiceError::Forbidden {
            actor,
            action: action.into(),
        }
    }

    /// Stable, machine readable error kind surfaced to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",

            ServiceError::JobNotFound(_)
            | ServiceError::BidNotFound(_)
            | ServiceError::BookingNotFound(_)
            | ServiceError::NotificationNotFound(_) => "not_found",

            ServiceError::Forbidden { .. } => "forbidden",
            ServiceError::JobNotOpen(_) => "job_not_open",
            ServiceError::InvalidBidState(_, _) => "invalid_state",
            ServiceError::InvalidTransition { .. } => "invalid_transition",
            ServiceError::DuplicateBid { .. } => "duplicate_bid",

            ServiceError::Database(_) | ServiceError::Notification(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::JobNotFound(_)
            | ServiceError::BidNotFound(_)
            | ServiceError::BookingNotFound(_)
            | ServiceError::NotificationNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,

            ServiceError::JobNotOpen(_)
            | ServiceError::InvalidBidState(_, _)
            | ServiceError::InvalidTransition { .. }
            | ServiceError::DuplicateBid { .. } => StatusCode::CONFLICT,

            ServiceError::Database(_) | ServiceError::Notification(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        let code = error.code();

        // Storage failures are logged in full but never echoed to callers.
        let message = match &error {
            ServiceError::Database(e) => {
                tracing::error!("database error: {}", e);
                ErrorMessage::ServerError.to_string()
            }
            _ => error.to_string(),
        };

        HttpError::new(message, status, code)
    }
}
