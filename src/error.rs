//! Error types for the Bookshelf server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    StoreFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    NotLendable = 10,
    OwnBook = 11,
    AlreadyBorrowed = 12,
    NotBorrowed = 13,
    NotOwner = 14,
    NotReturned = 15,
    ConcurrentUpdate = 16,
}

/// Why a lending transition was refused.
///
/// Every variant reflects a mismatch between the caller and the current
/// business state, never a transient failure, so none of them is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LendingRejection {
    #[error("The requested book can not be borrowed (archived or not shareable)")]
    NotLendable,

    #[error("You own this book")]
    OwnBook,

    #[error("The requested book is already borrowed")]
    AlreadyBorrowed,

    #[error("You did not borrow this book")]
    NotBorrowed,

    #[error("Only the owner of this book can approve its return")]
    NotOwner,

    #[error("Book is not returned yet")]
    NotReturnedYet,
}

impl LendingRejection {
    pub fn code(&self) -> ErrorCode {
        match self {
            LendingRejection::NotLendable => ErrorCode::NotLendable,
            LendingRejection::OwnBook => ErrorCode::OwnBook,
            LendingRejection::AlreadyBorrowed => ErrorCode::AlreadyBorrowed,
            LendingRejection::NotBorrowed => ErrorCode::NotBorrowed,
            LendingRejection::NotOwner => ErrorCode::NotOwner,
            LendingRejection::NotReturnedYet => ErrorCode::NotReturned,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(LendingRejection),

    /// Another transition on the same loan won the race
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and error code for this error
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::PreconditionFailed(reason) => (StatusCode::BAD_REQUEST, reason.code()),
            AppError::ConcurrencyConflict(_) => (StatusCode::CONFLICT, ErrorCode::ConcurrentUpdate),
            AppError::StoreUnavailable(e) => {
                let status = match e {
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, ErrorCode::StoreFailure)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::ConcurrencyConflict(msg) => msg.clone(),
            AppError::PreconditionFailed(reason) => reason.to_string(),
            AppError::StoreUnavailable(e) => {
                tracing::error!("Store error: {:?}", e);
                "Store unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

impl From<LendingRejection> for AppError {
    fn from(reason: LendingRejection) -> Self {
        AppError::PreconditionFailed(reason)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
