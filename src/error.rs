//! Error types for the Perpustakaan server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchStudent = 4,
    NoSuchBook = 5,
    NoSuchLoan = 6,
    OutOfStock = 7,
    Duplicate = 8,
    BadValue = 9,
    EmptyCart = 10,
    NoBooksAvailable = 11,
    AlreadyReturned = 12,
    AwaitingConfirmation = 13,
    NotAwaitingConfirmation = 14,
    NotYetReturned = 15,
    AlreadyRated = 16,
    NoteRequired = 17,
    InvalidRating = 18,
    ConcurrentUpdate = 19,
    NotFound = 20,
    Conflict = 21,
}

/// Failure classes surfaced to librarians and students
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Validation,
    Unavailable,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unavailable => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Loan lifecycle, cart and checkout failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CirculationError {
    #[error("Book is already in the cart")]
    DuplicateEntry,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("No book could be borrowed (out of stock): {}", failed.join(", "))]
    NoBooksAvailable { failed: Vec<String> },

    #[error("Book {0} has no available stock")]
    OutOfStock(i32),

    #[error("Loan {0} has already been returned")]
    AlreadyReturned(i32),

    #[error("Loan {0} not found")]
    NotFound(i32),

    #[error("Student {0} not found")]
    StudentNotFound(String),

    #[error("Book {0} not found")]
    BookNotFound(i32),

    #[error("A note is required when a book is returned damaged")]
    NoteRequired,

    #[error("Loan {0} belongs to another student")]
    Forbidden(i32),

    #[error("Loan {0} is already waiting for librarian confirmation")]
    AwaitingConfirmation(i32),

    #[error("Loan {0} is not waiting for confirmation")]
    NotAwaitingConfirmation(i32),

    #[error("Loan {0} has not been returned yet")]
    NotYetReturned(i32),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i16),

    #[error("Loan {0} has already been rated")]
    AlreadyRated(i32),

    #[error("Loan {0} was modified concurrently, reload and retry")]
    ConcurrentUpdate(i32),

    #[error("Due date must not be before the borrow date")]
    InvalidDates,
}

impl CirculationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CirculationError::NotFound(_)
            | CirculationError::StudentNotFound(_)
            | CirculationError::BookNotFound(_) => ErrorKind::NotFound,
            CirculationError::DuplicateEntry
            | CirculationError::AlreadyReturned(_)
            | CirculationError::AwaitingConfirmation(_)
            | CirculationError::NotAwaitingConfirmation(_)
            | CirculationError::NotYetReturned(_)
            | CirculationError::AlreadyRated(_)
            | CirculationError::ConcurrentUpdate(_) => ErrorKind::Conflict,
            CirculationError::Forbidden(_) => ErrorKind::Forbidden,
            CirculationError::EmptyCart
            | CirculationError::NoteRequired
            | CirculationError::InvalidRating(_)
            | CirculationError::InvalidDates => ErrorKind::Validation,
            CirculationError::OutOfStock(_) | CirculationError::NoBooksAvailable { .. } => {
                ErrorKind::Unavailable
            }
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CirculationError::DuplicateEntry => ErrorCode::Duplicate,
            CirculationError::EmptyCart => ErrorCode::EmptyCart,
            CirculationError::NoBooksAvailable { .. } => ErrorCode::NoBooksAvailable,
            CirculationError::OutOfStock(_) => ErrorCode::OutOfStock,
            CirculationError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            CirculationError::NotFound(_) => ErrorCode::NoSuchLoan,
            CirculationError::StudentNotFound(_) => ErrorCode::NoSuchStudent,
            CirculationError::BookNotFound(_) => ErrorCode::NoSuchBook,
            CirculationError::NoteRequired => ErrorCode::NoteRequired,
            CirculationError::Forbidden(_) => ErrorCode::NotAuthorized,
            CirculationError::AwaitingConfirmation(_) => ErrorCode::AwaitingConfirmation,
            CirculationError::NotAwaitingConfirmation(_) => ErrorCode::NotAwaitingConfirmation,
            CirculationError::NotYetReturned(_) => ErrorCode::NotYetReturned,
            CirculationError::InvalidRating(_) => ErrorCode::InvalidRating,
            CirculationError::AlreadyRated(_) => ErrorCode::AlreadyRated,
            CirculationError::ConcurrentUpdate(_) => ErrorCode::ConcurrentUpdate,
            CirculationError::InvalidDates => ErrorCode::BadValue,
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

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Circulation(#[from] CirculationError),
}

impl AppError {
    /// Returns the circulation failure carried by this error, if any
    pub fn circulation(&self) -> Option<&CirculationError> {
        match self {
            AppError::Circulation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
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
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Circulation(e) => (e.kind().status(), e.code(), e.to_string()),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
