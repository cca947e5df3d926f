use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::constants::{ERR_ACCOUNT_EXISTS, ERR_INVALID_BODY};
use crate::mail::MailError;
use crate::models::Purpose;

/// Terminal outcomes of checking a submitted passcode against the store
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpError {
    #[error("no pending {0} verification")]
    NotFound(Purpose),

    #[error("verification code expired")]
    Expired,

    #[error("stored verification payload is corrupted")]
    Corrupted,

    #[error("too many incorrect attempts")]
    TooManyAttempts,

    #[error("incorrect verification code")]
    IncorrectCode,
}

impl OtpError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            OtpError::NotFound(Purpose::Signup) => (
                StatusCode::BAD_REQUEST,
                "No verification request found for this email",
            ),
            OtpError::NotFound(Purpose::PasswordReset) => (
                StatusCode::BAD_REQUEST,
                "No password reset request found for this email",
            ),
            OtpError::Expired => (
                StatusCode::BAD_REQUEST,
                "Verification code has expired. Request a new code",
            ),
            OtpError::Corrupted => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification store is corrupted. Request a new code",
            ),
            OtpError::TooManyAttempts => (
                StatusCode::BAD_REQUEST,
                "Too many incorrect attempts. Request a new code",
            ),
            OtpError::IncorrectCode => (StatusCode::BAD_REQUEST, "Incorrect verification code"),
        }
    }
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Passcode hashing error: {0}")]
    PasscodeHash(String),

    #[error("Email delivery failed: {0}")]
    EmailDelivery(#[from] MailError),

    #[error("Verification failed: {0}")]
    Otp(#[from] OtpError),

    #[error("Account already exists")]
    AccountExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Account has no password login")]
    NoPasswordLogin,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Migration(ref e) => {
                tracing::error!("Migration error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::TaskJoin(ref e) => {
                tracing::error!("Task join error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::PasswordHash(ref e) => {
                tracing::error!("Password hashing error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::PasscodeHash(ref e) => {
                tracing::error!("Passcode hashing error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::EmailDelivery(ref e) => {
                tracing::error!("Email delivery error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to send verification code. Please try again",
                )
            }
            AppError::Otp(ref e) => {
                if matches!(e, OtpError::Corrupted) {
                    tracing::error!("Corrupted verification payload discarded");
                }
                e.status_and_message()
            }
            AppError::AccountExists => (StatusCode::CONFLICT, ERR_ACCOUNT_EXISTS),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            AppError::NoPasswordLogin => (
                StatusCode::BAD_REQUEST,
                "This account does not use password authentication",
            ),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            AppError::InvalidInput(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
        };

        let body = Json(json!({
            "message": message
        }));

        (status, body).into_response()
    }
}

/// Bodies that are not JSON, or do not match the request type, are answered
/// like any other validation failure
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
        AppError::InvalidInput(ERR_INVALID_BODY.to_string())
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
