//! Identity Error Types
//!
//! Domain error kinds for registration, login, the token lifecycle and the
//! channel read model. They integrate with the unified `kernel::error::AppError`
//! envelope at the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Identity result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity error variants
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Missing, blank or malformed input
    #[error("{0}")]
    Validation(String),

    /// Username or email already registered
    #[error("User with email or username already exists")]
    DuplicateIdentity,

    #[error("User does not exist")]
    AccountNotFound,

    #[error("Channel does not exist")]
    ChannelNotFound,

    /// Wrong password
    #[error("Invalid user credentials")]
    InvalidCredentials,

    /// Absent or unusable access token
    #[error("Unauthorized request")]
    Unauthorized,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Malformed token")]
    TokenMalformed,

    /// Signature does not verify
    #[error("Invalid token")]
    TokenInvalid,

    /// Token subject no longer resolves to an account
    #[error("Invalid refresh token")]
    StaleAccount,

    /// Presented refresh token is not the active one
    #[error("Refresh token expired or already used")]
    TokenReuseOrMismatch,

    /// Media host refused the file or could not be reached
    #[error("Error while uploading {0}")]
    UploadFailed(String),

    #[error("Something went wrong while generating refresh and access tokens")]
    TokenGeneration,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Validation(_) | IdentityError::UploadFailed(_) => ErrorKind::BadRequest,
            IdentityError::DuplicateIdentity => ErrorKind::Conflict,
            IdentityError::AccountNotFound | IdentityError::ChannelNotFound => ErrorKind::NotFound,
            IdentityError::InvalidCredentials
            | IdentityError::Unauthorized
            | IdentityError::TokenExpired
            | IdentityError::TokenMalformed
            | IdentityError::TokenInvalid
            | IdentityError::StaleAccount
            | IdentityError::TokenReuseOrMismatch => ErrorKind::Unauthorized,
            IdentityError::TokenGeneration
            | IdentityError::Database(_)
            | IdentityError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    ///
    /// Server-side variants carry a generic message; the cause stays in the logs.
    pub fn to_app_error(&self) -> AppError {
        match self {
            IdentityError::Database(_) | IdentityError::Internal(_) => {
                AppError::internal("Something went wrong")
            }
            other => AppError::new(other.kind(), other.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            _ if self.kind().is_server_error() => {
                tracing::error!(error = %self, "Identity operation failed");
            }
            IdentityError::UploadFailed(what) => {
                tracing::warn!(what = %what, "Upload rejected");
            }
            IdentityError::TokenReuseOrMismatch => {
                tracing::warn!("Refresh token reuse or mismatch rejected");
            }
            IdentityError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for IdentityError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest | ErrorKind::UnprocessableEntity => {
                IdentityError::Validation(err.message().to_string())
            }
            _ => IdentityError::Internal(err.to_string()),
        }
    }
}
