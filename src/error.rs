use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::response::ApiResponse;

/// Request-scoped failure. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Bad credentials on login. Never says which half was wrong.
    #[error("Invalid credentials")]
    AuthenticationFailed,

    /// Missing, malformed, forged or expired session token.
    #[error("Not authorized.")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),
    #[error("Request timed out")]
    Timeout,

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthenticationFailed | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(_) | AppError::Internal(_) => {
                error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

impl From<crate::db::RepoError> for AppError {
    fn from(err: crate::db::RepoError) -> Self {
        use crate::db::RepoError;

        match err {
            RepoError::NotFound => AppError::NotFound("Record not found".into()),
            RepoError::Conflict(msg) => AppError::Conflict(msg),
            RepoError::MissingReference(_) => AppError::NotFound("Record not found".into()),
            RepoError::Database(e) => AppError::Storage(e.to_string()),
        }
    }
}

impl From<crate::auth::jwt::TokenError> for AppError {
    fn from(err: crate::auth::jwt::TokenError) -> Self {
        use crate::auth::jwt::TokenError;

        match err {
            TokenError::Invalid => AppError::Unauthorized,
            TokenError::Sign(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
