use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    /// More than one record behind an id. Never expected with a primary key,
    /// so it is treated as an internal fault.
    #[error("Ambiguous id {0}")]
    Ambiguous(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Login required")]
    Unauthorized,

    #[error("Missing privilege: {0}")]
    Forbidden(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Session store error")]
    Cache(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_event_id() -> Self {
        AppError::NotFound("Invalid event id".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Ambiguous(_)
            | AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Ambiguous(_) => "AMBIGUOUS_ID",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Cache(_) => "SESSION_STORE_ERROR",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Whether the caller gets to see the message as-is.
    fn is_public(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::Validation(_)
                | AppError::Unauthorized
                | AppError::Forbidden(_)
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if self.is_public() {
            warn!(code = self.code(), "{}", self);
            self.to_string()
        } else {
            match &self {
                AppError::Database(e) => error!(error = ?e, "Database error"),
                AppError::Cache(e) => error!(error = ?e, "Session store error"),
                other => error!(error = ?other, "Application error"),
            }
            "Internal server error".to_string()
        };

        let body = json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}
