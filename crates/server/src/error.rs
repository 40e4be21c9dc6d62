use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Every failure a handler can report. Rendered as `{ "message", "error"? }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    SelfActionForbidden(String),

    #[error("{0}")]
    PrivilegedTargetForbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("This task has already been assigned to a user. Please unassign first before reassigning.")]
    AlreadyAssigned,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InvalidCredentials
            | AppError::SelfActionForbidden(_)
            | AppError::PrivilegedTargetForbidden(_)
            | AppError::Conflict(_)
            | AppError::AlreadyAssigned => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("User already exists".to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                ErrorBody {
                    message: "Server error".to_string(),
                    error: Some(err.to_string()),
                }
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorBody {
                    message: "Server error".to_string(),
                    error: Some(msg.clone()),
                }
            }
            other => ErrorBody {
                message: other.to_string(),
                error: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
