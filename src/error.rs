use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::Environment;
use crate::domain::services::token_service::TokenError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid input: {}", .0.join(". "))]
    ValidationErrors(Vec<String>),
    #[error("Rate limited: {message}")]
    RateLimited { message: String, retry_after_secs: u64 },
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

const MASKED_MESSAGE: &str = "Something went wrong!";

impl AppError {
    /// Status, client message and whether the error is an expected (operational) one.
    pub fn classify(&self) -> (StatusCode, String, bool) {
        match self {
            AppError::Database(e) => classify_database(e),
            AppError::Token(TokenError::Expired) => (
                StatusCode::UNAUTHORIZED,
                "Your session has expired. Please log in again.".to_string(),
                true,
            ),
            AppError::Token(TokenError::Invalid(_)) => (
                StatusCode::UNAUTHORIZED,
                "Invalid token. Please log in again.".to_string(),
                true,
            ),
            AppError::Token(TokenError::Signing(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to sign token".to_string(), false)
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), true),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), true),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), true),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), true),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), true),
            AppError::ValidationErrors(msgs) => (StatusCode::BAD_REQUEST, format!("Invalid input data. {}", msgs.join(". ")), true),
            AppError::RateLimited { message, .. } => (StatusCode::TOO_MANY_REQUESTS, message.clone(), true),
            AppError::InternalWithMsg(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), false),
        }
    }
}

fn classify_database(e: &sqlx::Error) -> (StatusCode, String, bool) {
    match e {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "Record not found.".to_string(), true),
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::UniqueViolation => (
                StatusCode::CONFLICT,
                format!("Duplicate value for {}. Please use another value.", duplicate_target(&**db_err)),
                true,
            ),
            ErrorKind::ForeignKeyViolation => (
                StatusCode::BAD_REQUEST,
                "Invalid reference: related record does not exist.".to_string(),
                true,
            ),
            ErrorKind::NotNullViolation => (StatusCode::BAD_REQUEST, "Missing required field.".to_string(), true),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, db_err.message().to_string(), false),
        },
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string(), false),
    }
}

// Postgres reports the constraint name; SQLite only "UNIQUE constraint failed: table.column".
fn duplicate_target(db_err: &dyn DatabaseError) -> String {
    if let Some(constraint) = db_err.constraint() {
        return constraint.to_string();
    }
    db_err
        .message()
        .rsplit_once("failed: ")
        .map(|(_, target)| target.to_string())
        .unwrap_or_else(|| "field".to_string())
}

/// Error details kept on the response so the normalization layer can render
/// the development shape without re-classifying.
#[derive(Clone, Debug)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub stack: String,
    pub operational: bool,
}

impl ErrorReport {
    pub fn body(&self, environment: Environment) -> Value {
        match environment {
            Environment::Production => {
                let message = if self.operational { self.message.as_str() } else { MASKED_MESSAGE };
                json!({ "success": false, "message": message })
            }
            Environment::Development => json!({
                "success": false,
                "error": {
                    "message": self.message,
                    "stack": self.stack,
                    "statusCode": self.status.as_u16(),
                    "status": if self.status.is_client_error() { "fail" } else { "error" },
                }
            }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, operational) = self.classify();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "request failed");
        } else {
            warn!(status = status.as_u16(), %message, "request rejected");
        }

        let report = ErrorReport {
            status,
            message,
            stack: format!("{:?}", self),
            operational,
        };

        let mut response = (status, Json(report.body(Environment::Production))).into_response();

        if let AppError::RateLimited { retry_after_secs, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response.extensions_mut().insert(report);
        response
    }
}
