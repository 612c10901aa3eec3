use axum::{http::StatusCode, Json};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    Sqlx(sqlx::Error),
    BadRequest(String),
    Internal(String),
    Configuration(String),
    /// A stored credential that cannot be parsed for verification
    MalformedHash(String),
    /// No connection source is configured, or it has been closed
    Unavailable(String),
    NotSupported(String),
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Sqlx(e) => write!(f, "Database driver error: {}", e),
            AppError::BadRequest(e) => write!(f, "Bad request: {}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AppError::MalformedHash(e) => write!(f, "Malformed password hash: {}", e),
            AppError::Unavailable(e) => write!(f, "Directory unavailable: {}", e),
            AppError::NotSupported(e) => write!(f, "Not supported: {}", e),
            AppError::NotFound(e) => write!(f, "Not found: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Sqlx(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Sqlx(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True for failures that leave the directory unreachable rather than
    /// answering "no such data".
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Sqlx(_) | AppError::Unavailable(_)
        )
    }

    pub fn to_response(&self) -> (StatusCode, Json<serde_json::Value>) {
        let (status, message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
            AppError::Sqlx(e) => {
                tracing::error!("Database driver error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
            AppError::Configuration(e) => {
                tracing::error!("Configuration error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
            AppError::MalformedHash(e) => {
                tracing::error!("Malformed password hash: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
            AppError::Unavailable(e) => (StatusCode::SERVICE_UNAVAILABLE, e.clone()),
            AppError::NotSupported(e) => (StatusCode::NOT_IMPLEMENTED, e.clone()),
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, e.clone()),
        };

        (status, Json(json!({ "error": message })))
    }
}
