//! API Error Taxonomy
//! Mission: One explicit error kind per failure, one HTTP status per kind

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::error;

/// Field name -> human readable validation message
pub type FieldErrors = BTreeMap<String, String>;

/// Record kinds that can be missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Note,
    User,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Note => "Note",
            Resource::User => "User",
        }
    }
}

/// Every failure an operation can surface to a caller
#[derive(Debug)]
pub enum AppError {
    InvalidCredentials,
    Unauthorized,
    Forbidden,
    NotFound(Resource),
    DuplicateUsername,
    UnknownRole(String),
    BadRequest(String),
    Validation(FieldErrors),
    Internal(anyhow::Error),
}

/// Uniform JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub timestamp: i64,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateUsername
            | AppError::UnknownRole(_)
            | AppError::BadRequest(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidCredentials => write!(f, "Invalid username or password"),
            AppError::Unauthorized => {
                write!(f, "Authentication required to access this resource")
            }
            AppError::Forbidden => {
                write!(f, "You do not have permission to perform this action")
            }
            AppError::NotFound(resource) => write!(f, "{} not found", resource.as_str()),
            AppError::DuplicateUsername => write!(f, "Username already exists"),
            AppError::UnknownRole(name) => write!(f, "Role not found: {}", name),
            AppError::BadRequest(message) => write!(f, "{}", message),
            AppError::Validation(fields) => write!(f, "Validation failed on {} field(s)", fields.len()),
            AppError::Internal(_) => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            AppError::Validation(fields) => (status, Json(fields)).into_response(),
            AppError::Internal(err) => {
                error!("Internal error: {:#}", err);
                let reason = status.canonical_reason().unwrap_or("Error");
                (status, Json(ErrorBody::new(reason, "Internal server error"))).into_response()
            }
            other => {
                let reason = status.canonical_reason().unwrap_or("Error");
                (status, Json(ErrorBody::new(reason, other.to_string()))).into_response()
            }
        }
    }
}
