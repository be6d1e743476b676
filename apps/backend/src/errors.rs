use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum ScoreboardError {
    // Business logic errors (4xx)
    #[error("Session '{code}' does not exist")]
    SessionNotFound { code: String },

    #[error("Session '{code}' already exists")]
    SessionAlreadyExists { code: String },

    #[error("Invalid session code: {message}")]
    InvalidSessionCode { message: String },

    #[error("Unknown field '{field}'")]
    UnknownField { field: String },

    #[error("Field '{field}' cannot be updated")]
    ReadOnlyField { field: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidFieldValue { field: String, message: String },

    #[error("Update contains no fields")]
    EmptyUpdate,

    #[error("Malformed request: {message}")]
    InvalidRequest { message: String },

    // Infrastructure errors (5xx) - auto-converted
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ScoreboardError>;

/// Coarse classification used by callers that only care about the outcome class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Internal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ScoreboardError {
    pub(crate) fn invalid_value(field: &str, message: impl Into<String>) -> Self {
        ScoreboardError::InvalidFieldValue {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoreboardError::SessionNotFound { .. } => ErrorKind::NotFound,
            ScoreboardError::SessionAlreadyExists { .. } => ErrorKind::Conflict,
            ScoreboardError::InvalidSessionCode { .. }
            | ScoreboardError::UnknownField { .. }
            | ScoreboardError::ReadOnlyField { .. }
            | ScoreboardError::InvalidFieldValue { .. }
            | ScoreboardError::EmptyUpdate
            | ScoreboardError::InvalidRequest { .. } => ErrorKind::Validation,
            ScoreboardError::Database(_) => ErrorKind::Internal,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ScoreboardError::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            ScoreboardError::SessionAlreadyExists { .. } => "SESSION_ALREADY_EXISTS",
            ScoreboardError::InvalidSessionCode { .. } => "INVALID_SESSION_CODE",
            ScoreboardError::UnknownField { .. } => "UNKNOWN_FIELD",
            ScoreboardError::ReadOnlyField { .. } => "READ_ONLY_FIELD",
            ScoreboardError::InvalidFieldValue { .. } => "INVALID_FIELD_VALUE",
            ScoreboardError::EmptyUpdate => "EMPTY_UPDATE",
            ScoreboardError::InvalidRequest { .. } => "INVALID_REQUEST",
            ScoreboardError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client; infrastructure details stay in the log
    pub fn public_message(&self) -> String {
        match self {
            ScoreboardError::Database(e) => {
                log::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<JsonRejection> for ScoreboardError {
    fn from(rejection: JsonRejection) -> Self {
        ScoreboardError::InvalidRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<serde_json::Error> for ScoreboardError {
    fn from(e: serde_json::Error) -> Self {
        ScoreboardError::InvalidRequest {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ScoreboardError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(ErrorResponse {
            error: self.public_message(),
            code: self.error_code().to_string(),
        });

        (status, body).into_response()
    }
}
