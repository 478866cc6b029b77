//! Platform Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("{entity_type} with {field} '{value}' already exists")]
    Duplicate { entity_type: String, field: String, value: String },

    #[error("{message}")]
    Validation { message: String },

    /// Business rule rejection (e.g. deleting a category that is still in use).
    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("File too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("Unsupported file type: {message}")]
    UnsupportedMediaType { message: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Blob store error: {message}")]
    BlobStore { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(entity_type: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn blob_store(message: impl Into<String>) -> Self {
        Self::BlobStore { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Translate a MongoDB duplicate-key write failure into [`PlatformError::Duplicate`].
    ///
    /// The offending field is read from the index name in the server message
    /// (`index: slug_1 dup key: { slug: "..." }`).
    pub fn from_write(entity_type: &str, err: mongodb::error::Error) -> Self {
        if !is_duplicate_key(&err) {
            return Self::Database(err);
        }
        let message = err.to_string();
        let field = message
            .split("index: ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .map(|index| index.trim_end_matches("_1").trim_end_matches("_-1").to_string())
            .unwrap_or_else(|| "unique".to_string());
        let value = message
            .split("dup key: ")
            .nth(1)
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        Self::duplicate(entity_type, field, value)
    }

    fn kind(&self) -> (StatusCode, &'static str) {
        match self {
            PlatformError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            PlatformError::Duplicate { .. } => (StatusCode::BAD_REQUEST, "DUPLICATE"),
            PlatformError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            PlatformError::Conflict { .. } => (StatusCode::BAD_REQUEST, "BUSINESS_RULE"),
            PlatformError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            PlatformError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            PlatformError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            PlatformError::InvalidToken { .. } => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            PlatformError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            PlatformError::PayloadTooLarge { .. } => (StatusCode::BAD_REQUEST, "FILE_TOO_LARGE"),
            PlatformError::UnsupportedMediaType { .. } => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FILE_TYPE"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().0
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Failure envelope body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.kind();

        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed with internal error");
            ErrorResponse {
                success: false,
                message: "Internal server error".to_string(),
                error: Some(self.to_string()),
            }
        } else {
            ErrorResponse {
                success: false,
                message: self.to_string(),
                error: Some(error_type.to_string()),
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PlatformError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PlatformError::conflict("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PlatformError::duplicate("Project", "slug", "a").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(PlatformError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(PlatformError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(PlatformError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(PlatformError::not_found("Banner", "1").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            PlatformError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            PlatformError::duplicate("GinsengProduct", "sku", "GS-1").to_string(),
            "GinsengProduct with sku 'GS-1' already exists"
        );
        assert_eq!(PlatformError::InvalidCredentials.to_string(), "Invalid email or password");
    }
}
