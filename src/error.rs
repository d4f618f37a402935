//! Error types for the visitor export server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Failure kinds reported by the export pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConfigurationError,
    ConnectionError,
    AuthenticationError,
    TransferError,
    GenerationError,
    EncodingError,
}

impl FailureKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            FailureKind::GenerationError => StatusCode::BAD_REQUEST,
            FailureKind::ConfigurationError | FailureKind::EncodingError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            FailureKind::ConnectionError
            | FailureKind::AuthenticationError
            | FailureKind::TransferError => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Export pipeline error, one variant per failing stage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("FTP configuration invalid: {0}")]
    Configuration(String),

    #[error("FTP connection failed: {0}")]
    Connection(String),

    #[error("FTP login rejected: {0}")]
    Authentication(String),

    #[error("FTP transfer failed: {0}")]
    Transfer(String),

    #[error("Invalid sample window: {0}")]
    Generation(String),

    #[error("CSV encoding failed: {0}")]
    Encoding(String),
}

impl ExportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExportError::Configuration(_) => FailureKind::ConfigurationError,
            ExportError::Connection(_) => FailureKind::ConnectionError,
            ExportError::Authentication(_) => FailureKind::AuthenticationError,
            ExportError::Transfer(_) => FailureKind::TransferError,
            ExportError::Generation(_) => FailureKind::GenerationError,
            ExportError::Encoding(_) => FailureKind::EncodingError,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal".to_string(),
                    "Internal server error".to_string(),
                )
            }
            AppError::Export(e) => {
                let kind = e.kind();
                let error = serde_json::to_value(kind)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| format!("{:?}", kind));
                (kind.status_code(), error, e.to_string())
            }
        };

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ExportError::Configuration("x".into()).kind(),
            FailureKind::ConfigurationError
        );
        assert_eq!(
            ExportError::Authentication("x".into()).kind().status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ExportError::Generation("x".into()).kind().status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let value = serde_json::to_value(FailureKind::TransferError).unwrap();
        assert_eq!(value, "transfer_error");
    }
}
