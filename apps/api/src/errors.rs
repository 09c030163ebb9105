use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;
use crate::store::StoreError;

pub const FILE_NOT_FOUND: &str = "File not found.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every response body has the shape `{"detail": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Extraction failure: {0}")]
    ExtractionFailure(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Quota error: {0}")]
    Quota(String),

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedMediaType { .. } => {
                AppError::UnsupportedMediaType(err.to_string())
            }
            other => AppError::ExtractionFailure(other.to_string()),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Quota { .. } => AppError::Quota(err.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(FILE_NOT_FOUND.to_string()),
            other => AppError::Store(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::PasswordMismatch | AuthError::InvalidEmail(_) => {
                AppError::Validation(err.to_string())
            }
            AuthError::UsernameTaken => AppError::Conflict(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken(_)
            | AuthError::Revoked => AppError::Unauthorized(err.to_string()),
            AuthError::Store(e) => AppError::Store(e.to_string()),
            AuthError::Revocation(msg) | AuthError::Hashing(msg) | AuthError::Signing(msg) => {
                AppError::Internal(anyhow::anyhow!(msg))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::UnsupportedMediaType(msg) | AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ExtractionFailure(msg) => {
                tracing::error!("Extraction failure: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Upstream(msg) => {
                tracing::error!("LLM upstream error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The language model request failed".to_string(),
                )
            }
            AppError::Quota(msg) => {
                tracing::error!("LLM quota error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The language model quota is exhausted, try again later".to_string(),
                )
            }
            AppError::Store(msg) => {
                tracing::error!("Store error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_file_not_found() {
        let err: AppError = StoreError::NotFound.into();
        assert!(matches!(err, AppError::NotFound(ref m) if m == FILE_NOT_FOUND));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_quota_is_distinguished_from_upstream() {
        let quota: AppError = LlmError::Quota { attempts: 3 }.into();
        assert!(matches!(quota, AppError::Quota(_)));

        let upstream: AppError = LlmError::Api {
            status: 429,
            message: "rate limited".to_string(),
        }
        .into();
        assert!(matches!(upstream, AppError::Upstream(_)));
    }

    #[test]
    fn test_media_type_error_is_client_error() {
        let err: AppError = ExtractionError::UnsupportedMediaType {
            document: "resume_file",
            found: "text/plain".to_string(),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_errors_map_to_expected_status() {
        let conflict: AppError = AuthError::UsernameTaken.into();
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let mismatch: AppError = AuthError::PasswordMismatch.into();
        assert_eq!(mismatch.into_response().status(), StatusCode::BAD_REQUEST);

        let revoked: AppError = AuthError::Revoked.into();
        assert_eq!(revoked.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
