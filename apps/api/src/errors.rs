use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::{LlmError, UpstreamKind};
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Upstream(#[from] LlmError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Upstream(e) => match e.kind() {
                UpstreamKind::QuotaExceeded | UpstreamKind::RateLimited => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                UpstreamKind::AccessDenied => StatusCode::FORBIDDEN,
                UpstreamKind::InvalidApiKey | UpstreamKind::NotConfigured | UpstreamKind::Other => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", format!("Unauthorized: {msg}")),
            AppError::Forbidden(msg) => ("FORBIDDEN", format!("Forbidden: {msg}")),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                ("STORE_ERROR", "A database error occurred".to_string())
            }
            AppError::Upstream(e) => {
                tracing::error!("LLM error: {e}");
                let kind = e.kind();
                (kind.code(), kind.public_message().to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, code: Option<&str>) -> AppError {
        AppError::Upstream(LlmError::Api {
            status,
            code: code.map(str::to_string),
            message: "upstream said no".to_string(),
        })
    }

    #[test]
    fn test_upstream_errors_map_to_documented_statuses() {
        assert_eq!(
            api_error(429, Some("insufficient_quota")).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            api_error(429, Some("rate_limit_exceeded")).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(api_error(403, None).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            api_error(401, Some("invalid_api_key")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Upstream(LlmError::NotConfigured).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_is_bad_request() {
        let response = AppError::Validation("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
