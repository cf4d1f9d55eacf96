//! Error types for the determination API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reportability_engine::{DeterminationError, INCOMPLETE_MESSAGE};
use serde_json::json;
use shared_types::audit::AuditError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error(transparent)]
    Determination(#[from] DeterminationError),

    #[error("Report {0} changed concurrently; retry")]
    ConcurrentUpdate(String),

    #[error("Stored report {id} is unreadable: {reason}")]
    CorruptReport { id: String, reason: String },

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn corrupt(id: &str, reason: impl ToString) -> Self {
        ApiError::CorruptReport {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::ReportNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Report not found: {}", id))
            }
            ApiError::Determination(DeterminationError::Incomplete { .. }) => {
                (StatusCode::BAD_REQUEST, INCOMPLETE_MESSAGE.to_string())
            }
            ApiError::Determination(e @ DeterminationError::AlreadyDetermined { .. }) => {
                (StatusCode::CONFLICT, e.to_string())
            }
            ApiError::ConcurrentUpdate(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::CorruptReport { .. } | ApiError::Audit(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
