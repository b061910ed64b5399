use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::Display;
use utoipa::ToSchema;

use crate::models::{Location, SessionId};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unprocessable Entity",
    "message": "Quantity does not match. Expected: 8, Entered: 5. Please recount.",
    "details": { "expected": 8, "entered": 5 },
    "request_id": "req-abc123xyz",
    "timestamp": "2026-10-17T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Bad Request", "Conflict")
    #[schema(example = "Unprocessable Entity")]
    pub error: String,
    /// Operator-facing message
    pub message: String,
    /// Structured context for mismatches, conflicts and partial writes
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

/// The open sibling session that already holds a different quantity for a
/// barcode being counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConflictDetail {
    pub barcode: String,
    pub session_id: SessionId,
    /// e.g. "Monday weekly count"
    pub session_label: String,
    pub location: Location,
    pub previous_quantity: i32,
    pub entered_quantity: i32,
}

impl ConflictDetail {
    /// Confirmation prompt shown to the operator.
    pub fn prompt(&self) -> String {
        format!(
            "This SKU was previously counted with a quantity of {} in the {} at {}. Update to {}?",
            self.previous_quantity, self.session_label, self.location, self.entered_quantity
        )
    }
}

/// Writes performed by an accepted count, in the order they are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WriteStep {
    ComponentQuantity,
    SessionProgress,
    MirroredSession,
    HistoryEntry,
}

fn join_steps(steps: &[WriteStep]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures raised by the storage adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Workbook API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Could not decode stored value: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    ValidationError(String),

    #[error("Quantity does not match. Expected: {expected}, Entered: {entered}. Please recount.")]
    QuantityMismatch { expected: i32, entered: i32 },

    #[error("{}", .0.prompt())]
    CountConflict(ConflictDetail),

    #[error("Count not updated. Please recount if necessary.")]
    CountDeclined,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(
        "Count partially saved: {failed} failed after [{}] succeeded: {source}",
        join_steps(.applied)
    )]
    PartialWrite {
        applied: Vec<WriteStep>,
        failed: WriteStep,
        source: StoreError,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        ServiceError::Store(StoreError::Database(err))
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::QuantityMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CountConflict(_) | Self::CountDeclined => StatusCode::CONFLICT,
            Self::NotFound(_) | Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PartialWrite { .. } | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Store internals are replaced by generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::Store(StoreError::NotFound(what)) => format!("Not found: {}", what),
            Self::Store(_) => "Inventory store unavailable. Please try again.".to_string(),
            Self::PartialWrite { applied, failed, .. } => format!(
                "Count was only partially saved ({} saved, {} failed). Check the record before recounting.",
                join_steps(applied),
                failed
            ),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Structured body context, when the operator needs more than the message.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::QuantityMismatch { expected, entered } => {
                Some(json!({ "expected": expected, "entered": entered }))
            }
            Self::CountConflict(detail) => serde_json::to_value(detail).ok(),
            Self::PartialWrite {
                applied, failed, ..
            } => Some(json!({ "applied": applied, "failed": failed })),
            _ => None,
        }
    }

    /// Whether the count was rejected before anything was written.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::QuantityMismatch { .. }
                | Self::CountConflict(_)
                | Self::CountDeclined
        )
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
