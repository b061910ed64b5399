use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::common::{parse_day, quantity_text, ScopeParams};
use crate::errors::ServiceError;
use crate::models::{Actor, CountSession, Location, ProgressMap, SessionKind};
use crate::services::reconciliation::{CountInput, CountOutcome, ResetReport, SessionStatus};
use crate::{ApiResponse, ApiResult, AppState};

/// A scanned count.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct SubmitCountRequest {
    pub barcode: Option<String>,
    /// Whole number of units; sent as a number or a string
    #[schema(value_type = Option<String>, example = "12")]
    pub quantity: Option<Value>,
    /// One of MtD, FtP, HSTD, 3PL
    pub location: Option<String>,
    /// monthly (default) or weekly
    pub kind: Option<SessionKind>,
    /// Monday through Friday, weekly counts only
    pub day: Option<String>,
    #[serde(default)]
    pub actor: Actor,
    /// Answer to a conflict prompt. Omit to be asked; false declines.
    pub confirm_override: Option<bool>,
}

impl SubmitCountRequest {
    fn into_input(self) -> Result<CountInput, ServiceError> {
        let kind = self.kind.unwrap_or(SessionKind::Monthly);
        let location = match (kind, self.location) {
            (SessionKind::Weekly, None) => Some(Location::Hstd.to_string()),
            (_, location) => location,
        };
        Ok(CountInput {
            barcode: self.barcode,
            quantity: quantity_text(self.quantity.as_ref()),
            location,
            kind,
            day: parse_day(self.day.as_deref())?,
            actor: self.actor,
            confirm_override: self.confirm_override,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct StartSessionRequest {
    #[serde(flatten)]
    pub scope: ScopeParams,
    /// Counts the client kept while offline; they win over stored values.
    #[serde(default)]
    pub cached_progress: ProgressMap,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
pub struct SessionListQuery {
    /// monthly (default) or weekly
    pub kind: Option<SessionKind>,
    pub location: Option<String>,
}

/// Submit a scanned count
#[utoipa::path(
    post,
    path = "/api/v1/counts",
    request_body = SubmitCountRequest,
    responses(
        (status = 200, description = "Count accepted", body = ApiResponse<CountOutcome>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Missing or malformed input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Conflicts with another open session, or the override was declined", body = crate::errors::ErrorResponse),
        (status = 422, description = "Quantity does not match stock on hand", body = crate::errors::ErrorResponse),
        (status = 500, description = "Count only partially saved", body = crate::errors::ErrorResponse),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn submit_count(
    State(state): State<AppState>,
    Json(payload): Json<SubmitCountRequest>,
) -> ApiResult<CountOutcome> {
    let input = payload.into_input()?;
    let outcome = state.engine.submit_count(input).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Start or resume the current session of a scope
#[utoipa::path(
    post,
    path = "/api/v1/sessions/start",
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session ready", body = ApiResponse<CountSession>),
        (status = 400, description = "Invalid scope", body = crate::errors::ErrorResponse),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn start_session(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> ApiResult<CountSession> {
    let scope = payload.scope.to_scope()?;
    let session = state
        .engine
        .start_session(scope, payload.cached_progress)
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// Progress of the current session of a scope
#[utoipa::path(
    get,
    path = "/api/v1/sessions/status",
    params(ScopeParams),
    responses(
        (status = 200, description = "Session status", body = ApiResponse<SessionStatus>),
        (status = 400, description = "Invalid scope", body = crate::errors::ErrorResponse),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn session_status(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> ApiResult<SessionStatus> {
    let status = state.engine.session_status(params.to_scope()?).await?;
    Ok(Json(ApiResponse::success(status)))
}

/// Reset the current session of a scope
#[utoipa::path(
    post,
    path = "/api/v1/sessions/reset",
    request_body = ScopeParams,
    responses(
        (status = 200, description = "Session reset", body = ApiResponse<ResetReport>),
        (status = 400, description = "Invalid scope", body = crate::errors::ErrorResponse),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn reset_session(
    State(state): State<AppState>,
    Json(params): Json<ScopeParams>,
) -> ApiResult<ResetReport> {
    let report = state.engine.reset_session(params.to_scope()?).await?;
    info!(session_id = %report.session_id, existed = report.existed, "Reset requested");
    Ok(Json(ApiResponse::success(report)))
}

/// Remove one SKU from the current session of a scope
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/skus/{barcode}",
    params(
        ("barcode" = String, Path, description = "Counted barcode"),
        ScopeParams
    ),
    responses(
        (status = 200, description = "SKU removed", body = ApiResponse<CountSession>),
        (status = 404, description = "No session or SKU not counted", body = crate::errors::ErrorResponse),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn remove_sku(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Query(params): Query<ScopeParams>,
) -> ApiResult<CountSession> {
    let session = state
        .engine
        .remove_sku(params.to_scope()?, barcode.trim())
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// List stored sessions
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    params(SessionListQuery),
    responses(
        (status = 200, description = "Sessions, newest first", body = ApiResponse<Vec<CountSession>>),
        (status = 400, description = "Invalid location", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionListQuery>,
) -> ApiResult<Vec<CountSession>> {
    let location = match query.location.as_deref() {
        Some(raw) => Some(Location::parse(Some(raw))?),
        None => None,
    };
    let sessions = state
        .stores
        .sessions
        .list_sessions(query.kind.unwrap_or(SessionKind::Monthly), location)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(ApiResponse::success(sessions)))
}
