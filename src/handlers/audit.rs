use axum::{
    extract::{Query, State},
    Json,
};

use super::common::LocationQuery;
use crate::services::audit::{AuditPage, AuditQuery};
use crate::{ApiResponse, ApiResult, AppState};

/// Audit trail for a location
#[utoipa::path(
    get,
    path = "/api/v1/audit",
    params(LocationQuery, AuditQuery),
    responses(
        (status = 200, description = "One page of audit events, newest first", body = ApiResponse<AuditPage>),
        (status = 400, description = "Invalid location", body = crate::errors::ErrorResponse),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "audit"
)]
pub async fn audit_trail(
    State(state): State<AppState>,
    Query(location): Query<LocationQuery>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<AuditPage> {
    let page = state.audit.trail(location.location()?, &query).await?;
    Ok(Json(ApiResponse::success(page)))
}
