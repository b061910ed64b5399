use axum::{
    extract::{Query, State},
    Json,
};

use super::common::LocationQuery;
use crate::services::dashboard::DashboardSummary;
use crate::{ApiResponse, ApiResult, AppState};

/// Dashboard aggregates; weekly trends are for the selected location
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    params(LocationQuery),
    responses(
        (status = 200, description = "Dashboard data", body = ApiResponse<DashboardSummary>),
        (status = 400, description = "Invalid location", body = crate::errors::ErrorResponse),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<DashboardSummary> {
    let summary = state.dashboard.summary(query.location()?).await?;
    Ok(Json(ApiResponse::success(summary)))
}
