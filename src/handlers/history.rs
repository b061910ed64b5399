use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::LocationQuery;
use crate::models::{HistoryEntry, HistoryFilter};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClearHistoryResponse {
    pub barcode: String,
    pub deleted: u64,
}

/// Search count history
#[utoipa::path(
    get,
    path = "/api/v1/history",
    params(HistoryFilter),
    responses(
        (status = 200, description = "Matching entries, newest first", body = ApiResponse<Vec<HistoryEntry>>),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "history"
)]
pub async fn search_history(
    State(state): State<AppState>,
    Query(filter): Query<HistoryFilter>,
) -> ApiResult<Vec<HistoryEntry>> {
    let entries = state.history.search(&filter).await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// This month's scans of one SKU at a location
#[utoipa::path(
    get,
    path = "/api/v1/history/monthly/{barcode}",
    params(
        ("barcode" = String, Path, description = "Barcode"),
        LocationQuery
    ),
    responses(
        (status = 200, description = "Entries, newest first", body = ApiResponse<Vec<HistoryEntry>>),
        (status = 400, description = "Invalid location", body = crate::errors::ErrorResponse)
    ),
    tag = "history"
)]
pub async fn monthly_sku_history(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<Vec<HistoryEntry>> {
    let entries = state
        .history
        .monthly_for_sku(&barcode, query.location()?)
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// Clear this month's scans of one SKU at a location
#[utoipa::path(
    delete,
    path = "/api/v1/history/monthly/{barcode}",
    params(
        ("barcode" = String, Path, description = "Barcode"),
        LocationQuery
    ),
    responses(
        (status = 200, description = "History cleared", body = ApiResponse<ClearHistoryResponse>),
        (status = 400, description = "Invalid location", body = crate::errors::ErrorResponse)
    ),
    tag = "history"
)]
pub async fn clear_monthly_sku_history(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<ClearHistoryResponse> {
    let deleted = state
        .history
        .clear_monthly_for_sku(&barcode, query.location()?)
        .await?;
    Ok(Json(ApiResponse::success(ClearHistoryResponse {
        barcode,
        deleted,
    })))
}
