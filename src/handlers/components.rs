use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::LocationQuery;
use crate::errors::ServiceError;
use crate::models::{Component, Location};
use crate::{ApiResponse, ApiResult, AppState};

/// A component with the quantity on hand at the requested location.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComponentStock {
    pub barcode: String,
    pub description: String,
    pub location: Location,
    pub quantity: i32,
    pub total_quantity: i32,
}

impl ComponentStock {
    fn at(component: Component, location: Location) -> Self {
        Self {
            quantity: component.quantity_at(location),
            barcode: component.barcode,
            description: component.description,
            location,
            total_quantity: component.total_quantity,
        }
    }
}

/// Components with their stock at one location
#[utoipa::path(
    get,
    path = "/api/v1/components",
    params(LocationQuery),
    responses(
        (status = 200, description = "Components, ordered by barcode", body = ApiResponse<Vec<ComponentStock>>),
        (status = 400, description = "Invalid location", body = crate::errors::ErrorResponse),
        (status = 503, description = "Inventory store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "components"
)]
pub async fn list_components(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<Vec<ComponentStock>> {
    let location = query.location()?;
    let components = state
        .stores
        .inventory
        .list_components()
        .await
        .map_err(ServiceError::from)?
        .into_iter()
        .map(|component| ComponentStock::at(component, location))
        .collect();
    Ok(Json(ApiResponse::success(components)))
}
