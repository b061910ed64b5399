//! Cycle Count API Library
//!
//! Barcode-driven inventory cycle counts across multiple stock locations:
//! reconciliation of scanned quantities, monthly and weekly count sessions,
//! count history and the read models built on top of them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod stores;
pub mod tracing;

use axum::{
    response::Json,
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::services::{AuditService, DashboardService, HistoryService, ReconciliationEngine};
use crate::stores::Stores;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub stores: Stores,
    pub event_sender: events::EventSender,
    pub engine: Arc<ReconciliationEngine>,
    pub history: Arc<HistoryService>,
    pub audit: Arc<AuditService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    /// Wires every service over one set of collaborators.
    pub fn new(
        config: config::AppConfig,
        stores: Stores,
        clock: Arc<dyn Clock>,
        event_sender: events::EventSender,
    ) -> Self {
        let engine = Arc::new(ReconciliationEngine::new(
            stores.clone(),
            clock.clone(),
            event_sender.clone(),
        ));
        let history = Arc::new(HistoryService::new(stores.history.clone(), clock));
        let audit = Arc::new(AuditService::new(
            stores.history.clone(),
            stores.sessions.clone(),
        ));
        let dashboard = Arc::new(DashboardService::new(
            stores.history.clone(),
            stores.sessions.clone(),
        ));
        Self {
            config,
            stores,
            event_sender,
            engine,
            history,
            audit,
            dashboard,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let counts = Router::new().route("/counts", post(handlers::counts::submit_count));

    let sessions = Router::new()
        .route("/sessions", get(handlers::counts::list_sessions))
        .route("/sessions/start", post(handlers::counts::start_session))
        .route("/sessions/status", get(handlers::counts::session_status))
        .route("/sessions/reset", post(handlers::counts::reset_session))
        .route(
            "/sessions/skus/:barcode",
            delete(handlers::counts::remove_sku),
        );

    let history = Router::new()
        .route("/history", get(handlers::history::search_history))
        .route(
            "/history/monthly/:barcode",
            get(handlers::history::monthly_sku_history)
                .delete(handlers::history::clear_monthly_sku_history),
        );

    let reads = Router::new()
        .route("/audit", get(handlers::audit::audit_trail))
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/components", get(handlers::components::list_components));

    Router::new()
        .merge(counts)
        .merge(sessions)
        .merge(history)
        .merge(reads)
}

/// Full application router: API, health endpoints, Swagger UI and the
/// request-id and tracing layers.
pub fn app_router(state: AppState) -> Router {
    let health = health::health_routes(state.stores.catalog.clone());

    Router::new()
        .route("/", get(|| async { "cyclecount-api up" }))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .nest("/health", health)
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}

pub mod prelude {
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::models::*;
    pub use crate::stores::*;
}
