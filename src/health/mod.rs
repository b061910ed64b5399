/*!
 * # Health Check Module
 *
 * - Basic health check (`/health`) - Simple up/down status
 * - Readiness check (`/health/ready`) - Pings the configured inventory store
 * - Version (`/health/version`) - Build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

use crate::stores::SkuCatalog;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Readiness report
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Readiness {
    pub ready: bool,
    pub store: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub catalog: Arc<dyn SkuCatalog>,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(catalog: Arc<dyn SkuCatalog>) -> Self {
        Self {
            catalog,
            start_time: SystemTime::now(),
        }
    }

    /// Calculate system uptime
    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    pub async fn readiness(&self) -> Readiness {
        let (store, message) = match self.catalog.ping().await {
            Ok(()) => (HealthStatus::Up, None),
            Err(e) => {
                error!("Inventory store health check failed: {}", e);
                (HealthStatus::Down, Some("Inventory store unreachable".to_string()))
            }
        };
        Readiness {
            ready: store == HealthStatus::Up,
            store,
            message,
            uptime_seconds: self.uptime(),
            timestamp: Utc::now(),
        }
    }
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
    }))
}

/// Liveness: answers as long as the process serves requests
pub async fn health_check() -> impl IntoResponse {
    debug!("Health check endpoint called");

    (
        StatusCode::OK,
        Json(json!({
            "status": HealthStatus::Up,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Readiness check endpoint called");

    let readiness = state.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Creates router with health check endpoints
pub fn health_routes(catalog: Arc<dyn SkuCatalog>) -> Router {
    let health_state = Arc::new(HealthState::new(catalog));

    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/version", get(version_info))
        .with_state(health_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::models::SessionScope;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::collections::BTreeSet;
    use tower::ServiceExt;

    struct Unreachable;

    #[async_trait]
    impl SkuCatalog for Unreachable {
        async fn list_expected_skus(
            &self,
            _scope: &SessionScope,
        ) -> Result<BTreeSet<String>, StoreError> {
            Ok(BTreeSet::new())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Api {
                status: 401,
                message: "token expired".into(),
            })
        }
    }

    #[tokio::test]
    async fn readiness_reports_unreachable_store() {
        let app = health_routes(Arc::new(Unreachable));
        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let readiness: Readiness = serde_json::from_slice(&body).unwrap();
        assert!(!readiness.ready);
        assert_eq!(readiness.store, HealthStatus::Down);
    }

    #[tokio::test]
    async fn liveness_does_not_touch_the_store() {
        let app = health_routes(Arc::new(Unreachable));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
