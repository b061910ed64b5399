#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use cyclecount_api::{
    app_router,
    clock::FixedClock,
    config::AppConfig,
    db,
    events::{self, EventSender},
    models::{Component, CountDay, Location},
    stores::{database::DatabaseStore, InventoryStore, Stores},
    AppState,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Wednesday, so weekly sessions of the same week are already open for Monday.
pub fn default_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 14, 30, 0).unwrap()
}

/// Application over an in-memory SQLite database and a settable clock.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<DatabaseStore>,
    pub clock: Arc<FixedClock>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::at(default_now()).await
    }

    pub async fn at(now: DateTime<Utc>) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A second pooled connection would open a separate, empty database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let store = Arc::new(DatabaseStore::new(Arc::new(pool)));
        let clock = Arc::new(FixedClock::new(now));

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(
            cfg,
            Stores::from_shared(store.clone()),
            clock.clone(),
            EventSender::new(event_tx),
        );
        let router = app_router(state.clone());

        Self {
            router,
            state,
            store,
            clock,
            _event_task: event_task,
        }
    }

    /// Sets stock on hand for `barcode` at one location, keeping other locations.
    pub async fn stock(&self, barcode: &str, location: Location, quantity: i32) {
        let component = match self
            .store
            .get_component(barcode)
            .await
            .expect("component lookup failed")
        {
            Some(component) => component.with_quantity(location, quantity),
            None => Component::new_counted(barcode, location, quantity),
        };
        self.store
            .upsert_component(&component)
            .await
            .expect("failed to seed component");
    }

    pub async fn high_volume(&self, barcode: &str, day: CountDay) {
        self.store
            .add_high_volume_sku(barcode, day, Location::Hstd)
            .await
            .expect("failed to seed high-volume sku");
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and returns the status with the parsed JSON body.
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, response_json(response).await)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body was not JSON")
}
