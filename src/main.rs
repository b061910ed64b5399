use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing::{error, info, warn};

use cyclecount_api as api;
use api::clock::SystemClock;
use api::config::{AppConfig, StoreBackend};
use api::stores::{database::DatabaseStore, workbook::WorkbookStore, Stores};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let stores = build_stores(&cfg).await?;

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    let cors_layer = build_cors(&cfg)?;
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    let app_state = api::AppState::new(cfg, stores, Arc::new(SystemClock), event_sender);
    let app = api::app_router(app_state)
        .layer(CompressionLayer::new())
        .layer(cors_layer);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("cyclecount-api listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("cyclecount-api stopped");
    Ok(())
}

async fn build_stores(cfg: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    match cfg.store_backend() {
        StoreBackend::Database => {
            let db_pool = api::db::establish_connection_from_app_config(cfg).await?;
            if cfg.auto_migrate {
                api::db::run_migrations(&db_pool).await.map_err(|e| {
                    error!("Failed running migrations: {}", e);
                    e
                })?;
            }
            info!("Using database store backend");
            Ok(Stores::from_shared(Arc::new(DatabaseStore::new(Arc::new(
                db_pool,
            )))))
        }
        StoreBackend::Workbook => {
            let store = WorkbookStore::from_config(&cfg.workbook)?;
            info!(api_base = %cfg.workbook.api_base, "Using workbook store backend");
            Ok(Stores::from_shared(Arc::new(store)))
        }
    }
}

fn build_cors(cfg: &AppConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        Err("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true".into())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
