use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use railway_scheduling_core::api;
use railway_scheduling_core::config::AppConfig;
use railway_scheduling_core::metrics::{self, AppMetrics};
use railway_scheduling_core::services::OptimizationService;
use railway_scheduling_core::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(AppConfig::from_env()?);
    config.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(config.logging.level.parse().unwrap_or(tracing::Level::INFO))
        .init();

    info!("starting railway scheduling core");

    let metrics = Arc::new(AppMetrics::new()?);
    info!("metrics system initialized");

    let optimization_service = Arc::new(OptimizationService::new());

    let state = AppState {
        optimization_service,
        config: config.clone(),
        metrics,
    };

    let mut app = Router::new()
        .route("/health", get(api::health_check))
        .nest("/api/v1", api::optimization::routes());

    if state.config.monitoring.prometheus_enabled {
        app = app.route(
            &state.config.monitoring.prometheus_endpoint,
            get(metrics::metrics_handler),
        );
    }

    if state.config.server.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    let bind_address = config.server_bind_address();
    info!(address = %bind_address, "server listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
