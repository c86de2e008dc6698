pub mod api;
pub mod config;
pub mod core;
pub mod metrics;
pub mod models;
pub mod services;

use std::sync::Arc;

use config::AppConfig;
use metrics::AppMetrics;
use services::OptimizationService;

/// Shared application state, handed to every handler via axum's `State`.
#[derive(Clone)]
pub struct AppState {
    pub optimization_service: Arc<OptimizationService>,
    pub config: Arc<AppConfig>,
    pub metrics: Arc<AppMetrics>,
}
