use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::Response};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

use crate::AppState;

/// Optimizer-only metrics collection. The HTTP intake layer, database, and
/// websocket metrics the source also tracked are out of scope (spec §1).
#[derive(Debug, Clone)]
pub struct AppMetrics {
    pub optimization_requests_total: IntCounter,
    pub optimization_duration: Histogram,
    pub optimization_success_total: IntCounter,
    pub optimization_failures_total: IntCounter,

    pub registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let optimization_requests_total = IntCounter::with_opts(Opts::new(
            "optimization_requests_total",
            "Total number of schedule optimization requests",
        ))?;
        let optimization_duration = Histogram::with_opts(HistogramOpts::new(
            "optimization_duration_seconds",
            "Schedule optimization solve duration",
        ))?;
        let optimization_success_total = IntCounter::with_opts(Opts::new(
            "optimization_success_total",
            "Total number of optimizations returning OPTIMAL or FEASIBLE",
        ))?;
        let optimization_failures_total = IntCounter::with_opts(Opts::new(
            "optimization_failures_total",
            "Total number of optimizations returning an error",
        ))?;

        registry.register(Box::new(optimization_requests_total.clone()))?;
        registry.register(Box::new(optimization_duration.clone()))?;
        registry.register(Box::new(optimization_success_total.clone()))?;
        registry.register(Box::new(optimization_failures_total.clone()))?;

        Ok(Self {
            optimization_requests_total,
            optimization_duration,
            optimization_success_total,
            optimization_failures_total,
            registry,
        })
    }

    /// Record one `/schedule` call.
    pub fn record_optimization_request(&self, success: bool, duration_seconds: f64) {
        self.optimization_requests_total.inc();
        self.optimization_duration.observe(duration_seconds);

        if success {
            self.optimization_success_total.inc();
        } else {
            self.optimization_failures_total.inc();
        }
    }
}

/// Prometheus text-exposition metrics endpoint handler.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response<String>, StatusCode> {
    let metric_families = state.metrics.registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let body = String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; version=0.0.4")
        .body(body)
        .unwrap())
}
