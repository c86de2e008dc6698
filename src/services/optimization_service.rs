use tracing::info;

use crate::core::{self, CoreError, PerformanceMonitor};
use crate::models::api::ScheduleResponse;
use crate::models::input::{ScheduleRequest, SolverConfig, Track, Train, ValidatedModel};

use super::{Service, ServiceError, ServiceResult};

/// Owns the Performance Monitor and drives the core (spec §4.5, §4.7) the
/// way the source's `OptimizationService` owned its gRPC client manager.
#[derive(Debug, Default)]
pub struct OptimizationService {
    monitor: PerformanceMonitor,
}

impl OptimizationService {
    pub fn new() -> Self {
        Self {
            monitor: PerformanceMonitor::new(),
        }
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Validates, solves, and turns the outcome into the wire response.
    /// Validation failures are reported, not raised, per spec §7: the
    /// caller always gets a `ScheduleResponse` body.
    pub async fn schedule(&self, request: ScheduleRequest) -> ServiceResult<ScheduleResponse> {
        info!(
            trains = request.trains.len(),
            tracks = request.tracks.len(),
            "received schedule request"
        );

        let model = match self.build_model(request.clone()) {
            Ok(model) => model,
            Err(err) => return Ok(ScheduleResponse::failure(err.to_string())),
        };

        let warm_start = request.warm_start_solution.as_deref();

        let outcome = tokio::task::block_in_place(|| {
            core::optimize(&model, warm_start, &self.monitor)
        });

        match outcome {
            Ok(outcome) => {
                info!(
                    status = ?outcome.status,
                    conflicts_resolved = outcome.metrics.conflicts_resolved,
                    "solve completed"
                );
                Ok(ScheduleResponse {
                    success: true,
                    optimized_schedule: outcome.schedule,
                    objective_value: outcome.metrics.objective_value,
                    solve_time_seconds: outcome.solve_time_seconds,
                    conflicts_resolved: outcome.metrics.conflicts_resolved,
                    total_delay_minutes: outcome.metrics.total_delay_minutes,
                    message: None,
                })
            }
            Err(CoreError::Infeasible) => Err(ServiceError::Infeasible),
            Err(CoreError::SolverFault) => {
                Err(ServiceError::SolverFault("solver returned UNKNOWN".to_string()))
            }
        }
    }

    fn build_model(&self, request: ScheduleRequest) -> Result<ValidatedModel, ServiceError> {
        let ScheduleRequest {
            trains,
            tracks,
            conflicts,
            time_horizon_minutes,
            advanced,
            ..
        } = request;

        self.validate_shape(&trains, &tracks)?;

        let config = SolverConfig {
            time_horizon_minutes,
            ..SolverConfig::default()
        };

        ValidatedModel::build_with_advanced(trains, tracks, conflicts, config, advanced)
            .map_err(|e| ServiceError::Validation(e.to_string()))
    }

    fn validate_shape(&self, trains: &[Train], tracks: &[Track]) -> ServiceResult<()> {
        if trains.is_empty() {
            return Err(ServiceError::Validation(
                "at least one train is required".to_string(),
            ));
        }
        if tracks.is_empty() {
            return Err(ServiceError::Validation(
                "at least one track segment is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl Service for OptimizationService {
    fn name(&self) -> &'static str {
        "OptimizationService"
    }
}
