use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use tracing::{error, info};

use crate::models::api::ScheduleResponse;
use crate::models::input::ScheduleRequest;
use crate::services::ServiceError;
use crate::AppState;

/// Create the optimization routes (spec §6): a single `/schedule` call.
pub fn routes() -> Router<AppState> {
    Router::new().route("/schedule", post(optimize_schedule))
}

/// `POST /schedule` (spec §7): validation and infeasibility are reported as
/// `success: false` on a normal 200 `ScheduleResponse` rather than a bare
/// HTTP error, matching the teacher's
/// `Result<Json<_>, (StatusCode, Json<Value>)>` pattern — only a genuine
/// solver fault takes the `Err` arm and surfaces as a distinct HTTP 500.
pub async fn optimize_schedule(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, (StatusCode, Json<ScheduleResponse>)> {
    let started = std::time::Instant::now();
    info!(trains = request.trains.len(), "received schedule request");

    let result = state.optimization_service.schedule(request).await;
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(response) => {
            state.metrics.record_optimization_request(response.success, elapsed);
            Ok(Json(response))
        }
        Err(ServiceError::Infeasible) => {
            state.metrics.record_optimization_request(false, elapsed);
            Ok(Json(ScheduleResponse::failure(
                "no feasible schedule exists for this input",
            )))
        }
        Err(err @ ServiceError::Validation(_)) => {
            state.metrics.record_optimization_request(false, elapsed);
            Ok(Json(ScheduleResponse::failure(err.to_string())))
        }
        Err(err @ ServiceError::SolverFault(_)) => {
            error!(error = %err, "solver fault");
            state.metrics.record_optimization_request(false, elapsed);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ScheduleResponse::failure(err.to_string())),
            ))
        }
    }
}
