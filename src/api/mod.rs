use axum::response::Json;

pub mod optimization;

pub async fn health_check(
    axum::extract::State(state): axum::extract::State<crate::AppState>,
) -> Json<crate::models::api::HealthResponse> {
    Json(crate::models::api::HealthResponse {
        status: "healthy",
        solver: state.config.server.solver_label.clone(),
        optimizer_ready: true,
    })
}
