//! The wire contract of spec §6, kept separate from the internal
//! [`crate::models::schedule::SolveOutcome`] so the HTTP shape can flex
//! independently of the solver's internal bookkeeping.

use serde::{Deserialize, Serialize};

use super::schedule::ScheduleEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub success: bool,
    pub optimized_schedule: Vec<ScheduleEntry>,
    pub objective_value: f64,
    pub solve_time_seconds: f64,
    pub conflicts_resolved: u32,
    pub total_delay_minutes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScheduleResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            optimized_schedule: Vec::new(),
            objective_value: 0.0,
            solve_time_seconds: 0.0,
            conflicts_resolved: 0,
            total_delay_minutes: 0,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub solver: String,
    pub optimizer_ready: bool,
}
