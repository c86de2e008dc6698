//! Response-side records: schedule entries, solve outcome, and the metrics
//! bundle returned to the caller (spec §4.6, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub train_id: String,
    pub segment_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SolverStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

impl SolverStatus {
    pub fn has_assignment(&self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveMetrics {
    pub objective_value: f64,
    pub total_delay_minutes: u64,
    pub conflicts_resolved: u32,
    pub mean_delay_minutes: f64,
    pub mean_completion_tick: f64,
}

/// Internal bundle produced by the Extractor before the HTTP layer turns it
/// into a [`crate::models::api::ScheduleResponse`]; mirrors the source's
/// `OptimizationResult` (`original_source/opt-engine/src/schemas.py`).
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolverStatus,
    pub schedule: Vec<ScheduleEntry>,
    pub metrics: SolveMetrics,
    pub solve_time_seconds: f64,
}
