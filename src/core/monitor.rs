//! Performance Monitor (spec §4.7): a bounded ring of the most recent 100
//! solve runs.
//!
//! Grounded on `original_source/opt-engine/src/performance_monitor.py`
//! (`PerformanceMonitor`, `get_performance_summary`, `export_metrics`).

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::schedule::SolverStatus;

const RING_CAPACITY: usize = 100;
const SUMMARY_WINDOW: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub solve_seconds: f64,
    pub objective_value: f64,
    pub train_count: usize,
    pub track_count: usize,
    pub conflict_count: usize,
    pub conflicts_resolved: u32,
    pub total_delay_minutes: u64,
    pub status: SolverStatus,
    pub variable_count: Option<usize>,
    pub constraint_count: Option<usize>,
    pub memory_mb: Option<f64>,
    pub cpu_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub runs_considered: usize,
    pub success_rate: f64,
    pub mean_solve_seconds: f64,
    pub mean_objective_value: f64,
    pub mean_total_delay_minutes: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub total_runs: usize,
    pub summary: PerformanceSummary,
    pub runs: Vec<RunRecord>,
}

/// In-progress run, returned by [`PerformanceMonitor::start`] and completed
/// by [`PerformanceMonitor::end`].
pub struct RunHandle {
    started_at: DateTime<Utc>,
    train_count: usize,
    track_count: usize,
    conflict_count: usize,
    variable_count: Option<usize>,
    constraint_count: Option<usize>,
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    runs: Mutex<VecDeque<RunRecord>>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
        }
    }

    pub fn start(
        &self,
        train_count: usize,
        track_count: usize,
        conflict_count: usize,
        variable_count: Option<usize>,
        constraint_count: Option<usize>,
    ) -> RunHandle {
        RunHandle {
            started_at: Utc::now(),
            train_count,
            track_count,
            conflict_count,
            variable_count,
            constraint_count,
        }
    }

    pub fn end(
        &self,
        handle: RunHandle,
        objective_value: f64,
        conflicts_resolved: u32,
        total_delay_minutes: u64,
        solve_seconds: f64,
        status: SolverStatus,
    ) {
        let record = RunRecord {
            started_at: handle.started_at,
            ended_at: Utc::now(),
            solve_seconds,
            objective_value,
            train_count: handle.train_count,
            track_count: handle.track_count,
            conflict_count: handle.conflict_count,
            conflicts_resolved,
            total_delay_minutes,
            status,
            variable_count: handle.variable_count,
            constraint_count: handle.constraint_count,
            memory_mb: None,
            cpu_percent: None,
        };

        let mut runs = self.runs.lock().expect("performance monitor mutex poisoned");
        if runs.len() == RING_CAPACITY {
            runs.pop_front();
        }
        runs.push_back(record);
    }

    pub fn summary(&self) -> PerformanceSummary {
        let runs = self.runs.lock().expect("performance monitor mutex poisoned");
        let window: Vec<&RunRecord> = runs.iter().rev().take(SUMMARY_WINDOW).collect();
        summarize(&window)
    }

    pub fn detailed(&self) -> Vec<RunRecord> {
        let runs = self.runs.lock().expect("performance monitor mutex poisoned");
        runs.iter().cloned().collect()
    }

    fn export_document(&self) -> ExportDocument {
        let runs = self.runs.lock().expect("performance monitor mutex poisoned");
        let refs: Vec<&RunRecord> = runs.iter().collect();
        ExportDocument {
            exported_at: Utc::now(),
            total_runs: runs.len(),
            summary: summarize(&refs.iter().rev().take(SUMMARY_WINDOW).copied().collect::<Vec<_>>()),
            runs: runs.iter().cloned().collect(),
        }
    }

    /// Writes the current ring as a JSON document to `path` (spec §4.7):
    /// timestamp, total runs, summary, and every detailed entry.
    pub fn export(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<ExportDocument> {
        let document = self.export_document();
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &document)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(document)
    }
}

fn summarize(window: &[&RunRecord]) -> PerformanceSummary {
    if window.is_empty() {
        return PerformanceSummary {
            runs_considered: 0,
            success_rate: 0.0,
            mean_solve_seconds: 0.0,
            mean_objective_value: 0.0,
            mean_total_delay_minutes: 0.0,
        };
    }

    let n = window.len() as f64;
    let successes = window.iter().filter(|r| r.status.has_assignment()).count();

    PerformanceSummary {
        runs_considered: window.len(),
        success_rate: successes as f64 / n,
        mean_solve_seconds: window.iter().map(|r| r.solve_seconds).sum::<f64>() / n,
        mean_objective_value: window.iter().map(|r| r.objective_value).sum::<f64>() / n,
        mean_total_delay_minutes: window
            .iter()
            .map(|r| r.total_delay_minutes as f64)
            .sum::<f64>()
            / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn export_writes_a_readable_json_document() {
        let monitor = PerformanceMonitor::new();
        let handle = monitor.start(2, 1, 0, Some(10), Some(20));
        monitor.end(handle, 42.0, 1, 5, 0.2, SolverStatus::Optimal);

        let temp_file = NamedTempFile::new().unwrap();
        let document = monitor.export(temp_file.path()).unwrap();
        assert_eq!(document.total_runs, 1);

        let contents = std::fs::read_to_string(temp_file.path()).unwrap();
        let reloaded: ExportDocument = serde_json::from_str(&contents).unwrap();
        assert_eq!(reloaded.total_runs, 1);
        assert_eq!(reloaded.runs.len(), 1);
        assert_eq!(reloaded.runs[0].objective_value, 42.0);
    }
}
