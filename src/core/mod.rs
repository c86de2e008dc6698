//! The Railway Scheduling Core (spec §2): Input Model → Variable Arena →
//! (Base + Advanced) Constraint Builders + Objective Assembler → Solver
//! Driver → Extractor → Output, wrapped by the Performance Monitor.

pub mod advanced_constraints;
pub mod arena;
pub mod base_constraints;
pub mod extractor;
pub mod monitor;
pub mod objective;
pub mod reify;
pub mod solver;

use good_lp::Solution;
use thiserror::Error;
use tracing::instrument;

use crate::models::input::ValidatedModel;
use crate::models::schedule::{ScheduleEntry, SolveOutcome, SolverStatus};

pub use monitor::PerformanceMonitor;

/// Failure taxonomy for a single solve (spec §7): validation already
/// happened upstream at [`ValidatedModel::build`] and is reported
/// separately, so this only covers what can go wrong inside the core
/// itself.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no feasible schedule exists for this input")]
    Infeasible,
    #[error("solver completed without producing an assignment")]
    SolverFault,
}

/// Runs one full solve cycle against an already-validated model. INFEASIBLE
/// and UNKNOWN are both surfaced as [`CoreError`] per spec §4.5's failure
/// semantics; only OPTIMAL and FEASIBLE produce a [`SolveOutcome`].
#[instrument(skip_all, fields(trains = model.trains.len(), tracks = model.tracks.len()))]
pub fn optimize(
    model: &ValidatedModel,
    warm_start: Option<&[ScheduleEntry]>,
    monitor: &PerformanceMonitor,
) -> Result<SolveOutcome, CoreError> {
    let mut arena = arena::VariableArena::new(model);

    let mut constraints = base_constraints::build(model, &mut arena);
    constraints.extend(advanced_constraints::build(model, &mut arena));

    let objective_expr = objective::build(model, &arena);
    let variable_count = arena.vars.len();
    let constraint_count = constraints.len();

    let handle = monitor.start(
        model.trains.len(),
        model.tracks.len(),
        model.conflicts.len(),
        Some(variable_count),
        Some(constraint_count),
    );

    let objective_for_eval = objective_expr.clone();
    let report = solver::solve(model, &mut arena, objective_expr, constraints, warm_start);

    match (report.status, report.solution) {
        (SolverStatus::Optimal | SolverStatus::Feasible, Some(solution)) => {
            let (schedule, mut metrics) = extractor::extract(model, &arena, solution.as_ref());
            metrics.objective_value = evaluate(&objective_for_eval, solution.as_ref());

            monitor.end(
                handle,
                metrics.objective_value,
                metrics.conflicts_resolved,
                metrics.total_delay_minutes,
                report.solve_time_seconds,
                report.status,
            );

            Ok(SolveOutcome {
                status: report.status,
                schedule,
                metrics,
                solve_time_seconds: report.solve_time_seconds,
            })
        }
        (SolverStatus::Infeasible | SolverStatus::Unknown, _) => {
            monitor.end(handle, 0.0, 0, 0, report.solve_time_seconds, report.status);
            Err(CoreError::Infeasible)
        }
        _ => {
            monitor.end(handle, 0.0, 0, 0, report.solve_time_seconds, report.status);
            Err(CoreError::SolverFault)
        }
    }
}

fn evaluate(expr: &good_lp::Expression, solution: &dyn Solution) -> f64 {
    expr.eval_with(solution)
}
