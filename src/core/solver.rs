//! Solver Driver (spec §4.5).
//!
//! Wraps a MILP back end (HiGHS via `good_lp`, the registry-published
//! crate the broader retrieval pack reaches for when it needs a linear
//! solver — see `DESIGN.md`) the way
//! `original_source/opt-engine/src/optimizer.py::_solve_model` wraps
//! CP-SAT: wall-clock budget, a fixed worker count, and status mapping.

use std::time::Instant;

use good_lp::{
    solvers::highs::highs, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
};
use tracing::{info, warn};

use super::arena::VariableArena;
use crate::models::input::ValidatedModel;
use crate::models::schedule::{ScheduleEntry, SolverStatus};

/// Number of solver worker threads (spec §4.5: "workers = 4").
const SOLVER_WORKERS: u32 = 4;

/// Small per-variable nudge applied when a warm start is supplied, biasing
/// the objective toward the previous assignment without hard-pinning it
/// (`good_lp`'s `SolverModel` trait has no uniform MIP-hint API across
/// backends, unlike CP-SAT's `AddHint`).
const WARM_START_BIAS: f64 = 1e-4;

pub struct SolveReport {
    pub status: SolverStatus,
    pub solution: Option<Box<dyn Solution>>,
    pub solve_time_seconds: f64,
}

pub fn solve(
    model: &ValidatedModel,
    arena: &mut VariableArena,
    mut objective: Expression,
    constraints: Vec<good_lp::Constraint>,
    warm_start: Option<&[ScheduleEntry]>,
) -> SolveReport {
    if let Some(entries) = warm_start {
        apply_warm_start_bias(model, arena, &mut objective, entries);
    }

    let vars = std::mem::replace(&mut arena.vars, ProblemVariables::new());
    let mut problem = vars.minimise(objective).using(highs);
    problem.set_option("time_limit", model.config.max_solve_time_seconds as f64);
    problem.set_option("threads", SOLVER_WORKERS as i32);
    for c in constraints {
        problem.add_constraint(c);
    }

    info!(
        trains = model.trains.len(),
        tracks = model.tracks.len(),
        wall_budget_seconds = model.config.max_solve_time_seconds,
        "starting solve"
    );

    let started = Instant::now();
    let outcome = problem.solve();
    let elapsed = started.elapsed().as_secs_f64();

    match outcome {
        Ok(solution) => {
            // HiGHS does not surface a separate "time-limit-hit-but-feasible"
            // status through `good_lp`; a solve that consumed essentially
            // the whole budget is reported as FEASIBLE rather than OPTIMAL,
            // matching the promotion rule in spec §7.
            let status = if elapsed >= model.config.max_solve_time_seconds as f64 * 0.98 {
                SolverStatus::Feasible
            } else {
                SolverStatus::Optimal
            };
            SolveReport {
                status,
                solution: Some(Box::new(solution)),
                solve_time_seconds: elapsed,
            }
        }
        Err(ResolutionError::Infeasible) => {
            warn!("solve returned infeasible");
            SolveReport {
                status: SolverStatus::Infeasible,
                solution: None,
                solve_time_seconds: elapsed,
            }
        }
        Err(other) => {
            // Not a proven infeasibility, e.g. the time budget expired
            // before HiGHS found any incumbent. `core::optimize` treats
            // this the same as INFEASIBLE: no assignment to extract.
            warn!(error = %other, "solve ended with no assignment");
            SolveReport {
                status: SolverStatus::Unknown,
                solution: None,
                solve_time_seconds: elapsed,
            }
        }
    }
}

fn apply_warm_start_bias(
    model: &ValidatedModel,
    arena: &VariableArena,
    objective: &mut Expression,
    entries: &[ScheduleEntry],
) {
    let step_minutes = model.config.time_step_minutes.max(1) as i64;
    for entry in entries {
        let Some(tix) = arena.train_ix(&entry.train_id) else {
            continue;
        };
        let Some(kix) = arena.track_ix(&entry.segment_id) else {
            continue;
        };

        // Platform hints are not biased: pulling an integer variable
        // toward a target with a purely linear term would push it to an
        // extreme instead, and `good_lp` has no quadratic terms. Only the
        // occupancy hint below is applied; unmapped hints are ignored
        // (spec §4.5).
        let start_tick = (entry.start_time - model.base_instant).num_minutes() / step_minutes;
        let end_tick = (entry.end_time - model.base_instant).num_minutes() / step_minutes;
        for tau in start_tick.max(0)..end_tick.max(0) {
            if let Some(x) = arena.occupancy(tix, kix, tau as usize) {
                *objective += -WARM_START_BIAS * x;
            }
        }
    }
}
