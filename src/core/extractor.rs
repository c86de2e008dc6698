//! Extractor (spec §4.6).
//!
//! Grounded on `original_source/opt-engine/src/optimizer.py`
//! (`_extract_schedule`, `_calculate_metrics`): scans ticks ascending per
//! (train, track), folds contiguous runs into schedule entries, and
//! summarizes the solved assignment into the metrics the caller sees.

use chrono::Duration;
use good_lp::Solution;

use super::arena::VariableArena;
use crate::models::input::{Track, Train, ValidatedModel};
use crate::models::schedule::{ScheduleEntry, SolveMetrics};

const OCCUPIED: f64 = 0.5;

pub fn extract(
    model: &ValidatedModel,
    arena: &VariableArena,
    solution: &dyn Solution,
) -> (Vec<ScheduleEntry>, SolveMetrics) {
    let mut entries = Vec::new();
    let step = model.config.time_step_minutes.max(1) as i64;

    for (tix, kix) in arena.occupancy_pairs() {
        let Some(train) = model
            .trains
            .iter()
            .find(|t| arena.train_ix(&t.train_id) == Some(tix))
        else {
            continue;
        };
        let Some(track) = model
            .tracks
            .iter()
            .find(|t| arena.track_ix(&t.segment_id) == Some(kix))
        else {
            continue;
        };

        let platform = first_materialized_platform(arena, tix, train, solution);

        let mut run_start: Option<usize> = None;
        for tau in 0..arena.tick_count {
            let occupied = arena
                .occupancy(tix, kix, tau)
                .map(|v| solution.value(v) > OCCUPIED)
                .unwrap_or(false);

            match (occupied, run_start) {
                (true, None) => run_start = Some(tau),
                (false, Some(start)) => {
                    entries.push(build_entry(model, train, track, start, tau, platform, step));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            entries.push(build_entry(
                model,
                train,
                track,
                start,
                arena.tick_count,
                platform,
                step,
            ));
        }
    }

    entries.sort_by(|a, b| {
        a.start_time.cmp(&b.start_time).then(a.train_id.cmp(&b.train_id))
    });

    let metrics = compute_metrics(model, arena, solution);
    (entries, metrics)
}

/// Platform is `p[t,ℓ]` for the first station on t's route for which `p`
/// was materialized (spec §4.6).
fn first_materialized_platform(
    arena: &VariableArena,
    tix: super::arena::TrainIx,
    train: &Train,
    solution: &dyn Solution,
) -> Option<u32> {
    train.route.iter().find_map(|station| {
        arena
            .platform(tix, station)
            .map(|v| solution.value(v).round().max(1.0) as u32)
    })
}

fn build_entry(
    model: &ValidatedModel,
    train: &Train,
    track: &Track,
    start_tick: usize,
    end_tick: usize,
    platform: Option<u32>,
    step_minutes: i64,
) -> ScheduleEntry {
    let start_time = model.base_instant + Duration::minutes(start_tick as i64 * step_minutes);
    let end_time = model.base_instant + Duration::minutes(end_tick as i64 * step_minutes);
    ScheduleEntry {
        train_id: train.train_id.clone(),
        segment_id: track.segment_id.clone(),
        start_time,
        end_time,
        platform,
    }
}

fn compute_metrics(
    model: &ValidatedModel,
    arena: &VariableArena,
    solution: &dyn Solution,
) -> SolveMetrics {
    let mut total_delay = 0u64;
    let mut total_completion = 0.0;
    for train in &model.trains {
        if let Some(tix) = arena.train_ix(&train.train_id) {
            total_delay += solution.value(arena.delay(tix)).round().max(0.0) as u64;
            total_completion += solution.value(arena.completion(tix));
        }
    }

    let mut conflicts_resolved = 0u32;
    for conflict in &model.conflicts {
        if let Some(qix) = arena.conflict_ix(&conflict.conflict_id) {
            if solution.value(arena.conflict(qix)) < OCCUPIED {
                conflicts_resolved += 1;
            }
        }
    }

    let train_count = model.trains.len().max(1) as f64;
    SolveMetrics {
        objective_value: 0.0,
        total_delay_minutes: total_delay,
        conflicts_resolved,
        mean_delay_minutes: total_delay as f64 / train_count,
        mean_completion_tick: total_completion / train_count,
    }
}
