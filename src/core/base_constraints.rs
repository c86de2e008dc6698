//! Base Constraint Builder (spec §4.2): capacity, route continuity,
//! headway, platform uniqueness, conflict reification, timing.
//!
//! Grounded on `original_source/opt-engine/src/optimizer.py`
//! (`_add_capacity_constraints`, `_add_route_continuity_constraints`,
//! `_add_headway_constraints`, `_add_platform_constraints`,
//! `_add_conflict_constraints`, `_add_timing_constraints`), re-expressed as
//! linear big-M constraints since `good_lp` has no `OnlyEnforceIf`.

use good_lp::{constraint, Constraint, Expression};

use super::arena::VariableArena;
use super::reify::{implies_ge, implies_le, reify_and_not, reify_not_equal, reify_or, sum};
use crate::models::input::ValidatedModel;

/// Minimum physical separation enforced on top of the configured headway
/// buffer (spec §4.2 C3: "hB+3").
const HEADWAY_SLACK_TICKS: u32 = 3;

pub fn build(model: &ValidatedModel, arena: &mut VariableArena) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    capacity(model, arena, &mut constraints);
    route_continuity(model, arena, &mut constraints);
    headway(model, arena, &mut constraints);
    platform_uniqueness(model, arena, &mut constraints);
    conflict_reification(model, arena, &mut constraints);
    timing(model, arena, &mut constraints);

    constraints
}

/// C1 — Σ_t x[t,k,τ] ≤ capacity(k) for every (k, τ).
fn capacity(model: &ValidatedModel, arena: &VariableArena, constraints: &mut Vec<Constraint>) {
    for track in &model.tracks {
        let Some(kix) = arena.track_ix(&track.segment_id) else {
            continue;
        };
        for tau in 0..arena.tick_count {
            let occupants: Vec<_> = model
                .trains
                .iter()
                .filter_map(|t| {
                    let tix = arena.train_ix(&t.train_id)?;
                    arena.occupancy(tix, kix, tau)
                })
                .collect();
            if occupants.is_empty() {
                continue;
            }
            let total = sum(occupants);
            constraints.push(constraint!(total <= track.capacity as f64));
        }
    }
}

/// C2 — route continuity plus the "visits last segment at least once" rule.
fn route_continuity(
    model: &ValidatedModel,
    arena: &mut VariableArena,
    constraints: &mut Vec<Constraint>,
) {
    for train in &model.trains {
        let Some(tix) = arena.train_ix(&train.train_id) else {
            continue;
        };
        let chain = &model.route_segments[&train.train_id];
        if chain.is_empty() {
            continue;
        }

        for window in chain.windows(2) {
            let (cur_seg, next_seg) = (&window[0], &window[1]);
            let (Some(cur), Some(next)) = (arena.track_ix(cur_seg), arena.track_ix(next_seg))
            else {
                continue;
            };
            for tau in 0..arena.tick_count.saturating_sub(1) {
                let (Some(x_cur_now), Some(x_cur_next), Some(x_next_next)) = (
                    arena.occupancy(tix, cur, tau),
                    arena.occupancy(tix, cur, tau + 1),
                    arena.occupancy(tix, next, tau + 1),
                ) else {
                    continue;
                };
                let leaving = reify_and_not(
                    &mut arena.vars,
                    constraints,
                    x_cur_now,
                    x_cur_next,
                );
                constraints.push(constraint!(x_next_next >= leaving));
            }
        }

        // Every train must occupy its last segment at least once.
        if let Some(last_seg) = chain.last() {
            if let Some(last) = arena.track_ix(last_seg) {
                let occs: Vec<_> = (0..arena.tick_count)
                    .filter_map(|tau| arena.occupancy(tix, last, tau))
                    .collect();
                if !occs.is_empty() {
                    let total = sum(occs);
                    constraints.push(constraint!(total >= 1.0));
                }
            }
        }
    }
}

/// C3 — headway exclusion window of `headway_buffer_minutes + 3` ticks.
/// Applied symmetrically: the lower train id is only a tie-break for
/// reporting, not an assumption about which train ends up first, so both
/// orderings are forbidden from occupying within the window of each other.
fn headway(model: &ValidatedModel, arena: &VariableArena, constraints: &mut Vec<Constraint>) {
    let step = model.config.time_step_minutes.max(1);
    let window_ticks = (model.config.headway_buffer_minutes / step) + HEADWAY_SLACK_TICKS;

    for (i, t1) in model.trains.iter().enumerate() {
        for t2 in model.trains.iter().skip(i + 1) {
            let (Some(t1_ix), Some(t2_ix)) =
                (arena.train_ix(&t1.train_id), arena.train_ix(&t2.train_id))
            else {
                continue;
            };

            let chain1 = &model.route_segments[&t1.train_id];
            let chain2 = &model.route_segments[&t2.train_id];
            let shared: Vec<&String> = chain1.iter().filter(|k| chain2.contains(k)).collect();

            for seg in shared {
                let Some(kix) = arena.track_ix(seg) else {
                    continue;
                };
                for tau in 0..arena.tick_count {
                    for h in 1..=window_ticks as usize {
                        let tau_h = tau + h;
                        if tau_h >= arena.tick_count {
                            break;
                        }
                        if let (Some(a), Some(b)) = (
                            arena.occupancy(t1_ix, kix, tau),
                            arena.occupancy(t2_ix, kix, tau_h),
                        ) {
                            let combined: Expression = Expression::from(a) + b;
                            constraints.push(constraint!(combined <= 1.0));
                        }
                        if let (Some(a), Some(b)) = (
                            arena.occupancy(t2_ix, kix, tau),
                            arena.occupancy(t1_ix, kix, tau_h),
                        ) {
                            let combined: Expression = Expression::from(a) + b;
                            constraints.push(constraint!(combined <= 1.0));
                        }
                    }
                }
            }
        }
    }
}

/// C4 — platform uniqueness, approximated by joint presence in any segment
/// incident to the station within the tick grid.
fn platform_uniqueness(
    model: &ValidatedModel,
    arena: &mut VariableArena,
    constraints: &mut Vec<Constraint>,
) {
    let stations: std::collections::BTreeSet<&str> = model
        .tracks
        .iter()
        .flat_map(|t| [t.from_station.as_str(), t.to_station.as_str()])
        .collect();

    for station in stations {
        let incident: Vec<_> = model
            .tracks
            .iter()
            .filter(|t| t.from_station == station || t.to_station == station)
            .filter_map(|t| arena.track_ix(&t.segment_id))
            .collect();
        if incident.is_empty() {
            continue;
        }

        let visitors: Vec<_> = model
            .trains
            .iter()
            .filter(|t| t.route.iter().any(|s| s == station))
            .filter_map(|t| arena.train_ix(&t.train_id))
            .collect();

        for (i, t1) in visitors.iter().enumerate() {
            for t2 in visitors.iter().skip(i + 1) {
                let (Some(p1), Some(p2)) = (arena.platform(*t1, station), arena.platform(*t2, station))
                else {
                    continue;
                };

                for tau in 0..arena.tick_count {
                    let present1: Vec<_> = incident
                        .iter()
                        .filter_map(|k| arena.occupancy(*t1, *k, tau))
                        .collect();
                    let present2: Vec<_> = incident
                        .iter()
                        .filter_map(|k| arena.occupancy(*t2, *k, tau))
                        .collect();
                    if present1.is_empty() || present2.is_empty() {
                        continue;
                    }
                    let pres1 = reify_or(&mut arena.vars, constraints, &present1);
                    let pres2 = reify_or(&mut arena.vars, constraints, &present2);

                    reify_not_equal(&mut arena.vars, constraints, &[pres1, pres2], p1, p2, 10.0);
                }
            }
        }
    }
}

/// C5 — conflict reification against the conflict's resource capacity.
fn conflict_reification(
    model: &ValidatedModel,
    arena: &VariableArena,
    constraints: &mut Vec<Constraint>,
) {
    for conflict in &model.conflicts {
        let Some(qix) = arena.conflict_ix(&conflict.conflict_id) else {
            continue;
        };
        let Some(resource) = arena.track_ix(&conflict.resource_id) else {
            continue;
        };
        let Some(track) = model.find_track(&conflict.resource_id) else {
            continue;
        };
        let c = arena.conflict(qix);
        let big_m = conflict.train_ids.len() as f64;

        for tau in 0..arena.tick_count {
            let occupants: Vec<_> = conflict
                .train_ids
                .iter()
                .filter_map(|id| {
                    let tix = arena.train_ix(id)?;
                    arena.occupancy(tix, resource, tau)
                })
                .collect();
            if occupants.is_empty() {
                continue;
            }
            let total = sum(occupants);
            // Σx <= cap + M*c: forces c=1 whenever actual occupancy overflows.
            constraints.push(implies_le(c, total.clone(), track.capacity as f64, big_m));
            constraints.push(constraint!(
                total >= (track.capacity as f64 + 1.0) - big_m * (1 - c)
            ));
        }
    }
}

/// C6 — scheduled start window and completion tick.
fn timing(model: &ValidatedModel, arena: &mut VariableArena, constraints: &mut Vec<Constraint>) {
    let big_m = arena.tick_count as f64 + 1.0;

    for train in &model.trains {
        let Some(tix) = arena.train_ix(&train.train_id) else {
            continue;
        };
        let chain = &model.route_segments[&train.train_id];
        let s = arena.delay(tix);

        if let Some(first_seg) = chain.first() {
            if let Some(first) = arena.track_ix(first_seg) {
                if let Some(sigma) = model.scheduled_start_tick(train) {
                    for tau in 0..arena.tick_count {
                        if let Some(x) = arena.occupancy(tix, first, tau) {
                            // x==1 => s <= tau - sigma (subsumes both the
                            // "before sigma" and "before sigma+s" clauses).
                            let bound = tau as f64 - sigma as f64;
                            constraints.push(implies_le(
                                x,
                                Expression::from(s),
                                bound,
                                big_m,
                            ));
                        }
                    }
                }
            }
        }

        if let Some(last_seg) = chain.last() {
            if let Some(last) = arena.track_ix(last_seg) {
                let j = arena.completion(tix);
                for tau in 0..arena.tick_count.saturating_sub(1) {
                    let (Some(x_now), Some(x_next)) = (
                        arena.occupancy(tix, last, tau),
                        arena.occupancy(tix, last, tau + 1),
                    ) else {
                        continue;
                    };
                    let completing = reify_and_not(&mut arena.vars, constraints, x_now, x_next);
                    let target = (tau + 1) as f64;
                    constraints.push(implies_ge(completing, Expression::from(j), target, big_m));
                    constraints.push(implies_le(completing, Expression::from(j), target, big_m));
                }
            }
        }
    }
}
