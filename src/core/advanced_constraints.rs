//! Advanced Constraint Builder (spec §4.3): opt-in augmentations layered on
//! top of the Base Constraint Builder's Arena.
//!
//! Grounded on `original_source/opt-engine/src/advanced_constraints.py`
//! (`add_junction_constraint`, `add_signal_constraint`,
//! `add_maintenance_window`, `add_speed_restriction`,
//! `add_crew_change_constraint`, `add_priority_overtaking`,
//! `add_weather_constraint`).

use good_lp::{constraint, variable, Constraint};

use super::arena::VariableArena;
use super::reify::{reify_and, reify_and_not, reify_from, sum};
use crate::models::input::{SignalKind, ValidatedModel};

/// Minimum continuous dwell enforced by a crew change stop (spec §4.3
/// "Crew change": "enforces continuous occupancy for ten ticks").
const CREW_CHANGE_DWELL_TICKS: usize = 10;

pub fn build(model: &ValidatedModel, arena: &mut VariableArena) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    junctions(model, arena, &mut constraints);
    signals(model, arena, &mut constraints);
    maintenance_windows(model, arena, &mut constraints);
    speed_restrictions(model, arena, &mut constraints);
    crew_changes(model, arena, &mut constraints);
    priority_overtaking(model, arena, &mut constraints);
    weather(model, arena, &mut constraints);

    constraints
}

fn junctions(model: &ValidatedModel, arena: &VariableArena, constraints: &mut Vec<Constraint>) {
    for junction in &model.advanced.junctions {
        let tracks: Vec<_> = junction
            .segment_ids
            .iter()
            .filter_map(|s| arena.track_ix(s))
            .collect();
        for tau in 0..arena.tick_count {
            let occs: Vec<_> = model
                .trains
                .iter()
                .filter_map(|t| arena.train_ix(&t.train_id))
                .flat_map(|tix| {
                    tracks
                        .iter()
                        .filter_map(move |kix| arena.occupancy(tix, *kix, tau))
                })
                .collect();
            if occs.is_empty() {
                continue;
            }
            let total = sum(occs);
            constraints.push(constraint!(total <= 1.0));
        }
    }
}

fn signals(
    model: &ValidatedModel,
    arena: &mut VariableArena,
    constraints: &mut Vec<Constraint>,
) {
    for signal in &model.advanced.signals {
        if signal.kind != SignalKind::Manual {
            continue;
        }
        let tracks: Vec<_> = signal
            .segment_ids
            .iter()
            .filter_map(|s| arena.track_ix(s))
            .collect();
        for tau in 0..arena.tick_count {
            let clear = arena.vars.add(variable().binary());
            for t in &model.trains {
                let Some(tix) = arena.train_ix(&t.train_id) else {
                    continue;
                };
                for kix in &tracks {
                    if let Some(x) = arena.occupancy(tix, *kix, tau) {
                        constraints.push(constraint!(clear >= x));
                    }
                }
            }
        }
    }
}

fn maintenance_windows(
    model: &ValidatedModel,
    arena: &VariableArena,
    constraints: &mut Vec<Constraint>,
) {
    for window in &model.advanced.maintenance_windows {
        let Some(kix) = arena.track_ix(&window.segment_id) else {
            continue;
        };
        let end = window.end_tick.min(arena.tick_count.saturating_sub(1));
        for tau in window.start_tick..=end {
            for t in &model.trains {
                let Some(tix) = arena.train_ix(&t.train_id) else {
                    continue;
                };
                if let Some(x) = arena.occupancy(tix, kix, tau) {
                    constraints.push(constraint!(x == 0.0));
                }
            }
        }
    }
}

/// Added ticks `a = ceil((d/v' - d/v_max) * 60 / Δ)` for a restriction to
/// `v'` km/h on a segment of length `d` km with nominal max `v_max` km/h.
fn added_ticks(length_km: f64, restricted_kmh: f64, max_kmh: f64, step_minutes: u32) -> i64 {
    if restricted_kmh <= 0.0 || max_kmh <= 0.0 || length_km <= 0.0 {
        return 0;
    }
    let extra_hours = length_km / restricted_kmh - length_km / max_kmh;
    let extra_minutes = extra_hours * 60.0;
    (extra_minutes / step_minutes.max(1) as f64).ceil() as i64
}

fn speed_restrictions(
    model: &ValidatedModel,
    arena: &mut VariableArena,
    constraints: &mut Vec<Constraint>,
) {
    for restriction in &model.advanced.speed_restrictions {
        let Some(track) = model.find_track(&restriction.segment_id) else {
            continue;
        };
        let Some(kix) = arena.track_ix(&restriction.segment_id) else {
            continue;
        };
        let a = added_ticks(
            track.length_km,
            restriction.restricted_speed_kmh,
            track.max_speed_kmh,
            model.config.time_step_minutes,
        );
        if a <= 0 {
            continue;
        }
        apply_extension(model, arena, constraints, kix, a as usize);
    }
}

fn weather(model: &ValidatedModel, arena: &mut VariableArena, constraints: &mut Vec<Constraint>) {
    let Some(condition) = model.advanced.weather else {
        return;
    };
    let factor = condition.speed_factor();
    if factor >= 1.0 {
        return;
    }
    for track in &model.tracks {
        let Some(kix) = arena.track_ix(&track.segment_id) else {
            continue;
        };
        let restricted_kmh = track.max_speed_kmh * factor;
        let a = added_ticks(
            track.length_km,
            restricted_kmh,
            track.max_speed_kmh,
            model.config.time_step_minutes,
        );
        if a <= 0 {
            continue;
        }
        apply_extension(model, arena, constraints, kix, a as usize);
    }
}

/// Shared "starting ⇒ stay occupied for `a` more ticks" pattern used by
/// both speed restriction and weather (spec §4.3 "identical to speed
/// restriction").
fn apply_extension(
    model: &ValidatedModel,
    arena: &mut VariableArena,
    constraints: &mut Vec<Constraint>,
    track: super::arena::TrackIx,
    extra_ticks: usize,
) {
    for t in &model.trains {
        let Some(tix) = arena.train_ix(&t.train_id) else {
            continue;
        };
        if !arena.has_occupancy(tix, track) {
            continue;
        }
        for tau in 0..arena.tick_count {
            let Some(x_now) = arena.occupancy(tix, track, tau) else {
                continue;
            };
            let starting = if tau == 0 {
                // τ=0 omits the prior-tick clause (spec §4.3, open
                // question §9(b)).
                reify_from(&mut arena.vars, constraints, x_now)
            } else {
                let Some(x_prev) = arena.occupancy(tix, track, tau - 1) else {
                    continue;
                };
                reify_and_not(&mut arena.vars, constraints, x_now, x_prev)
            };
            for dt in 1..=extra_ticks {
                let tau_dt = tau + dt;
                if tau_dt >= arena.tick_count {
                    break;
                }
                if let Some(x_future) = arena.occupancy(tix, track, tau_dt) {
                    constraints.push(constraint!(x_future >= starting));
                }
            }
        }
    }
}

fn crew_changes(
    model: &ValidatedModel,
    arena: &mut VariableArena,
    constraints: &mut Vec<Constraint>,
) {
    for station in &model.advanced.crew_change_stations {
        for t in &model.trains {
            if !t.route.iter().any(|s| s == station) {
                continue;
            }
            let Some(tix) = arena.train_ix(&t.train_id) else {
                continue;
            };
            let chain = &model.route_segments[&t.train_id];
            let incident: Vec<_> = model
                .tracks
                .iter()
                .filter(|tr| chain.contains(&tr.segment_id))
                .filter(|tr| tr.from_station == *station || tr.to_station == *station)
                .filter_map(|tr| arena.track_ix(&tr.segment_id))
                .collect();

            for kix in incident {
                for tau in 0..arena.tick_count {
                    let Some(x_now) = arena.occupancy(tix, kix, tau) else {
                        continue;
                    };
                    let stop = if tau == 0 {
                        reify_from(&mut arena.vars, constraints, x_now)
                    } else {
                        let Some(x_prev) = arena.occupancy(tix, kix, tau - 1) else {
                            continue;
                        };
                        reify_and_not(&mut arena.vars, constraints, x_now, x_prev)
                    };
                    for dt in 1..CREW_CHANGE_DWELL_TICKS {
                        let tau_dt = tau + dt;
                        if tau_dt >= arena.tick_count {
                            break;
                        }
                        if let Some(x_future) = arena.occupancy(tix, kix, tau_dt) {
                            constraints.push(constraint!(x_future >= stop));
                        }
                    }
                }
            }
        }
    }
}

fn priority_overtaking(
    model: &ValidatedModel,
    arena: &mut VariableArena,
    constraints: &mut Vec<Constraint>,
) {
    for station in &model.advanced.priority_overtaking_stations {
        let incident: Vec<_> = model
            .tracks
            .iter()
            .filter(|tr| tr.from_station == *station || tr.to_station == *station)
            .filter_map(|tr| arena.track_ix(&tr.segment_id))
            .collect();

        let visitors: Vec<_> = model
            .trains
            .iter()
            .filter(|t| t.route.iter().any(|s| s == station))
            .collect();

        for hi in &visitors {
            for lo in &visitors {
                if hi.priority >= lo.priority {
                    continue;
                }
                let (Some(hi_ix), Some(lo_ix)) =
                    (arena.train_ix(&hi.train_id), arena.train_ix(&lo.train_id))
                else {
                    continue;
                };
                for kix in &incident {
                    for tau in 0..arena.tick_count {
                        let (Some(x_hi), Some(x_lo)) = (
                            arena.occupancy(hi_ix, *kix, tau),
                            arena.occupancy(lo_ix, *kix, tau),
                        ) else {
                            continue;
                        };
                        let both_want =
                            reify_and(&mut arena.vars, constraints, x_hi, x_lo);
                        constraints.push(constraint!(x_hi >= both_want));
                        constraints.push(constraint!(x_lo <= 1 - both_want));
                    }
                }
            }
        }
    }
}
