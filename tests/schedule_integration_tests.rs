use chrono::Utc;

use railway_scheduling_core::core::{self, PerformanceMonitor};
use railway_scheduling_core::models::{Conflict, ConflictKind, SolverConfig, Track, Train, ValidatedModel};

fn track(id: &str, a: &str, b: &str, capacity: u32, headway_minutes: u32) -> Track {
    Track {
        segment_id: id.to_string(),
        from_station: a.to_string(),
        to_station: b.to_string(),
        capacity,
        headway_minutes,
        length_km: 10.0,
        max_speed_kmh: 100.0,
    }
}

fn train(id: &str, route: &[&str], priority: u8) -> Train {
    Train {
        train_id: id.to_string(),
        current_position: route[0].to_string(),
        scheduled_arrival: Utc::now(),
        actual_arrival: None,
        priority,
        delay_minutes: 0,
        destination: route.last().unwrap().to_string(),
        route: route.iter().map(|s| s.to_string()).collect(),
    }
}

/// Scenario 1 (spec §8): two trains contend for one capacity-1 segment.
/// The lower train id wins the tie-break and the higher-priority* train is
/// delayed by at least one headway window.
#[test]
fn two_trains_serial_segment_resolves_via_headway() {
    let tracks = vec![track("K1", "A", "B", 1, 2)];
    let trains = vec![train("T1", &["A", "B"], 1), train("T2", &["A", "B"], 2)];
    let conflicts = vec![Conflict {
        conflict_id: "C1".to_string(),
        train_ids: vec!["T1".to_string(), "T2".to_string()],
        resource_id: "K1".to_string(),
        conflict_type: ConflictKind::TrackOccupation,
        severity: 3,
    }];

    let model = ValidatedModel::build(trains, tracks, conflicts, SolverConfig::default()).unwrap();
    let monitor = PerformanceMonitor::new();
    let outcome = core::optimize(&model, None, &monitor).expect("feasible schedule");

    assert!(outcome.status.has_assignment());
    let step = model.config.time_step_minutes as i64;

    let k1_entries: Vec<_> = outcome
        .schedule
        .iter()
        .filter(|e| e.segment_id == "K1")
        .collect();
    assert_eq!(k1_entries.len(), 2);

    let t1 = k1_entries.iter().find(|e| e.train_id == "T1").unwrap();
    let t2 = k1_entries.iter().find(|e| e.train_id == "T2").unwrap();
    assert!(t1.start_time <= t2.start_time);

    let headway_ticks = (model.config.headway_buffer_minutes as i64 + 3) * step;
    let gap_minutes = (t2.start_time - t1.end_time).num_minutes();
    assert!(gap_minutes >= 0, "overlapping occupancy on a capacity-1 segment");
    assert!(t2.start_time >= t1.start_time + chrono::Duration::minutes(headway_ticks - step));

    assert_eq!(outcome.metrics.conflicts_resolved, 1);
}

/// Scenario 2 (spec §8): a maintenance blackout forces the only entry for
/// the blocked segment outside the window.
#[test]
fn maintenance_window_pushes_entry_out_of_blackout() {
    let tracks = vec![track("K1", "A", "B", 1, 2)];
    let trains = vec![train("T1", &["A", "B"], 1)];

    let mut advanced = railway_scheduling_core::models::AdvancedOptions::default();
    advanced.maintenance_windows.push(railway_scheduling_core::models::MaintenanceWindow {
        segment_id: "K1".to_string(),
        start_tick: 10,
        end_tick: 20,
    });

    let model = ValidatedModel::build_with_advanced(
        trains,
        tracks,
        vec![],
        SolverConfig::default(),
        advanced,
    )
    .unwrap();
    let monitor = PerformanceMonitor::new();
    let outcome = core::optimize(&model, None, &monitor).expect("feasible schedule");

    let step = model.config.time_step_minutes as i64;
    let blackout_start = model.base_instant + chrono::Duration::minutes(10 * step);
    let blackout_end = model.base_instant + chrono::Duration::minutes(20 * step);

    for entry in &outcome.schedule {
        assert!(
            entry.end_time <= blackout_start || entry.start_time >= blackout_end,
            "entry {:?} overlaps the maintenance blackout",
            entry
        );
    }
}

/// Scenario 6 (spec §8): headway alone cannot fit two trains into the
/// horizon, so the solver must report infeasibility rather than an
/// incorrect assignment.
#[test]
fn infeasible_headway_reports_infeasible() {
    let tracks = vec![track("K1", "A", "B", 1, 1000)];
    let trains = vec![train("T1", &["A", "B"], 1), train("T2", &["A", "B"], 1)];

    let mut config = SolverConfig::default();
    config.time_horizon_minutes = 20;

    let model = ValidatedModel::build(trains, tracks, vec![], config).unwrap();
    let monitor = PerformanceMonitor::new();
    let result = core::optimize(&model, None, &monitor);

    assert!(matches!(result, Err(core::CoreError::Infeasible)));
}

/// P3 (continuity) and P6 (completion within horizon): a three-station
/// route produces a contiguous chain ending within the horizon.
#[test]
fn multi_segment_route_is_contiguous_and_within_horizon() {
    let tracks = vec![track("K1", "A", "B", 2, 2), track("K2", "B", "C", 2, 2)];
    let trains = vec![train("T1", &["A", "B", "C"], 1)];

    let model = ValidatedModel::build(trains, tracks, vec![], SolverConfig::default()).unwrap();
    let monitor = PerformanceMonitor::new();
    let outcome = core::optimize(&model, None, &monitor).expect("feasible schedule");

    let mut entries: Vec<_> = outcome
        .schedule
        .iter()
        .filter(|e| e.train_id == "T1")
        .collect();
    entries.sort_by_key(|e| e.start_time);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].segment_id, "K1");
    assert_eq!(entries[1].segment_id, "K2");
    assert_eq!(entries[0].end_time, entries[1].start_time);

    let horizon_end =
        model.base_instant + chrono::Duration::minutes(model.config.time_horizon_minutes as i64);
    for entry in &entries {
        assert!(entry.end_time <= horizon_end);
    }
}

/// P7 (monotone extraction): the returned schedule is sorted by start
/// instant, ties broken by train id ascending.
#[test]
fn schedule_is_sorted_by_start_then_train_id() {
    let tracks = vec![track("K1", "A", "B", 2, 1)];
    let trains = vec![
        train("T2", &["A", "B"], 1),
        train("T1", &["A", "B"], 1),
        train("T3", &["A", "B"], 1),
    ];

    let model = ValidatedModel::build(trains, tracks, vec![], SolverConfig::default()).unwrap();
    let monitor = PerformanceMonitor::new();
    let outcome = core::optimize(&model, None, &monitor).expect("feasible schedule");

    for pair in outcome.schedule.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.start_time < b.start_time
                || (a.start_time == b.start_time && a.train_id <= b.train_id)
        );
    }
}

/// P1 (capacity): with three trains contending for a capacity-1 segment, no
/// tick in the returned schedule ever has more occupants than the segment's
/// capacity.
#[test]
fn capacity_is_never_exceeded_with_three_contending_trains() {
    let tracks = vec![track("K1", "A", "B", 1, 1)];
    let trains = vec![
        train("T1", &["A", "B"], 1),
        train("T2", &["A", "B"], 1),
        train("T3", &["A", "B"], 1),
    ];

    let model = ValidatedModel::build(trains, tracks, vec![], SolverConfig::default()).unwrap();
    let monitor = PerformanceMonitor::new();
    let outcome = core::optimize(&model, None, &monitor).expect("feasible schedule");

    let step = model.config.time_step_minutes as i64;
    for tau in 0..model.config.tick_count() as i64 {
        let instant = model.base_instant + chrono::Duration::minutes(tau * step);
        let occupants = outcome
            .schedule
            .iter()
            .filter(|e| e.segment_id == "K1" && e.start_time <= instant && instant < e.end_time)
            .count();
        assert!(occupants <= 1, "tick {tau} has {occupants} occupants on a capacity-1 segment");
    }
}

/// P5 (start delay bound): a train's first entry starts no earlier than its
/// scheduled arrival and, when headway forces a wait, no later than
/// `min(120, H/2)` past it.
#[test]
fn start_delay_stays_within_scheduled_bound() {
    let tracks = vec![track("K1", "A", "B", 1, 2)];
    let mut t1 = train("T1", &["A", "B"], 1);
    let mut t2 = train("T2", &["A", "B"], 1);
    t1.scheduled_arrival = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
    t2.scheduled_arrival = t1.scheduled_arrival + chrono::Duration::minutes(5);

    let model =
        ValidatedModel::build(vec![t1, t2], tracks, vec![], SolverConfig::default()).unwrap();
    let monitor = PerformanceMonitor::new();
    let outcome = core::optimize(&model, None, &monitor).expect("feasible schedule");

    let bound = 120.min(model.config.time_horizon_minutes / 2) as i64;
    for train in &model.trains {
        let sigma = model.scheduled_start_tick(train).expect("within grid");
        let sigma_instant =
            model.base_instant + chrono::Duration::minutes(sigma * model.config.time_step_minutes as i64);
        let first = outcome
            .schedule
            .iter()
            .filter(|e| e.train_id == train.train_id)
            .min_by_key(|e| e.start_time)
            .expect("train has at least one entry");
        assert!(first.start_time >= sigma_instant, "{} started before its scheduled arrival", train.train_id);
        assert!(
            first.start_time <= sigma_instant + chrono::Duration::minutes(bound),
            "{} started more than {bound} minutes after its scheduled arrival",
            train.train_id
        );
    }
}

/// Scenario 3 (spec §8) / P4 (platform uniqueness): two trains present at
/// the same station at the same tick must be assigned distinct platforms.
#[test]
fn platform_contention_assigns_distinct_platforms() {
    let tracks = vec![track("K1", "A", "B", 2, 0)];
    let trains = vec![train("T1", &["A", "B"], 1), train("T2", &["A", "B"], 1)];

    let model = ValidatedModel::build(trains, tracks, vec![], SolverConfig::default()).unwrap();
    let monitor = PerformanceMonitor::new();
    let outcome = core::optimize(&model, None, &monitor).expect("feasible schedule");

    let t1 = outcome.schedule.iter().find(|e| e.train_id == "T1" && e.segment_id == "K1").unwrap();
    let t2 = outcome.schedule.iter().find(|e| e.train_id == "T2" && e.segment_id == "K1").unwrap();

    let overlap = t1.start_time < t2.end_time && t2.start_time < t1.end_time;
    assert!(overlap, "test expects both trains to occupy K1 at the same tick");
    assert_ne!(t1.platform, t2.platform, "overlapping trains at station A must hold distinct platforms");
}

/// Scenario 4 (spec §8): with priority overtaking flagged at a station, the
/// lower-priority train must yield the shared segment to the higher-priority
/// one rather than occupying it at the same tick.
#[test]
fn priority_overtaking_forces_lower_priority_to_yield() {
    let tracks = vec![track("K1", "A", "B", 2, 0)];
    let trains = vec![train("T1", &["A", "B"], 1), train("T3", &["A", "B"], 3)];

    let mut advanced = railway_scheduling_core::models::AdvancedOptions::default();
    advanced.priority_overtaking_stations.push("B".to_string());

    let model = ValidatedModel::build_with_advanced(
        trains,
        tracks,
        vec![],
        SolverConfig::default(),
        advanced,
    )
    .unwrap();
    let monitor = PerformanceMonitor::new();
    let outcome = core::optimize(&model, None, &monitor).expect("feasible schedule");

    let hi = outcome.schedule.iter().find(|e| e.train_id == "T1" && e.segment_id == "K1").unwrap();
    let lo = outcome.schedule.iter().find(|e| e.train_id == "T3" && e.segment_id == "K1").unwrap();

    assert!(hi.end_time <= lo.start_time, "priority-1 train must occupy K1 first, without overlap");
    assert!(lo.start_time > hi.start_time, "priority-3 train must be delayed behind the priority-1 train");
}

/// Scenario 5 (spec §8): the worked speed-restriction example — a 60km
/// segment with v_max 120 restricted to 60 adds `a = 30` occupancy ticks.
#[test]
fn speed_restriction_extends_occupancy_by_the_worked_example() {
    let fast_track = railway_scheduling_core::models::Track {
        segment_id: "K1".to_string(),
        from_station: "A".to_string(),
        to_station: "B".to_string(),
        capacity: 1,
        headway_minutes: 2,
        length_km: 60.0,
        max_speed_kmh: 120.0,
    };

    let baseline_model = ValidatedModel::build(
        vec![train("T1", &["A", "B"], 1)],
        vec![fast_track.clone()],
        vec![],
        SolverConfig::default(),
    )
    .unwrap();
    let monitor = PerformanceMonitor::new();
    let baseline = core::optimize(&baseline_model, None, &monitor).expect("feasible schedule");
    let baseline_entry = baseline.schedule.iter().find(|e| e.segment_id == "K1").unwrap();
    let baseline_minutes = (baseline_entry.end_time - baseline_entry.start_time).num_minutes();

    let mut advanced = railway_scheduling_core::models::AdvancedOptions::default();
    advanced.speed_restrictions.push(railway_scheduling_core::models::SpeedRestriction {
        segment_id: "K1".to_string(),
        restricted_speed_kmh: 60.0,
    });
    let restricted_model = ValidatedModel::build_with_advanced(
        vec![train("T1", &["A", "B"], 1)],
        vec![fast_track],
        vec![],
        SolverConfig::default(),
        advanced,
    )
    .unwrap();
    let monitor = PerformanceMonitor::new();
    let restricted = core::optimize(&restricted_model, None, &monitor).expect("feasible schedule");
    let restricted_entry = restricted.schedule.iter().find(|e| e.segment_id == "K1").unwrap();
    let restricted_minutes = (restricted_entry.end_time - restricted_entry.start_time).num_minutes();

    assert!(
        restricted_minutes - baseline_minutes >= 30,
        "restricted duration {restricted_minutes} should exceed baseline {baseline_minutes} by at least 30 minutes"
    );
}

/// P8 (idempotent re-solve): solving again with the first solve's own
/// schedule as a warm start must not regress the objective within the same
/// budget.
#[test]
fn warm_starting_with_own_schedule_does_not_regress_objective() {
    let tracks = vec![track("K1", "A", "B", 1, 2)];
    let trains = vec![train("T1", &["A", "B"], 1), train("T2", &["A", "B"], 2)];
    let conflicts = vec![Conflict {
        conflict_id: "C1".to_string(),
        train_ids: vec!["T1".to_string(), "T2".to_string()],
        resource_id: "K1".to_string(),
        conflict_type: ConflictKind::TrackOccupation,
        severity: 3,
    }];

    let model =
        ValidatedModel::build(trains, tracks, conflicts, SolverConfig::default()).unwrap();
    let monitor = PerformanceMonitor::new();
    let first = core::optimize(&model, None, &monitor).expect("feasible schedule");

    let second = core::optimize(&model, Some(first.schedule.as_slice()), &monitor)
        .expect("feasible schedule");

    assert!(
        second.metrics.objective_value <= first.metrics.objective_value + 1e-6,
        "re-solving with a warm start regressed the objective: {} > {}",
        second.metrics.objective_value,
        first.metrics.objective_value
    );
}
