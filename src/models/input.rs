//! Request-side records: the Input Model (spec §3).
//!
//! These are treated as read-only for the duration of a solve (spec §3
//! "Lifecycle"); nothing here mutates after [`ValidatedModel::build`] runs.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::ScheduleEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    pub train_id: String,
    pub current_position: String,
    pub scheduled_arrival: DateTime<Utc>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub priority: u8,
    #[serde(default)]
    pub delay_minutes: u32,
    pub destination: String,
    pub route: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub segment_id: String,
    pub from_station: String,
    pub to_station: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default = "default_headway_minutes")]
    pub headway_minutes: u32,
    #[serde(default)]
    pub length_km: f64,
    #[serde(default)]
    pub max_speed_kmh: f64,
}

fn default_capacity() -> u32 {
    1
}

fn default_headway_minutes() -> u32 {
    5
}

impl Track {
    /// True if the segment connects the two stations regardless of direction
    /// (spec §3: "endpoint station codes (unordered for matching purposes)").
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from_station == a && self.to_station == b)
            || (self.from_station == b && self.to_station == a)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    TrackOccupation,
    PlatformConflict,
    JunctionCrossing,
    HeadwayViolation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: String,
    pub train_ids: Vec<String>,
    pub resource_id: String,
    pub conflict_type: ConflictKind,
    pub severity: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_horizon")]
    pub time_horizon_minutes: u32,
    #[serde(default = "default_step")]
    pub time_step_minutes: u32,
    #[serde(default = "default_wall_budget")]
    pub max_solve_time_seconds: u32,
    #[serde(default = "default_delay_weight")]
    pub delay_weight: f64,
    #[serde(default = "default_conflict_weight")]
    pub conflict_weight: f64,
    #[serde(default = "default_priority_multiplier")]
    pub priority_multiplier: f64,
    #[serde(default = "default_headway_buffer")]
    pub headway_buffer_minutes: u32,
}

fn default_horizon() -> u32 {
    240
}
fn default_step() -> u32 {
    1
}
fn default_wall_budget() -> u32 {
    30
}
fn default_delay_weight() -> f64 {
    1.0
}
fn default_conflict_weight() -> f64 {
    100.0
}
fn default_priority_multiplier() -> f64 {
    2.0
}
fn default_headway_buffer() -> u32 {
    2
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_horizon_minutes: default_horizon(),
            time_step_minutes: default_step(),
            max_solve_time_seconds: default_wall_budget(),
            delay_weight: default_delay_weight(),
            conflict_weight: default_conflict_weight(),
            priority_multiplier: default_priority_multiplier(),
            headway_buffer_minutes: default_headway_buffer(),
        }
    }
}

impl SolverConfig {
    /// Number of ticks on the time grid, `⌊H/Δ⌋` (spec §3 "Time grid").
    pub fn tick_count(&self) -> usize {
        (self.time_horizon_minutes / self.time_step_minutes.max(1)) as usize
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Automatic,
    Manual,
}

/// A point where multiple segments cross and may not be occupied together
/// (spec §4.3 "Junction").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Junction {
    pub junction_id: String,
    pub segment_ids: Vec<String>,
}

/// A signal guarding a set of segments; manual signals add a `signal_clear`
/// gate variable, automatic signals are a no-op (spec §4.3 "Signal").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: String,
    pub segment_ids: Vec<String>,
    pub kind: SignalKind,
}

/// A segment closed to all trains for `[start_tick, end_tick]`
/// (spec §4.3 "Maintenance window").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub segment_id: String,
    pub start_tick: usize,
    pub end_tick: usize,
}

/// A segment temporarily limited below its nominal max speed
/// (spec §4.3 "Speed restriction").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedRestriction {
    pub segment_id: String,
    pub restricted_speed_kmh: f64,
}

/// Fixed speed-factor table from spec §4.3 ("Weather"), applied like a
/// restriction on every segment simultaneously.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Normal,
    HeavyRain,
    Fog,
    Snow,
    HighWind,
}

impl WeatherCondition {
    pub fn speed_factor(self) -> f64 {
        match self {
            WeatherCondition::Normal => 1.0,
            WeatherCondition::HeavyRain => 0.7,
            WeatherCondition::Fog => 0.5,
            WeatherCondition::Snow => 0.6,
            WeatherCondition::HighWind => 0.8,
        }
    }
}

/// Opt-in augmentation inputs for the Advanced Constraint Builder (spec
/// §4.3). The distilled spec is silent on their wire shape; this mirrors
/// the parameters `original_source/opt-engine/src/advanced_constraints.py`
/// takes for each augmentation function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvancedOptions {
    #[serde(default)]
    pub junctions: Vec<Junction>,
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub maintenance_windows: Vec<MaintenanceWindow>,
    #[serde(default)]
    pub speed_restrictions: Vec<SpeedRestriction>,
    #[serde(default)]
    pub crew_change_stations: Vec<String>,
    #[serde(default)]
    pub priority_overtaking_stations: Vec<String>,
    #[serde(default)]
    pub weather: Option<WeatherCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub trains: Vec<Train>,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default = "default_horizon")]
    pub time_horizon_minutes: u32,
    #[serde(default)]
    pub warm_start_solution: Option<Vec<ScheduleEntry>>,
    #[serde(default)]
    pub advanced: AdvancedOptions,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown station '{0}' in route of train '{1}'")]
    UnknownStation(String, String),
    #[error("no track segment connects '{0}' and '{1}' (train '{2}')")]
    MissingSegment(String, String, String),
    #[error("track '{0}' has capacity {1}, must be >= 1")]
    BadCapacity(String, i64),
    #[error("conflict '{0}' references unknown train '{1}'")]
    UnknownTrainInConflict(String, String),
    #[error("conflict '{0}' has no involved trains")]
    EmptyConflict(String),
    #[error("duplicate train id '{0}'")]
    DuplicateTrainId(String),
    #[error("duplicate segment id '{0}'")]
    DuplicateSegmentId(String),
    #[error("time horizon must be > 0")]
    BadHorizon,
}

/// The validated, immutable view of an input that the rest of the core
/// consumes. Holds the derived route-segment chains (spec §3 "Derived,
/// immutable") so no other component re-derives them.
#[derive(Debug, Clone)]
pub struct ValidatedModel {
    pub trains: Vec<Train>,
    pub tracks: Vec<Track>,
    pub conflicts: Vec<Conflict>,
    pub config: SolverConfig,
    /// train_id -> ordered chain of segment ids induced by its route.
    pub route_segments: HashMap<String, Vec<String>>,
    /// train_id -> max permitted start delay in minutes, `min(120, H/2)`.
    pub max_start_delay: HashMap<String, u32>,
    pub base_instant: DateTime<Utc>,
    pub advanced: AdvancedOptions,
}

impl ValidatedModel {
    pub fn build(
        trains: Vec<Train>,
        tracks: Vec<Track>,
        conflicts: Vec<Conflict>,
        config: SolverConfig,
    ) -> Result<Self, ValidationError> {
        Self::build_with_advanced(trains, tracks, conflicts, config, AdvancedOptions::default())
    }

    pub fn build_with_advanced(
        trains: Vec<Train>,
        tracks: Vec<Track>,
        conflicts: Vec<Conflict>,
        config: SolverConfig,
        advanced: AdvancedOptions,
    ) -> Result<Self, ValidationError> {
        if config.time_horizon_minutes == 0 {
            return Err(ValidationError::BadHorizon);
        }

        let mut seen_trains = HashSet::new();
        for t in &trains {
            if !seen_trains.insert(t.train_id.clone()) {
                return Err(ValidationError::DuplicateTrainId(t.train_id.clone()));
            }
        }

        let mut seen_segments = HashSet::new();
        for t in &tracks {
            if !seen_segments.insert(t.segment_id.clone()) {
                return Err(ValidationError::DuplicateSegmentId(t.segment_id.clone()));
            }
            if t.capacity < 1 {
                return Err(ValidationError::BadCapacity(
                    t.segment_id.clone(),
                    t.capacity as i64,
                ));
            }
        }

        let known_stations: HashSet<&str> = tracks
            .iter()
            .flat_map(|t| [t.from_station.as_str(), t.to_station.as_str()])
            .collect();

        let mut route_segments = HashMap::new();
        let mut max_start_delay = HashMap::new();

        for train in &trains {
            for station in &train.route {
                if !known_stations.contains(station.as_str()) {
                    return Err(ValidationError::UnknownStation(
                        station.clone(),
                        train.train_id.clone(),
                    ));
                }
            }

            let mut chain = Vec::new();
            for pair in train.route.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                // Tie-break: lowest segment id among candidates (spec §4.2).
                let mut candidates: Vec<&Track> =
                    tracks.iter().filter(|t| t.connects(a, b)).collect();
                candidates.sort_by(|x, y| x.segment_id.cmp(&y.segment_id));
                match candidates.first() {
                    Some(track) => chain.push(track.segment_id.clone()),
                    None => {
                        return Err(ValidationError::MissingSegment(
                            a.clone(),
                            b.clone(),
                            train.train_id.clone(),
                        ))
                    }
                }
            }
            route_segments.insert(train.train_id.clone(), chain);

            let max_delay = 120.min(config.time_horizon_minutes / 2);
            max_start_delay.insert(train.train_id.clone(), max_delay);
        }

        for conflict in &conflicts {
            if conflict.train_ids.is_empty() {
                return Err(ValidationError::EmptyConflict(conflict.conflict_id.clone()));
            }
            for train_id in &conflict.train_ids {
                if !seen_trains.contains(train_id) {
                    return Err(ValidationError::UnknownTrainInConflict(
                        conflict.conflict_id.clone(),
                        train_id.clone(),
                    ));
                }
            }
        }

        // Single time origin for the whole grid: midnight UTC of the
        // earliest scheduled arrival, falling back to "now" truncated to
        // midnight when there are no trains. The source mixed two
        // different origins (solve-start "now" for extraction, midnight
        // for scheduled-start conversion); this picks one for both.
        let base_instant = trains
            .iter()
            .map(|t| t.scheduled_arrival)
            .min()
            .unwrap_or_else(Utc::now)
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc();

        for junction in &advanced.junctions {
            for seg in &junction.segment_ids {
                if !seen_segments.contains(seg) {
                    return Err(ValidationError::MissingSegment(
                        junction.junction_id.clone(),
                        seg.clone(),
                        "<junction>".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            trains,
            tracks,
            conflicts,
            config,
            route_segments,
            max_start_delay,
            base_instant,
            advanced,
        })
    }

    /// Scheduled start tick for a train, or `None` if it falls outside the
    /// grid (treated as unconstrained, spec §4.2 C6).
    pub fn scheduled_start_tick(&self, train: &Train) -> Option<i64> {
        let minutes = (train.scheduled_arrival - self.base_instant).num_minutes();
        let step = self.config.time_step_minutes.max(1) as i64;
        let tick = minutes / step;
        if tick >= 0 && (tick as u64) < self.config.tick_count() as u64 {
            Some(tick)
        } else {
            None
        }
    }

    pub fn find_track(&self, segment_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.segment_id == segment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track(id: &str, a: &str, b: &str) -> Track {
        Track {
            segment_id: id.to_string(),
            from_station: a.to_string(),
            to_station: b.to_string(),
            capacity: 1,
            headway_minutes: 5,
            length_km: 10.0,
            max_speed_kmh: 100.0,
        }
    }

    fn sample_train(id: &str, route: &[&str]) -> Train {
        Train {
            train_id: id.to_string(),
            current_position: route[0].to_string(),
            scheduled_arrival: Utc::now(),
            actual_arrival: None,
            priority: 1,
            delay_minutes: 0,
            destination: route.last().unwrap().to_string(),
            route: route.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn derives_route_segments_in_order() {
        let tracks = vec![sample_track("K1", "A", "B"), sample_track("K2", "B", "C")];
        let trains = vec![sample_train("T1", &["A", "B", "C"])];
        let model = ValidatedModel::build(trains, tracks, vec![], SolverConfig::default()).unwrap();
        assert_eq!(model.route_segments["T1"], vec!["K1", "K2"]);
    }

    #[test]
    fn rejects_unknown_station() {
        let tracks = vec![sample_track("K1", "A", "B")];
        let trains = vec![sample_train("T1", &["A", "Z"])];
        let err = ValidatedModel::build(trains, tracks, vec![], SolverConfig::default()).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownStation(_, _)));
    }

    #[test]
    fn rejects_missing_segment() {
        let tracks = vec![sample_track("K1", "A", "B"), sample_track("K2", "C", "D")];
        let trains = vec![sample_train("T1", &["A", "B", "C"])];
        let err = ValidatedModel::build(trains, tracks, vec![], SolverConfig::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingSegment(_, _, _)));
    }

    #[test]
    fn tie_breaks_on_lowest_segment_id() {
        let tracks = vec![sample_track("K9", "A", "B"), sample_track("K2", "A", "B")];
        let trains = vec![sample_train("T1", &["A", "B"])];
        let model = ValidatedModel::build(trains, tracks, vec![], SolverConfig::default()).unwrap();
        assert_eq!(model.route_segments["T1"], vec!["K2"]);
    }

    #[test]
    fn max_start_delay_is_capped_at_120() {
        let tracks = vec![sample_track("K1", "A", "B")];
        let trains = vec![sample_train("T1", &["A", "B"])];
        let mut config = SolverConfig::default();
        config.time_horizon_minutes = 480;
        let model = ValidatedModel::build(trains, tracks, vec![], config).unwrap();
        assert_eq!(model.max_start_delay["T1"], 120);
    }
}
