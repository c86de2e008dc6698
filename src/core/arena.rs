//! Variable Arena (spec §4.1).
//!
//! Materializes the five decision variable families over the discrete time
//! grid and exposes them via stable coordinates. Per the design note in
//! spec §9 ("flat arena keyed by packed integer tuples"), string ids are
//! resolved to dense indices once, up front, and every family is keyed on
//! those indices rather than on strings.

use std::collections::HashMap;

use good_lp::{variable, ProblemVariables, Variable};

use crate::models::input::ValidatedModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrainIx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackIx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConflictIx(pub usize);

pub struct VariableArena {
    pub vars: ProblemVariables,

    train_index: HashMap<String, TrainIx>,
    track_index: HashMap<String, TrackIx>,
    conflict_index: HashMap<String, ConflictIx>,

    /// Sparse occupancy: only materialized for (train, track) pairs that
    /// the caller has asked for, via `ensure_occupancy` — the train's own
    /// route chain by default, plus any pair an advanced-constraint
    /// builder forces into existence (spec §4.1 "Materialization policy").
    x: HashMap<(TrainIx, TrackIx, usize), Variable>,

    s: Vec<Variable>,
    c: Vec<Variable>,
    p: HashMap<(TrainIx, String), Variable>,
    j: Vec<Variable>,

    pub tick_count: usize,
}

impl VariableArena {
    pub fn new(model: &ValidatedModel) -> Self {
        let mut vars = ProblemVariables::new();
        let tick_count = model.config.tick_count();

        let mut train_index = HashMap::new();
        for (ix, t) in model.trains.iter().enumerate() {
            train_index.insert(t.train_id.clone(), TrainIx(ix));
        }

        let mut track_index = HashMap::new();
        for (ix, t) in model.tracks.iter().enumerate() {
            track_index.insert(t.segment_id.clone(), TrackIx(ix));
        }

        let mut conflict_index = HashMap::new();
        for (ix, q) in model.conflicts.iter().enumerate() {
            conflict_index.insert(q.conflict_id.clone(), ConflictIx(ix));
        }

        let s: Vec<Variable> = model
            .trains
            .iter()
            .map(|t| {
                let max_delay = model.max_start_delay[&t.train_id] as f64;
                vars.add(variable().integer().min(0.0).max(max_delay))
            })
            .collect();

        let c: Vec<Variable> = model
            .conflicts
            .iter()
            .map(|_| vars.add(variable().binary()))
            .collect();

        let j: Vec<Variable> = model
            .trains
            .iter()
            .map(|_| vars.add(variable().integer().min(0.0).max(tick_count as f64)))
            .collect();

        let mut p = HashMap::new();
        for t in &model.trains {
            let stations: std::collections::BTreeSet<&String> = t.route.iter().collect();
            for station in stations {
                p.entry((train_index[&t.train_id], station.clone()))
                    .or_insert_with(|| vars.add(variable().integer().min(1.0).max(10.0)));
            }
        }

        let mut arena = Self {
            vars,
            train_index,
            track_index,
            conflict_index,
            x: HashMap::new(),
            s,
            c,
            p,
            j,
            tick_count,
        };

        // Sparse x: only on each train's induced segment chain.
        for t in &model.trains {
            let tix = arena.train_index[&t.train_id];
            for seg in &model.route_segments[&t.train_id] {
                let kix = arena.track_index[seg];
                arena.ensure_occupancy(tix, kix);
            }
        }

        arena
    }

    pub fn train_ix(&self, train_id: &str) -> Option<TrainIx> {
        self.train_index.get(train_id).copied()
    }

    pub fn track_ix(&self, segment_id: &str) -> Option<TrackIx> {
        self.track_index.get(segment_id).copied()
    }

    pub fn conflict_ix(&self, conflict_id: &str) -> Option<ConflictIx> {
        self.conflict_index.get(conflict_id).copied()
    }

    /// Materializes `x[t,k,τ]` for every tick if it doesn't exist yet.
    /// Idempotent: the same (train, track) pair always returns the same
    /// set of variables (spec §4.1 "Arena guarantees").
    pub fn ensure_occupancy(&mut self, t: TrainIx, k: TrackIx) {
        if self.x.contains_key(&(t, k, 0)) {
            return;
        }
        for tau in 0..self.tick_count {
            let v = self.vars.add(variable().binary());
            self.x.insert((t, k, tau), v);
        }
    }

    pub fn occupancy(&self, t: TrainIx, k: TrackIx, tau: usize) -> Option<Variable> {
        self.x.get(&(t, k, tau)).copied()
    }

    pub fn has_occupancy(&self, t: TrainIx, k: TrackIx) -> bool {
        self.x.contains_key(&(t, k, 0))
    }

    pub fn occupancy_pairs(&self) -> impl Iterator<Item = (TrainIx, TrackIx)> + '_ {
        let mut seen = std::collections::BTreeSet::new();
        for (t, k, _) in self.x.keys() {
            seen.insert((*t, *k));
        }
        seen.into_iter()
    }

    pub fn delay(&self, t: TrainIx) -> Variable {
        self.s[t.0]
    }

    pub fn conflict(&self, q: ConflictIx) -> Variable {
        self.c[q.0]
    }

    pub fn completion(&self, t: TrainIx) -> Variable {
        self.j[t.0]
    }

    pub fn platform(&self, t: TrainIx, station: &str) -> Option<Variable> {
        self.p.get(&(t, station.to_string())).copied()
    }

    pub fn platform_vars(&self) -> impl Iterator<Item = (&(TrainIx, String), &Variable)> {
        self.p.iter()
    }
}
