pub mod api;
pub mod input;
pub mod schedule;

pub use api::{HealthResponse, ScheduleResponse};
pub use input::{
    AdvancedOptions, Conflict, ConflictKind, Junction, MaintenanceWindow, ScheduleRequest,
    Signal, SignalKind, SolverConfig, SpeedRestriction, Track, Train, ValidatedModel,
    ValidationError, WeatherCondition,
};
pub use schedule::{ScheduleEntry, SolveMetrics, SolveOutcome, SolverStatus};
