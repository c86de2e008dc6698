pub mod optimization_service;

pub use optimization_service::OptimizationService;

/// Service trait for common service patterns
pub trait Service {
    fn name(&self) -> &'static str;
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure taxonomy exposed at the service boundary (spec §7): validation
/// failures, infeasible models, and solver-internal faults each map to a
/// distinct HTTP treatment in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no feasible schedule exists for this input")]
    Infeasible,

    #[error("solver fault: {0}")]
    SolverFault(String),
}
