use crate::systems::SystemKind;
use thiserror::Error;

/// Failures that stop a simulation before any state is produced.
///
/// Numerical blow-up during a run is not represented here; it is recorded on
/// the resulting trajectory (see [`crate::trajectory::Termination`]).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Unknown system '{name}'.")]
    UnknownSystem { name: String },

    #[error("Invalid step configuration: {0}")]
    InvalidStepConfig(String),

    #[error("System '{system}' has no parameter named '{name}'.")]
    UnknownParameter { system: String, name: String },

    #[error("State dimension mismatch. Expected {expected}, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("System has no state components.")]
    EmptyState,

    #[error("System '{system}' is a {kind:?} and cannot run with this step configuration.")]
    KindMismatch { system: String, kind: SystemKind },
}

pub type Result<T> = std::result::Result<T, SimulationError>;

impl SimulationError {
    pub(crate) fn step_config(message: impl Into<String>) -> Self {
        SimulationError::InvalidStepConfig(message.into())
    }
}
