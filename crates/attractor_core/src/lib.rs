//! The `attractor_core` crate generates trajectories of classic dynamical systems
//! for downstream renderers.
//!
//! Key components:
//! - **Traits**: `Scalar`, `DynamicalSystem` (flows and maps), `Jacobian`, `Steppable`.
//! - **Systems**: the built-in flows and maps, and the `catalog` of their defaults.
//! - **Solvers**: Euler, RK4 and embedded adaptive pairs (Dormand-Prince, Tsit5).
//! - **Integration**: fixed-step, adaptive and map-iteration drivers producing a `Trajectory`.
//! - **Simulate**: the name-based entry point combining all of the above.
//! - **Analysis**: Lyapunov spectra and attractor classification.
pub mod analysis;
pub mod catalog;
pub mod error;
pub mod integration;
pub mod parameters;
pub mod simulate;
pub mod solvers;
pub mod systems;
pub mod traits;
pub mod trajectory;

pub use catalog::{catalog, SystemCatalog, SystemDefinition};
pub use error::SimulationError;
pub use simulate::{prepare, simulate, simulate_with, PreparedRun, SimulationRequest, StepConfig};
pub use trajectory::{Termination, Trajectory};
