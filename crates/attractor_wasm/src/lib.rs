//! Browser bridge for `attractor_core`.
//!
//! Requests come in as plain JS objects and trajectories go out serialized;
//! all numerics stay in the core crate.

mod runner;
mod simulation;

pub use runner::WasmTrajectoryRunner;
pub use simulation::{describe_system, list_systems, lyapunov_spectrum, simulate};
