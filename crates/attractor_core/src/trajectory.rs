use crate::error::{Result, SimulationError};
use serde::Serialize;
use std::slice::ChunksExact;

/// How a run ended.
///
/// Fixed-step and map runs always complete, even when their states blow up.
/// Adaptive runs stop early on a non-finite sample or when the error
/// controller cannot find a usable step; the trajectory then holds every
/// sample produced before that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Diverged { time: f64 },
    StepSizeUnderflow { time: f64 },
}

/// Ordered states of one simulation run and the time (or iteration index) of each.
///
/// States are stored row-major in a single flat buffer. A trajectory is
/// immutable once built; renderers only get read access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    dimension: usize,
    times: Vec<f64>,
    states: Vec<f64>,
    termination: Termination,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn state(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.dimension)?;
        self.states.get(start..start + self.dimension)
    }

    pub fn states(&self) -> ChunksExact<'_, f64> {
        self.states.chunks_exact(self.dimension)
    }

    /// The flat row-major state buffer, `len() * dimension()` values.
    pub fn as_flat(&self) -> &[f64] {
        &self.states
    }

    /// One coordinate across all samples, e.g. the `x` column of a Lorenz run.
    pub fn component(&self, axis: usize) -> Vec<f64> {
        if axis >= self.dimension {
            return Vec::new();
        }
        self.states().map(|state| state[axis]).collect()
    }

    pub fn last_state(&self) -> Option<&[f64]> {
        self.len().checked_sub(1).and_then(|last| self.state(last))
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Completed
    }

    /// Index of the first sample with a NaN or infinite component.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.states()
            .position(|state| state.iter().any(|value| !value.is_finite()))
    }
}

/// Append-only accumulator used while a run is in progress.
#[derive(Debug, Clone)]
pub struct TrajectoryBuilder {
    dimension: usize,
    times: Vec<f64>,
    states: Vec<f64>,
}

impl TrajectoryBuilder {
    /// Reserves room for `samples` states up front.
    ///
    /// Fails instead of aborting when the buffers cannot be allocated.
    pub fn with_capacity(dimension: usize, samples: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(SimulationError::EmptyState);
        }
        let too_large = || {
            SimulationError::step_config(format!(
                "{samples} samples of dimension {dimension} do not fit in memory"
            ))
        };
        let values = samples
            .checked_mul(dimension)
            .filter(|&n| n <= isize::MAX as usize / std::mem::size_of::<f64>())
            .ok_or_else(too_large)?;

        let mut times = Vec::new();
        times.try_reserve_exact(samples).map_err(|_| too_large())?;
        let mut states = Vec::new();
        states.try_reserve_exact(values).map_err(|_| too_large())?;
        Ok(Self {
            dimension,
            times,
            states,
        })
    }

    pub fn push(&mut self, time: f64, state: &[f64]) {
        debug_assert_eq!(state.len(), self.dimension, "state dimension changed mid-run");
        self.times.push(time);
        self.states.extend_from_slice(state);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn finish(self, termination: Termination) -> Trajectory {
        Trajectory {
            dimension: self.dimension,
            times: self.times,
            states: self.states,
            termination,
        }
    }
}
