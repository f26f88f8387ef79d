//! Run drivers that turn a system and an initial state into a [`Trajectory`].
//!
//! The integrator structs are plain settings. They own no buffers between
//! calls, so one instance can drive any number of independent runs.

use crate::error::{Result, SimulationError};
use crate::solvers::adaptive::{DormandPrince45, StepController, Tolerances, Tsit5};
use crate::solvers::{DiscreteMap, Euler, RK4};
use crate::traits::{AdaptiveSteppable, DynamicalSystem, Steppable, TrialStep};
use crate::trajectory::{Termination, Trajectory, TrajectoryBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedStepMethod {
    #[default]
    Euler,
    Rk4,
}

enum FixedStepper {
    Euler(Euler<f64>),
    Rk4(RK4<f64>),
}

impl FixedStepper {
    fn build(method: FixedStepMethod, dim: usize) -> Self {
        match method {
            FixedStepMethod::Euler => FixedStepper::Euler(Euler::new(dim)),
            FixedStepMethod::Rk4 => FixedStepper::Rk4(RK4::new(dim)),
        }
    }

    fn step(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        dt: f64,
    ) {
        match self {
            FixedStepper::Euler(s) => s.step(system, t, state, dt),
            FixedStepper::Rk4(s) => s.step(system, t, state, dt),
        }
    }
}

fn check_dimension(expected: usize, initial_state: &[f64]) -> Result<()> {
    if expected == 0 {
        return Err(SimulationError::EmptyState);
    }
    if initial_state.len() != expected {
        return Err(SimulationError::DimensionMismatch {
            expected,
            actual: initial_state.len(),
        });
    }
    Ok(())
}

fn sample_count(steps: usize) -> Result<usize> {
    steps
        .checked_add(1)
        .ok_or_else(|| SimulationError::step_config("step count overflows the sample count"))
}

/// Fixed-step integration over `steps` steps of `step_size`.
///
/// Produces `steps + 1` samples with `times[k] == k as f64 * step_size`.
/// With the default Euler method each sample is
/// `states[k] = states[k-1] + h * f(times[k-1], states[k-1])`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedStepIntegrator {
    pub step_size: f64,
    pub steps: usize,
    pub method: FixedStepMethod,
}

impl Default for FixedStepIntegrator {
    fn default() -> Self {
        Self {
            step_size: 0.01,
            steps: 10_000,
            method: FixedStepMethod::Euler,
        }
    }
}

impl FixedStepIntegrator {
    pub fn new(step_size: f64, steps: usize) -> Self {
        Self {
            step_size,
            steps,
            method: FixedStepMethod::Euler,
        }
    }

    pub fn with_method(mut self, method: FixedStepMethod) -> Self {
        self.method = method;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(SimulationError::step_config(format!(
                "step size must be finite and positive, got {}",
                self.step_size
            )));
        }
        sample_count(self.steps)?;
        Ok(())
    }

    pub fn integrate<S: DynamicalSystem<f64>>(
        &self,
        system: &S,
        initial_state: &[f64],
    ) -> Result<Trajectory> {
        self.validate()?;
        let dim = system.dimension();
        check_dimension(dim, initial_state)?;

        let h = self.step_size;
        let samples = sample_count(self.steps)?;
        let mut builder = TrajectoryBuilder::with_capacity(dim, samples)?;
        let mut stepper = FixedStepper::build(self.method, dim);
        let mut state = initial_state.to_vec();
        builder.push(0.0, &state);

        for k in 1..=self.steps {
            let mut t = (k - 1) as f64 * h;
            stepper.step(system, &mut t, &mut state, h);
            builder.push(k as f64 * h, &state);
        }

        Ok(builder.finish(Termination::Completed))
    }
}

/// Repeated application of a map for `iterations` iterations.
///
/// Produces `iterations + 1` samples; `times[k]` is the iteration index `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapIterator {
    pub iterations: usize,
}

impl Default for MapIterator {
    fn default() -> Self {
        Self { iterations: 1_000 }
    }
}

impl MapIterator {
    pub fn new(iterations: usize) -> Self {
        Self { iterations }
    }

    pub fn validate(&self) -> Result<()> {
        sample_count(self.iterations).map(|_| ())
    }

    pub fn iterate<S: DynamicalSystem<f64>>(
        &self,
        map: &S,
        initial_state: &[f64],
    ) -> Result<Trajectory> {
        self.validate()?;
        let dim = map.dimension();
        check_dimension(dim, initial_state)?;

        let samples = sample_count(self.iterations)?;
        let mut builder = TrajectoryBuilder::with_capacity(dim, samples)?;
        let mut stepper = DiscreteMap::new(dim);
        let mut state = initial_state.to_vec();
        builder.push(0.0, &state);

        for k in 1..=self.iterations {
            let mut t = (k - 1) as f64;
            stepper.step(map, &mut t, &mut state, 1.0);
            builder.push(k as f64, &state);
        }

        Ok(builder.finish(Termination::Completed))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveMethod {
    #[default]
    DormandPrince45,
    Tsit5,
}

enum AdaptiveStepper {
    DormandPrince45(DormandPrince45<f64>),
    Tsit5(Tsit5<f64>),
}

impl AdaptiveStepper {
    fn build(method: AdaptiveMethod, dim: usize) -> Self {
        match method {
            AdaptiveMethod::DormandPrince45 => {
                AdaptiveStepper::DormandPrince45(DormandPrince45::new(dim))
            }
            AdaptiveMethod::Tsit5 => AdaptiveStepper::Tsit5(Tsit5::new(dim)),
        }
    }

    fn error_exponent(&self) -> f64 {
        match self {
            AdaptiveStepper::DormandPrince45(s) => s.error_exponent(),
            AdaptiveStepper::Tsit5(s) => s.error_exponent(),
        }
    }

    fn try_step(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: f64,
        state: &[f64],
        dt: f64,
        tolerances: &Tolerances,
        proposal: &mut [f64],
    ) -> TrialStep<f64> {
        match self {
            AdaptiveStepper::DormandPrince45(s) => {
                s.try_step(system, t, state, dt, tolerances, proposal)
            }
            AdaptiveStepper::Tsit5(s) => s.try_step(system, t, state, dt, tolerances, proposal),
        }
    }
}

/// Error-controlled integration over `[t_start, t_end]`, sampled at `t_eval`.
///
/// Internal steps are clipped so that every requested time is hit exactly;
/// `times` of the result equals `t_eval` (or a prefix of it when the run stops
/// early, see [`Termination`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveIntegrator {
    pub t_start: f64,
    pub t_end: f64,
    pub t_eval: Vec<f64>,
    pub method: AdaptiveMethod,
    pub tolerances: Tolerances,
    pub controller: StepController,
    /// First trial step. Estimated from the initial derivative when absent.
    pub initial_step: Option<f64>,
    pub min_step: f64,
    pub max_step: Option<f64>,
}

impl Default for AdaptiveIntegrator {
    fn default() -> Self {
        Self::uniform(0.0, 50.0, 5_000)
    }
}

impl AdaptiveIntegrator {
    /// `samples` evenly spaced evaluation times covering both endpoints.
    pub fn uniform(t_start: f64, t_end: f64, samples: usize) -> Self {
        Self {
            t_start,
            t_end,
            t_eval: linspace(t_start, t_end, samples),
            method: AdaptiveMethod::default(),
            tolerances: Tolerances::default(),
            controller: StepController::default(),
            initial_step: None,
            min_step: 1e-12,
            max_step: None,
        }
    }

    pub fn with_method(mut self, method: AdaptiveMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.tolerances = Tolerances { rtol, atol };
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.t_start.is_finite() || !self.t_end.is_finite() {
            return Err(SimulationError::step_config("time span must be finite"));
        }
        if self.t_end < self.t_start {
            return Err(SimulationError::step_config(format!(
                "time span is reversed: [{}, {}]",
                self.t_start, self.t_end
            )));
        }
        if self.t_eval.is_empty() {
            return Err(SimulationError::step_config("evaluation times are empty"));
        }
        if self
            .t_eval
            .iter()
            .any(|&t| !t.is_finite() || t < self.t_start || t > self.t_end)
        {
            return Err(SimulationError::step_config(
                "evaluation times must lie inside the time span",
            ));
        }
        if self.t_eval.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(SimulationError::step_config(
                "evaluation times must be strictly increasing",
            ));
        }
        let Tolerances { rtol, atol } = self.tolerances;
        if !(rtol.is_finite() && rtol > 0.0 && atol.is_finite() && atol > 0.0) {
            return Err(SimulationError::step_config(
                "tolerances must be finite and positive",
            ));
        }
        if !self.min_step.is_finite() || self.min_step <= 0.0 {
            return Err(SimulationError::step_config("min_step must be finite and positive"));
        }
        for (label, value) in [("initial_step", self.initial_step), ("max_step", self.max_step)] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return Err(SimulationError::step_config(format!(
                        "{label} must be finite and positive"
                    )));
                }
            }
        }
        let StepController {
            safety,
            min_factor,
            max_factor,
        } = self.controller;
        let safety_ok = safety > 0.0 && safety <= 1.0;
        let factors_ok = min_factor > 0.0 && min_factor < 1.0 && max_factor > 1.0;
        if !(safety_ok && factors_ok && max_factor.is_finite()) {
            return Err(SimulationError::step_config(
                "controller needs 0 < safety <= 1 and min_factor < 1 < max_factor",
            ));
        }
        Ok(())
    }

    pub fn integrate<S: DynamicalSystem<f64>>(
        &self,
        system: &S,
        initial_state: &[f64],
    ) -> Result<Trajectory> {
        self.validate()?;
        let dim = system.dimension();
        check_dimension(dim, initial_state)?;

        let mut builder = TrajectoryBuilder::with_capacity(dim, self.t_eval.len())?;
        if initial_state.iter().any(|value| !value.is_finite()) {
            log::warn!("adaptive run started from a non-finite state");
            return Ok(builder.finish(Termination::Diverged { time: self.t_start }));
        }

        let max_step = self.max_step.unwrap_or(f64::INFINITY);
        let mut stepper = AdaptiveStepper::build(self.method, dim);
        let exponent = stepper.error_exponent();
        let mut t = self.t_start;
        let mut state = initial_state.to_vec();
        let mut proposal = vec![0.0; dim];
        let mut h = self
            .initial_step
            .unwrap_or_else(|| self.estimate_initial_step(system, t, &state))
            .min(max_step);
        let mut termination = Termination::Completed;
        let mut rejected = 0usize;

        'samples: for &target in &self.t_eval {
            while t < target {
                let remaining = target - t;
                let h_try = h.min(remaining);
                let landing = h_try >= remaining;
                if !landing && t + h_try <= t {
                    termination = Termination::StepSizeUnderflow { time: t };
                    break 'samples;
                }

                let trial =
                    stepper.try_step(system, t, &state, h_try, &self.tolerances, &mut proposal);
                if !trial.finite {
                    termination = Termination::Diverged { time: t };
                    break 'samples;
                }

                let factor = self.controller.factor(trial.error, exponent);
                if trial.error <= 1.0 {
                    t = if landing { target } else { t + h_try };
                    state.copy_from_slice(&proposal);
                    let mut grown = h_try * factor;
                    // A clipped landing step says nothing about the nominal step.
                    if h_try < h {
                        grown = grown.max(h);
                    }
                    h = grown.min(max_step);
                } else {
                    rejected += 1;
                    log::trace!("rejected step h={h_try:e} at t={t} (error {:.3})", trial.error);
                    h = h_try * factor;
                    if h < self.min_step {
                        termination = Termination::StepSizeUnderflow { time: t };
                        break 'samples;
                    }
                }
            }
            builder.push(target, &state);
        }

        if termination != Termination::Completed {
            log::warn!(
                "adaptive run stopped early ({termination:?}) after {} of {} samples",
                builder.len(),
                self.t_eval.len()
            );
        }
        log::debug!("adaptive run finished with {rejected} rejected steps");

        Ok(builder.finish(termination))
    }

    /// Initial step from the scaled size of the state and its derivative.
    fn estimate_initial_step<S: DynamicalSystem<f64>>(
        &self,
        system: &S,
        t: f64,
        state: &[f64],
    ) -> f64 {
        let mut derivative = vec![0.0; state.len()];
        system.apply(t, state, &mut derivative);

        let Tolerances { rtol, atol } = self.tolerances;
        let mut d0: f64 = 0.0;
        let mut d1: f64 = 0.0;
        for (y, f) in state.iter().zip(&derivative) {
            let scale = atol + rtol * y.abs();
            d0 = d0.max(y.abs() / scale);
            d1 = d1.max(f.abs() / scale);
        }

        let guess = if d0 < 1e-5 || d1 < 1e-5 || !d1.is_finite() {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let span = self.t_end - self.t_start;
        guess.min(span).max(self.min_step)
    }
}

fn linspace(start: f64, end: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = samples - 1;
            let width = end - start;
            (0..samples)
                .map(|i| {
                    if i == last {
                        end
                    } else {
                        start + width * (i as f64 / last as f64)
                    }
                })
                .collect()
        }
    }
}
