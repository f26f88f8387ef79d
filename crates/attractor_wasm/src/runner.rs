//! Batched runs for progressive rendering.

use crate::simulation::{js_error, parse_request};
use anyhow::{bail, Result};
use attractor_core::integration::FixedStepMethod;
use attractor_core::simulate::{prepare, SimulationRequest, StepConfig};
use attractor_core::solvers::{DiscreteMap, Euler, RK4};
use attractor_core::systems::Model;
use attractor_core::traits::Steppable;
use js_sys::Float64Array;
use wasm_bindgen::prelude::*;

enum BatchStepper {
    Euler(Euler<f64>),
    Rk4(RK4<f64>),
    Discrete(DiscreteMap<f64>),
}

impl BatchStepper {
    fn step(&mut self, model: &Model, t: &mut f64, state: &mut [f64], dt: f64) {
        match self {
            BatchStepper::Euler(s) => s.step(model, t, state, dt),
            BatchStepper::Rk4(s) => s.step(model, t, state, dt),
            BatchStepper::Discrete(s) => s.step(model, t, state, dt),
        }
    }
}

/// A fixed-step or map run advanced a batch at a time.
///
/// Concatenating `initial_state` with every batch reproduces the flat states
/// of the equivalent one-shot run bit for bit.
pub(crate) struct RunnerState {
    model: Model,
    stepper: BatchStepper,
    initial_state: Vec<f64>,
    state: Vec<f64>,
    step_size: f64,
    steps_done: usize,
    total_steps: usize,
}

impl RunnerState {
    pub(crate) fn from_request(name: &str, request: &SimulationRequest) -> Result<Self> {
        let run = prepare(name, request)?;
        let dim = run.initial_state.len();
        let (stepper, step_size, total_steps) = match run.step {
            StepConfig::Fixed(fixed) => {
                let stepper = match fixed.method {
                    FixedStepMethod::Euler => BatchStepper::Euler(Euler::new(dim)),
                    FixedStepMethod::Rk4 => BatchStepper::Rk4(RK4::new(dim)),
                };
                (stepper, fixed.step_size, fixed.steps)
            }
            StepConfig::Iterate(iterate) => (
                BatchStepper::Discrete(DiscreteMap::new(dim)),
                1.0,
                iterate.iterations,
            ),
            StepConfig::Adaptive(_) | StepConfig::Recommended => {
                bail!("Batched runs of '{name}' need a fixed-step or iterate configuration.")
            }
        };
        log::debug!("batched run of {name}: {total_steps} steps of {step_size}");

        Ok(Self {
            model: run.model,
            stepper,
            state: run.initial_state.clone(),
            initial_state: run.initial_state,
            step_size,
            steps_done: 0,
            total_steps,
        })
    }

    /// Advances up to `batch_size` steps and returns the new states, row-major.
    pub(crate) fn advance(&mut self, batch_size: usize) -> Vec<f64> {
        let remaining = self.total_steps - self.steps_done;
        let count = batch_size.min(remaining);
        let mut produced = Vec::with_capacity(count * self.state.len());
        for _ in 0..count {
            let mut t = self.steps_done as f64 * self.step_size;
            self.stepper
                .step(&self.model, &mut t, &mut self.state, self.step_size);
            self.steps_done += 1;
            produced.extend_from_slice(&self.state);
        }
        produced
    }

    pub(crate) fn is_done(&self) -> bool {
        self.steps_done >= self.total_steps
    }
}

#[wasm_bindgen]
pub struct WasmTrajectoryRunner {
    state: RunnerState,
}

#[wasm_bindgen]
impl WasmTrajectoryRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, request: JsValue) -> Result<WasmTrajectoryRunner, JsValue> {
        console_error_panic_hook::set_once();
        let request = parse_request(request)?;
        let state = RunnerState::from_request(name, &request).map_err(js_error)?;
        Ok(WasmTrajectoryRunner { state })
    }

    pub fn dimension(&self) -> usize {
        self.state.state.len()
    }

    pub fn initial_state(&self) -> Float64Array {
        Float64Array::from(self.state.initial_state.as_slice())
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Float64Array {
        let produced = self.state.advance(batch_size as usize);
        Float64Array::from(produced.as_slice())
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn current_step(&self) -> usize {
        self.state.steps_done
    }

    pub fn total_steps(&self) -> usize {
        self.state.total_steps
    }

    /// Time of the latest sample; the iteration index for maps.
    pub fn time(&self) -> f64 {
        self.state.steps_done as f64 * self.state.step_size
    }
}
