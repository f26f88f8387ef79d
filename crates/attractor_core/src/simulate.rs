//! The single entry point renderers call: name in, trajectory out.

use crate::catalog::{catalog, SystemCatalog};
use crate::error::{Result, SimulationError};
use crate::integration::{AdaptiveIntegrator, FixedStepIntegrator, MapIterator};
use crate::systems::{Model, SystemKind};
use crate::traits::DynamicalSystem;
use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

/// Which driver advances the run, with its settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StepConfig {
    Fixed(FixedStepIntegrator),
    Adaptive(AdaptiveIntegrator),
    Iterate(MapIterator),
    /// Use the catalog entry's own defaults.
    #[default]
    Recommended,
}

impl StepConfig {
    /// The system kind this configuration can drive, or `None` for `Recommended`.
    pub fn kind(&self) -> Option<SystemKind> {
        match self {
            StepConfig::Fixed(_) | StepConfig::Adaptive(_) => Some(SystemKind::Flow),
            StepConfig::Iterate(_) => Some(SystemKind::Map),
            StepConfig::Recommended => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            StepConfig::Fixed(fixed) => fixed.validate(),
            StepConfig::Adaptive(adaptive) => adaptive.validate(),
            StepConfig::Iterate(iterate) => iterate.validate(),
            StepConfig::Recommended => Ok(()),
        }
    }
}

/// Everything a caller may change about a catalog system for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationRequest {
    pub parameters: Vec<(String, f64)>,
    pub initial_state: Option<Vec<f64>>,
    pub step: StepConfig,
}

impl SimulationRequest {
    pub fn with_parameter(mut self, name: &str, value: f64) -> Self {
        self.parameters.push((name.to_string(), value));
        self
    }

    pub fn with_initial_state(mut self, state: Vec<f64>) -> Self {
        self.initial_state = Some(state);
        self
    }

    pub fn with_step(mut self, step: StepConfig) -> Self {
        self.step = step;
        self
    }
}

/// A request resolved against the catalog and checked, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRun {
    pub name: &'static str,
    pub model: Model,
    pub initial_state: Vec<f64>,
    /// Never `Recommended`; that is replaced by the catalog defaults.
    pub step: StepConfig,
}

impl PreparedRun {
    pub fn run(&self) -> Result<Trajectory> {
        log::debug!(
            "simulating {} ({:?}), step {:?}",
            self.name,
            self.model.kind(),
            StepSummary(&self.step)
        );
        match &self.step {
            StepConfig::Fixed(fixed) => fixed.integrate(&self.model, &self.initial_state),
            StepConfig::Adaptive(adaptive) => adaptive.integrate(&self.model, &self.initial_state),
            StepConfig::Iterate(iterate) => iterate.iterate(&self.model, &self.initial_state),
            StepConfig::Recommended => Err(SimulationError::step_config(
                "recommended configuration did not resolve",
            )),
        }
    }
}

/// Runs `name` from the process-wide catalog.
pub fn simulate(name: &str, request: &SimulationRequest) -> Result<Trajectory> {
    simulate_with(catalog(), name, request)
}

/// Runs `name` from `catalog`.
pub fn simulate_with(
    catalog: &SystemCatalog,
    name: &str,
    request: &SimulationRequest,
) -> Result<Trajectory> {
    prepare_with(catalog, name, request)?.run()
}

pub fn prepare(name: &str, request: &SimulationRequest) -> Result<PreparedRun> {
    prepare_with(catalog(), name, request)
}

/// Resolves `request` against `catalog`.
///
/// Every configuration error is reported here, before the first step is
/// taken. The catalog entry is only read; overrides apply to this run alone.
pub fn prepare_with(
    catalog: &SystemCatalog,
    name: &str,
    request: &SimulationRequest,
) -> Result<PreparedRun> {
    let definition = catalog.lookup(name)?;
    let parameters = definition
        .parameters
        .with_overrides(definition.name, &request.parameters)?;
    let model = definition.id.build(&parameters)?;

    let initial_state = request
        .initial_state
        .clone()
        .unwrap_or_else(|| definition.initial_state.clone());
    let dim = DynamicalSystem::<f64>::dimension(&model);
    if initial_state.len() != dim {
        return Err(SimulationError::DimensionMismatch {
            expected: dim,
            actual: initial_state.len(),
        });
    }

    let step = match &request.step {
        StepConfig::Recommended => definition.defaults.step_config(),
        explicit => explicit.clone(),
    };
    if step.kind() != Some(definition.kind) {
        return Err(SimulationError::KindMismatch {
            system: definition.name.to_string(),
            kind: definition.kind,
        });
    }
    step.validate()?;
    if !request.parameters.is_empty() {
        log::debug!("{} overrides: {:?}", definition.name, request.parameters);
    }

    Ok(PreparedRun {
        name: definition.name,
        model,
        initial_state,
        step,
    })
}

/// Log-friendly view that omits the evaluation grid.
struct StepSummary<'a>(&'a StepConfig);

impl std::fmt::Debug for StepSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            StepConfig::Fixed(fixed) => write!(
                f,
                "fixed {:?} h={} steps={}",
                fixed.method, fixed.step_size, fixed.steps
            ),
            StepConfig::Adaptive(adaptive) => write!(
                f,
                "adaptive {:?} [{}, {}] samples={}",
                adaptive.method,
                adaptive.t_start,
                adaptive.t_end,
                adaptive.t_eval.len()
            ),
            StepConfig::Iterate(iterate) => write!(f, "iterate n={}", iterate.iterations),
            StepConfig::Recommended => write!(f, "recommended"),
        }
    }
}
