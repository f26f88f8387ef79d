use crate::error::{Result, SimulationError};
use crate::integration::{AdaptiveIntegrator, FixedStepIntegrator, MapIterator};
use crate::parameters::Parameters;
use crate::simulate::StepConfig;
use crate::systems::{Model, SystemId, SystemKind};
use serde::Serialize;
use std::sync::OnceLock;

/// The run a system is normally rendered with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum IntegrationDefaults {
    Fixed(FixedStepIntegrator),
    Adaptive {
        t_start: f64,
        t_end: f64,
        samples: usize,
    },
    Iterate(MapIterator),
}

impl IntegrationDefaults {
    pub fn step_config(&self) -> StepConfig {
        match self {
            IntegrationDefaults::Fixed(fixed) => StepConfig::Fixed(*fixed),
            IntegrationDefaults::Adaptive {
                t_start,
                t_end,
                samples,
            } => StepConfig::Adaptive(AdaptiveIntegrator::uniform(*t_start, *t_end, *samples)),
            IntegrationDefaults::Iterate(iterate) => StepConfig::Iterate(*iterate),
        }
    }
}

/// Static description of a built-in system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemDefinition {
    pub id: SystemId,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: SystemKind,
    pub dimension: usize,
    pub parameters: Parameters,
    pub initial_state: Vec<f64>,
    pub defaults: IntegrationDefaults,
}

impl SystemDefinition {
    fn new(
        id: SystemId,
        description: &'static str,
        parameters: &[(&str, f64)],
        initial_state: &[f64],
        defaults: IntegrationDefaults,
    ) -> Self {
        Self {
            id,
            name: id.name(),
            description,
            kind: id.kind(),
            dimension: id.dimension(),
            parameters: Parameters::from_pairs(parameters),
            initial_state: initial_state.to_vec(),
            defaults,
        }
    }

    /// The model with this definition's default parameters.
    pub fn model(&self) -> Result<Model> {
        self.id.build(&self.parameters)
    }
}

/// Registry of the built-in systems, in registration order.
#[derive(Debug, Clone)]
pub struct SystemCatalog {
    entries: Vec<SystemDefinition>,
}

impl SystemCatalog {
    /// A fresh catalog holding every built-in system with literature defaults.
    pub fn standard() -> Self {
        let adaptive = IntegrationDefaults::Adaptive {
            t_start: 0.0,
            t_end: 50.0,
            samples: 5_000,
        };
        let entries = vec![
            SystemDefinition::new(
                SystemId::DampedDecay,
                "Fixed point attractor: exponential decay to the origin.",
                &[("rate", 0.5)],
                &[10.0],
                adaptive.clone(),
            ),
            SystemDefinition::new(
                SystemId::VanDerPol,
                "Limit cycle attractor: the Van der Pol oscillator.",
                &[("mu", 1.0)],
                &[1.0, 0.0],
                adaptive.clone(),
            ),
            SystemDefinition::new(
                SystemId::Torus,
                "Quasi-periodic torus: two independent phase rotations.",
                &[("omega1", 0.2), ("omega2", 0.5)],
                &[0.0, 0.0],
                adaptive.clone(),
            ),
            SystemDefinition::new(
                SystemId::Lorenz,
                "Chaotic attractor: the Lorenz convection model.",
                &[("sigma", 10.0), ("rho", 28.0), ("beta", 8.0 / 3.0)],
                &[0.0, 1.0, 1.05],
                IntegrationDefaults::Fixed(FixedStepIntegrator::new(0.01, 10_000)),
            ),
            SystemDefinition::new(
                SystemId::Rossler,
                "Strange attractor: the Rossler spiral.",
                &[("a", 0.2), ("b", 0.2), ("c", 5.7)],
                &[1.0, 1.0, 1.0],
                adaptive.clone(),
            ),
            SystemDefinition::new(
                SystemId::Duffing,
                "Periodically forced Duffing oscillator.",
                &[
                    ("alpha", 1.0),
                    ("beta", -1.0),
                    ("delta", 0.2),
                    ("gamma", 0.3),
                    ("omega", 1.2),
                ],
                &[0.1, 0.0],
                adaptive,
            ),
            SystemDefinition::new(
                SystemId::Henon,
                "Henon map strange attractor.",
                &[("a", 1.4), ("b", 0.3)],
                &[0.1, 0.3],
                IntegrationDefaults::Iterate(MapIterator::new(9_999)),
            ),
            SystemDefinition::new(
                SystemId::Logistic,
                "Logistic map in its chaotic regime.",
                &[("r", 3.8)],
                &[0.1],
                IntegrationDefaults::Iterate(MapIterator::new(999)),
            ),
        ];
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Result<&SystemDefinition> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| SimulationError::UnknownSystem {
                name: name.to_string(),
            })
    }

    pub fn list_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SystemDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The process-wide catalog, built on first use and never mutated afterwards.
pub fn catalog() -> &'static SystemCatalog {
    static CATALOG: OnceLock<SystemCatalog> = OnceLock::new();
    CATALOG.get_or_init(SystemCatalog::standard)
}
