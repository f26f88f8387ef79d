pub mod flows;
pub mod maps;

use crate::error::Result;
use crate::parameters::Parameters;
use crate::traits::{DynamicalSystem, Jacobian, Scalar};
use flows::{DampedDecay, Duffing, Lorenz, Rossler, Torus, VanDerPol};
use maps::{Henon, Logistic};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemKind {
    Flow,
    Map,
}

/// Identifies one of the built-in systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemId {
    DampedDecay,
    VanDerPol,
    Torus,
    Lorenz,
    Rossler,
    Duffing,
    Henon,
    Logistic,
}

impl SystemId {
    pub const ALL: [SystemId; 8] = [
        SystemId::DampedDecay,
        SystemId::VanDerPol,
        SystemId::Torus,
        SystemId::Lorenz,
        SystemId::Rossler,
        SystemId::Duffing,
        SystemId::Henon,
        SystemId::Logistic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SystemId::DampedDecay => "damped_decay",
            SystemId::VanDerPol => "van_der_pol",
            SystemId::Torus => "torus",
            SystemId::Lorenz => "lorenz",
            SystemId::Rossler => "rossler",
            SystemId::Duffing => "duffing",
            SystemId::Henon => "henon",
            SystemId::Logistic => "logistic",
        }
    }

    pub fn kind(self) -> SystemKind {
        match self {
            SystemId::Henon | SystemId::Logistic => SystemKind::Map,
            _ => SystemKind::Flow,
        }
    }

    pub fn dimension(self) -> usize {
        match self {
            SystemId::DampedDecay | SystemId::Logistic => 1,
            SystemId::VanDerPol | SystemId::Torus | SystemId::Duffing | SystemId::Henon => 2,
            SystemId::Lorenz | SystemId::Rossler => 3,
        }
    }

    /// Instantiates the model with concrete parameter values.
    pub fn build(self, params: &Parameters) -> Result<Model> {
        Ok(match self {
            SystemId::DampedDecay => Model::DampedDecay(DampedDecay::from_parameters(params)?),
            SystemId::VanDerPol => Model::VanDerPol(VanDerPol::from_parameters(params)?),
            SystemId::Torus => Model::Torus(Torus::from_parameters(params)?),
            SystemId::Lorenz => Model::Lorenz(Lorenz::from_parameters(params)?),
            SystemId::Rossler => Model::Rossler(Rossler::from_parameters(params)?),
            SystemId::Duffing => Model::Duffing(Duffing::from_parameters(params)?),
            SystemId::Henon => Model::Henon(Henon::from_parameters(params)?),
            SystemId::Logistic => Model::Logistic(Logistic::from_parameters(params)?),
        })
    }
}

/// A built-in system with its parameters bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Model {
    DampedDecay(DampedDecay),
    VanDerPol(VanDerPol),
    Torus(Torus),
    Lorenz(Lorenz),
    Rossler(Rossler),
    Duffing(Duffing),
    Henon(Henon),
    Logistic(Logistic),
}

impl Model {
    pub fn id(&self) -> SystemId {
        match self {
            Model::DampedDecay(_) => SystemId::DampedDecay,
            Model::VanDerPol(_) => SystemId::VanDerPol,
            Model::Torus(_) => SystemId::Torus,
            Model::Lorenz(_) => SystemId::Lorenz,
            Model::Rossler(_) => SystemId::Rossler,
            Model::Duffing(_) => SystemId::Duffing,
            Model::Henon(_) => SystemId::Henon,
            Model::Logistic(_) => SystemId::Logistic,
        }
    }

    pub fn kind(&self) -> SystemKind {
        self.id().kind()
    }
}

impl<T: Scalar> DynamicalSystem<T> for Model {
    fn dimension(&self) -> usize {
        self.id().dimension()
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        match self {
            Model::DampedDecay(s) => s.apply(t, x, out),
            Model::VanDerPol(s) => s.apply(t, x, out),
            Model::Torus(s) => s.apply(t, x, out),
            Model::Lorenz(s) => s.apply(t, x, out),
            Model::Rossler(s) => s.apply(t, x, out),
            Model::Duffing(s) => s.apply(t, x, out),
            Model::Henon(s) => s.apply(t, x, out),
            Model::Logistic(s) => s.apply(t, x, out),
        }
    }
}

impl Jacobian for Model {
    fn jacobian(&self, t: f64, x: &[f64], out: &mut [f64]) {
        match self {
            Model::DampedDecay(s) => s.jacobian(t, x, out),
            Model::VanDerPol(s) => s.jacobian(t, x, out),
            Model::Torus(s) => s.jacobian(t, x, out),
            Model::Lorenz(s) => s.jacobian(t, x, out),
            Model::Rossler(s) => s.jacobian(t, x, out),
            Model::Duffing(s) => s.jacobian(t, x, out),
            Model::Henon(s) => s.jacobian(t, x, out),
            Model::Logistic(s) => s.jacobian(t, x, out),
        }
    }
}
