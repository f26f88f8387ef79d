use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};

/// Named real-valued parameters of a system, kept in declaration order.
///
/// A run receives its own copy; nothing mutates the catalog's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    entries: Vec<(String, f64)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Looks up a parameter that `system` is expected to declare.
    pub fn require(&self, system: &str, name: &str) -> Result<f64> {
        self.get(name).ok_or_else(|| SimulationError::UnknownParameter {
            system: system.to_string(),
            name: name.to_string(),
        })
    }

    /// Returns a copy with `overrides` applied.
    ///
    /// Every override must name an existing parameter; the first unknown name
    /// fails the whole call and `self` is left untouched.
    pub fn with_overrides(&self, system: &str, overrides: &[(String, f64)]) -> Result<Self> {
        let mut next = self.clone();
        for (name, value) in overrides {
            let slot = next
                .entries
                .iter_mut()
                .find(|(key, _)| key == name)
                .ok_or_else(|| SimulationError::UnknownParameter {
                    system: system.to_string(),
                    name: name.clone(),
                })?;
            slot.1 = *value;
        }
        Ok(next)
    }
}
