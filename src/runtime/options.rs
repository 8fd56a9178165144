//! Simulation settings.

use serde::{Deserialize, Serialize};

/// Settings for a simulation run.
///
/// # Example
///
/// ```rust
/// use stepsim::runtime::SimulationOptions;
///
/// let options = SimulationOptions::from_json(r#"{"max_transitions": 50}"#).unwrap();
/// assert_eq!(options.max_transitions, 50);
///
/// let defaults = SimulationOptions::from_json("{}").unwrap();
/// assert_eq!(defaults, SimulationOptions::default());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Upper bound on states run, counted across nested Map iterations.
    /// Guards against Choice and Catch loops that never exit.
    pub max_transitions: u64,
}

impl SimulationOptions {
    pub const DEFAULT_MAX_TRANSITIONS: u64 = 1000;

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn max_transitions(mut self, limit: u64) -> Self {
        self.max_transitions = limit;
        self
    }
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            max_transitions: Self::DEFAULT_MAX_TRANSITIONS,
        }
    }
}
