//! Builder API for state and state machine construction.
//!
//! Construction is where every validation happens: a state that builds can
//! always be compiled and simulated.

pub mod error;
pub mod machine;
pub mod state;

pub use error::BuildError;
pub use machine::StateMachineBuilder;
pub use state::StateBuilder;

use crate::runtime::StateMachine;

/// Build a machine that runs `states` one after another, starting with the
/// first.
///
/// # Example
///
/// ```
/// use stepsim::builder::{sequence, StateBuilder};
///
/// let machine = sequence(vec![
///     StateBuilder::pass("Pass 1"),
///     StateBuilder::pass("Pass 2"),
///     StateBuilder::pass("Pass 3"),
/// ])
/// .unwrap();
///
/// assert_eq!(machine.start_state().name(), "Pass 1");
/// assert_eq!(machine.iter().count(), 3);
/// ```
pub fn sequence(states: Vec<StateBuilder>) -> Result<StateMachine, BuildError> {
    let mut builder = StateMachineBuilder::new();
    let ids = states
        .into_iter()
        .map(|state| builder.add(state))
        .collect::<Result<Vec<_>, _>>()?;

    let first = *ids.first().ok_or(BuildError::NoStates)?;
    builder.chain(&ids);
    builder.start_at(first);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_sequence_has_no_states() {
        assert_eq!(sequence(Vec::new()).unwrap_err(), BuildError::NoStates);
    }

    #[test]
    fn sequence_compiles_next_and_end() {
        let machine = sequence(vec![
            StateBuilder::pass("Pass 1").comment("The starting state"),
            StateBuilder::pass("Pass 2"),
            StateBuilder::pass("Pass 3"),
        ])
        .unwrap();

        assert_eq!(
            machine.compile(),
            json!({
                "StartAt": "Pass 1",
                "States": {
                    "Pass 1": {"Comment": "The starting state", "Type": "Pass", "Next": "Pass 2"},
                    "Pass 2": {"Type": "Pass", "Next": "Pass 3"},
                    "Pass 3": {"Type": "Pass", "End": true}
                }
            })
        );
    }
}
