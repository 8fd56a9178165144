//! Build errors for states and state machines.

use crate::core::{StateId, ValidationError};
use thiserror::Error;

/// Errors that can occur when assembling a state machine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Start state not specified. Call .start_at(state) before .build()")]
    MissingStartState,

    #[error("No states defined. Add at least one state")]
    NoStates,

    #[error("State name '{0}' is used more than once")]
    DuplicateStateName(String),

    #[error("State {0} does not belong to this state machine")]
    UnknownState(StateId),

    #[error("{state_type} state '{state}' cannot have a Next state")]
    TerminalSuccessor {
        state: String,
        state_type: &'static str,
    },

    #[error("State '{0}' is not reachable from the start state")]
    UnreachableState(String),
}
