//! Construction-time validation errors.

use thiserror::Error;

/// Errors raised while constructing paths, policies and states.
///
/// These always surface at construction time, never during simulation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("State name cannot exceed {max} characters (got {length})")]
    StateNameTooLong { length: usize, max: usize },

    #[error("Invalid reference path '{path}': {reason}")]
    InvalidReferencePath { path: String, reason: String },

    #[error("Unsupported JSONPath operator: \"{operator}\" in '{path}'")]
    UnsupportedOperator { path: String, operator: String },

    #[error("All result selector keys must end with .$ (got '{key}')")]
    InvalidResultSelectorKey { key: String },

    #[error("Invalid {field}: {reason}")]
    InvalidTemplate { field: &'static str, reason: String },

    #[error("ErrorEquals must contain at least one error name")]
    EmptyErrorEquals,

    #[error("States.ALL must be the only error name in ErrorEquals")]
    StatesAllNotAlone,

    #[error("BackoffRate must be at least 1.0 (got {0})")]
    InvalidBackoffRate(f64),

    #[error("IntervalSeconds must be at least 1")]
    InvalidInterval,

    #[error("{0} rule requires at least one nested rule")]
    EmptyRuleList(&'static str),

    #[error("Choice states require at least one rule")]
    NoChoices,

    #[error("{state_type} states do not support {field}")]
    UnsupportedField {
        state_type: &'static str,
        field: &'static str,
    },
}
