//! Errors raised while simulating a machine.

use crate::core::{names, StateFailure};
use thiserror::Error;

/// A simulate-time failure.
///
/// Every variant maps to an ASL error name through
/// [`SimulationError::error_name`], which is what Retry and Catch match on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("State '{state}' references resource '{resource}', which has no registered mock")]
    ResourceNotFound { state: String, resource: String },

    #[error("State '{state}' failed with {failure}")]
    Execution { state: String, failure: StateFailure },

    #[error("Fail state '{state}' reached ({})", .error.as_deref().unwrap_or(names::FAILED))]
    Failed {
        state: String,
        error: Option<String>,
        cause: Option<String>,
    },

    #[error("Simulation exceeded {limit} state transitions")]
    TransitionLimitExceeded { limit: u64 },
}

impl SimulationError {
    /// The ASL error name used for Retry and Catch matching.
    pub fn error_name(&self) -> &str {
        match self {
            Self::ResourceNotFound { .. } => names::RESOURCE_NOT_FOUND,
            Self::Execution { failure, .. } => &failure.error,
            Self::Failed { error, .. } => error.as_deref().unwrap_or(names::FAILED),
            Self::TransitionLimitExceeded { .. } => names::RUNTIME,
        }
    }

    pub fn cause(&self) -> String {
        match self {
            Self::ResourceNotFound { resource, .. } => {
                format!("No mock registered for resource {resource}")
            }
            Self::Execution { failure, .. } => failure.cause.clone(),
            Self::Failed { cause, .. } => cause.clone().unwrap_or_default(),
            Self::TransitionLimitExceeded { .. } => self.to_string(),
        }
    }

    /// The state the failure originated in.
    pub fn state(&self) -> Option<&str> {
        match self {
            Self::ResourceNotFound { state, .. }
            | Self::Execution { state, .. }
            | Self::Failed { state, .. } => Some(state),
            Self::TransitionLimitExceeded { .. } => None,
        }
    }

    /// Whether Retry and Catch policies may handle this failure.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::TransitionLimitExceeded { .. })
    }

    pub fn to_failure(&self) -> StateFailure {
        StateFailure::new(self.error_name(), self.cause())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_not_found_has_asl_name() {
        let err = SimulationError::ResourceNotFound {
            state: "Task".to_string(),
            resource: "arn:x".to_string(),
        };

        assert_eq!(err.error_name(), names::RESOURCE_NOT_FOUND);
        assert_eq!(err.state(), Some("Task"));
        assert!(err.cause().contains("arn:x"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn fail_state_without_error_uses_default_name() {
        let err = SimulationError::Failed {
            state: "Fail".to_string(),
            error: None,
            cause: None,
        };

        assert_eq!(err.error_name(), names::FAILED);
        assert_eq!(err.to_failure(), StateFailure::new(names::FAILED, ""));
    }

    #[test]
    fn execution_error_keeps_failure_name() {
        let err = SimulationError::Execution {
            state: "Task".to_string(),
            failure: StateFailure::new("Custom.Error", "boom"),
        };

        assert_eq!(err.error_name(), "Custom.Error");
        assert_eq!(err.cause(), "boom");
        assert_eq!(err.to_string(), "State 'Task' failed with Custom.Error: boom");
    }

    #[test]
    fn transition_limit_is_not_recoverable() {
        let err = SimulationError::TransitionLimitExceeded { limit: 10 };

        assert!(!err.is_recoverable());
        assert!(err.state().is_none());
    }
}
