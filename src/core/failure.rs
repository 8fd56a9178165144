//! Runtime failures and the predefined error names they are matched against.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Predefined error names.
pub mod names {
    /// Wildcard that matches any error name.
    pub const ALL: &str = "States.ALL";
    /// Raised when no Choice rule matched and no Default is configured.
    pub const NO_CHOICE_MATCHED: &str = "States.NoChoiceMatched";
    /// Raised when ResultPath cannot be applied to the state input.
    pub const RESULT_PATH_MATCH_FAILURE: &str = "States.ResultPathMatchFailure";
    /// Raised for malformed runtime data (non-array Map items, bad Wait paths).
    pub const RUNTIME: &str = "States.Runtime";
    /// Raised by a Task whose resource has no registered mock.
    pub const RESOURCE_NOT_FOUND: &str = "States.ResourceNotFound";
    /// Raised by a Fail state that carries no explicit error name.
    pub const FAILED: &str = "States.Failed";
}

/// A named failure with a human-readable cause.
///
/// Mock resources return this to signal an error; Retry and Catch match
/// on [`StateFailure::error`].
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{error}: {cause}")]
pub struct StateFailure {
    pub error: String,
    pub cause: String,
}

impl StateFailure {
    pub fn new(error: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            cause: cause.into(),
        }
    }

    /// The error output handed to a Catcher's target state.
    pub fn to_error_output(&self) -> Value {
        json!({"Error": self.error, "Cause": self.cause})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_output_has_error_and_cause() {
        let failure = StateFailure::new("Custom.Error", "it broke");

        assert_eq!(
            failure.to_error_output(),
            json!({"Error": "Custom.Error", "Cause": "it broke"})
        );
        assert_eq!(failure.to_string(), "Custom.Error: it broke");
    }
}
