//! Retry and Catch policies attached to Task and Map states.

use crate::core::error::ValidationError;
use crate::core::failure::names;
use crate::core::id::StateId;
use crate::core::result_path::ResultPath;
use serde_json::{json, Map, Value};
use std::time::Duration;

fn validate_error_equals(error_equals: &[String]) -> Result<(), ValidationError> {
    if error_equals.is_empty() {
        return Err(ValidationError::EmptyErrorEquals);
    }
    if error_equals.len() > 1 && error_equals.iter().any(|name| name == names::ALL) {
        return Err(ValidationError::StatesAllNotAlone);
    }
    Ok(())
}

fn matches_error(error_equals: &[String], error: &str) -> bool {
    error_equals
        .iter()
        .any(|name| name == names::ALL || name == error)
}

/// A retry policy for a set of error names.
///
/// Unset fields fall back to the defaults below when simulating and are
/// omitted from the compiled output. An explicit `max_attempts(0)` is
/// emitted, since zero means "never retry".
///
/// # Example
///
/// ```rust
/// use stepsim::core::Retrier;
/// use serde_json::json;
///
/// let retrier = Retrier::new(["States.TaskFailed"]).interval_seconds(3).max_attempts(0);
///
/// assert_eq!(
///     retrier.compile(),
///     json!({"ErrorEquals": ["States.TaskFailed"], "IntervalSeconds": 3, "MaxAttempts": 0})
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Retrier {
    error_equals: Vec<String>,
    interval_seconds: Option<u32>,
    backoff_rate: Option<f64>,
    max_attempts: Option<u32>,
}

impl Retrier {
    pub const DEFAULT_INTERVAL_SECONDS: u32 = 1;
    pub const DEFAULT_BACKOFF_RATE: f64 = 2.0;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn new<I, S>(error_equals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            error_equals: error_equals.into_iter().map(Into::into).collect(),
            interval_seconds: None,
            backoff_rate: None,
            max_attempts: None,
        }
    }

    /// Seconds before the first retry.
    pub fn interval_seconds(mut self, seconds: u32) -> Self {
        self.interval_seconds = Some(seconds);
        self
    }

    /// Multiplier applied to the interval on each further retry.
    pub fn backoff_rate(mut self, rate: f64) -> Self {
        self.backoff_rate = Some(rate);
        self
    }

    /// Maximum number of retries; zero disables retrying.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_error_equals(&self.error_equals)?;
        if let Some(rate) = self.backoff_rate {
            if rate.is_nan() || rate < 1.0 {
                return Err(ValidationError::InvalidBackoffRate(rate));
            }
        }
        if self.interval_seconds == Some(0) {
            return Err(ValidationError::InvalidInterval);
        }
        Ok(())
    }

    pub fn error_equals(&self) -> &[String] {
        &self.error_equals
    }

    pub fn matches(&self, error: &str) -> bool {
        matches_error(&self.error_equals, error)
    }

    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.unwrap_or(Self::DEFAULT_MAX_ATTEMPTS)
    }

    /// Wait before retry number `retry` (1-based):
    /// `interval * backoff_rate^(retry - 1)`, saturating at [`Duration::MAX`].
    pub fn delay_before(&self, retry: u32) -> Duration {
        let interval = f64::from(self.interval_seconds.unwrap_or(Self::DEFAULT_INTERVAL_SECONDS));
        let rate = self.backoff_rate.unwrap_or(Self::DEFAULT_BACKOFF_RATE);
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(interval * rate.powi(exponent)).unwrap_or(Duration::MAX)
    }

    pub fn compile(&self) -> Value {
        let mut compiled = Map::new();
        compiled.insert("ErrorEquals".to_string(), json!(self.error_equals));
        if let Some(interval) = self.interval_seconds {
            compiled.insert("IntervalSeconds".to_string(), json!(interval));
        }
        if let Some(rate) = self.backoff_rate {
            compiled.insert("BackoffRate".to_string(), json!(rate));
        }
        if let Some(attempts) = self.max_attempts {
            compiled.insert("MaxAttempts".to_string(), json!(attempts));
        }
        Value::Object(compiled)
    }
}

/// Transition to a fallback state when an error was not resolved by retrying.
#[derive(Clone, Debug, PartialEq)]
pub struct Catcher {
    error_equals: Vec<String>,
    next: StateId,
    result_path: Option<ResultPath>,
}

impl Catcher {
    pub fn new<I, S>(error_equals: I, next: StateId) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            error_equals: error_equals.into_iter().map(Into::into).collect(),
            next,
            result_path: None,
        }
    }

    /// Place the error output into the state input instead of replacing it.
    pub fn result_path(mut self, result_path: ResultPath) -> Self {
        self.result_path = Some(result_path);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_error_equals(&self.error_equals)
    }

    pub fn error_equals(&self) -> &[String] {
        &self.error_equals
    }

    pub fn next(&self) -> StateId {
        self.next
    }

    pub fn matches(&self, error: &str) -> bool {
        matches_error(&self.error_equals, error)
    }

    /// The effective ResultPath; `$` unless configured.
    pub fn effective_result_path(&self) -> &ResultPath {
        self.result_path.as_ref().unwrap_or(&ResultPath::Replace)
    }

    pub fn compile(&self, next_name: &str) -> Value {
        let mut compiled = Map::new();
        compiled.insert("ErrorEquals".to_string(), json!(self.error_equals));
        compiled.insert("Next".to_string(), json!(next_name));
        if let Some(result_path) = &self.result_path {
            compiled.insert("ResultPath".to_string(), result_path.to_value());
        }
        Value::Object(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_retrier_fields_are_omitted() {
        let retrier = Retrier::new(["Custom.Error"]);

        assert_eq!(retrier.compile(), json!({"ErrorEquals": ["Custom.Error"]}));
        assert_eq!(retrier.attempt_limit(), 3);
    }

    #[test]
    fn explicit_zero_max_attempts_is_emitted() {
        let retrier = Retrier::new(["Custom.Error"]).max_attempts(0);

        assert_eq!(
            retrier.compile(),
            json!({"ErrorEquals": ["Custom.Error"], "MaxAttempts": 0})
        );
        assert_eq!(retrier.attempt_limit(), 0);
    }

    #[test]
    fn all_retrier_fields_compile() {
        let retrier = Retrier::new(["A", "B"])
            .interval_seconds(2)
            .backoff_rate(1.5)
            .max_attempts(5);

        assert_eq!(
            retrier.compile(),
            json!({
                "ErrorEquals": ["A", "B"],
                "IntervalSeconds": 2,
                "BackoffRate": 1.5,
                "MaxAttempts": 5,
            })
        );
    }

    #[test]
    fn delay_grows_with_backoff() {
        let retrier = Retrier::new(["A"]).interval_seconds(3).backoff_rate(2.0);

        assert_eq!(retrier.delay_before(1), Duration::from_secs(3));
        assert_eq!(retrier.delay_before(2), Duration::from_secs(6));
        assert_eq!(retrier.delay_before(3), Duration::from_secs(12));
    }

    #[test]
    fn default_delay_uses_defaults() {
        let retrier = Retrier::new(["A"]);

        assert_eq!(retrier.delay_before(1), Duration::from_secs(1));
        assert_eq!(retrier.delay_before(2), Duration::from_secs(2));
    }

    #[test]
    fn oversized_delay_saturates() {
        let retrier = Retrier::new(["A"]).backoff_rate(1e6);

        assert_eq!(retrier.delay_before(100), Duration::MAX);
        assert_eq!(Retrier::new(["A"]).delay_before(u32::MAX), Duration::MAX);
    }

    #[test]
    fn states_all_matches_everything() {
        let retrier = Retrier::new([names::ALL]);

        assert!(retrier.matches("Anything"));
        assert!(retrier.matches(names::RESOURCE_NOT_FOUND));
    }

    #[test]
    fn exact_names_match_only_themselves() {
        let retrier = Retrier::new(["A", "B"]);

        assert!(retrier.matches("A"));
        assert!(retrier.matches("B"));
        assert!(!retrier.matches("C"));
    }

    #[test]
    fn validation_rejects_bad_policies() {
        assert_eq!(
            Retrier::new(Vec::<String>::new()).validate(),
            Err(ValidationError::EmptyErrorEquals)
        );
        assert_eq!(
            Retrier::new([names::ALL, "Other"]).validate(),
            Err(ValidationError::StatesAllNotAlone)
        );
        assert_eq!(
            Retrier::new(["A"]).backoff_rate(0.5).validate(),
            Err(ValidationError::InvalidBackoffRate(0.5))
        );
        assert_eq!(
            Retrier::new(["A"]).interval_seconds(0).validate(),
            Err(ValidationError::InvalidInterval)
        );
        assert!(Retrier::new(["A"]).validate().is_ok());
    }

    #[test]
    fn catcher_compiles_with_next_name() {
        let catcher = Catcher::new([names::ALL], StateId(1));

        assert_eq!(
            catcher.compile("Recover"),
            json!({"ErrorEquals": ["States.ALL"], "Next": "Recover"})
        );
        assert_eq!(catcher.next(), StateId(1));
        assert_eq!(catcher.effective_result_path(), &ResultPath::Replace);
    }

    #[test]
    fn catcher_result_path_is_emitted_when_set() {
        let catcher = Catcher::new(["A"], StateId(0))
            .result_path(ResultPath::parse(Some("$.error")).unwrap());

        assert_eq!(
            catcher.compile("Recover"),
            json!({"ErrorEquals": ["A"], "Next": "Recover", "ResultPath": "$.error"})
        );
    }

    #[test]
    fn catcher_validation_rejects_empty_names() {
        let catcher = Catcher::new(Vec::<String>::new(), StateId(0));
        assert_eq!(catcher.validate(), Err(ValidationError::EmptyErrorEquals));
    }
}
