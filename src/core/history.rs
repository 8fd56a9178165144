//! Execution history for a simulation run.
//!
//! Provides immutable tracking of the states visited during a simulation,
//! in the order they ran.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Record of one state's run during a simulation.
///
/// # Example
///
/// ```rust
/// use stepsim::core::StateEvent;
/// use serde_json::json;
///
/// let event = StateEvent::new("Pass 1", "Pass", json!({"a": 1}), json!({"a": 1}));
/// assert_eq!(event.retries, 0);
/// assert!(event.caught.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateEvent {
    /// Name of the state that ran
    pub state: String,
    /// ASL type of the state
    pub state_type: String,
    /// Raw input handed to the state
    pub input: Value,
    /// Output passed on to the next state
    pub output: Value,
    /// Number of retries performed before the state finished
    pub retries: u32,
    /// Total backoff the retries would have waited
    pub simulated_wait: Duration,
    /// Error name when a Catcher handled a failure
    pub caught: Option<String>,
    /// When the state finished
    pub timestamp: DateTime<Utc>,
}

impl StateEvent {
    pub fn new(
        state: impl Into<String>,
        state_type: impl Into<String>,
        input: Value,
        output: Value,
    ) -> Self {
        Self {
            state: state.into(),
            state_type: state_type.into(),
            input,
            output,
            retries: 0,
            simulated_wait: Duration::ZERO,
            caught: None,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered history of state runs.
///
/// History is immutable - the `record` method returns a new history
/// with the event added.
///
/// # Example
///
/// ```rust
/// use stepsim::core::{ExecutionHistory, StateEvent};
/// use serde_json::json;
///
/// let history = ExecutionHistory::new();
/// let history = history.record(StateEvent::new("A", "Pass", json!({}), json!({})));
/// let history = history.record(StateEvent::new("B", "Succeed", json!({}), json!({})));
///
/// assert_eq!(history.path(), vec!["A", "B"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionHistory {
    events: Vec<StateEvent>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Record an event, returning a new history.
    ///
    /// This does not mutate the existing history.
    pub fn record(&self, event: StateEvent) -> Self {
        let mut events = self.events.clone();
        events.push(event);
        Self { events }
    }

    /// Append an event in place.
    pub(crate) fn push(&mut self, event: StateEvent) {
        self.events.push(event);
    }

    /// Names of the states visited, in order.
    pub fn path(&self) -> Vec<&str> {
        self.events.iter().map(|event| event.state.as_str()).collect()
    }

    /// Total simulated retry backoff across all events.
    pub fn total_simulated_wait(&self) -> Duration {
        self.events
            .iter()
            .fold(Duration::ZERO, |total, event| total.saturating_add(event.simulated_wait))
    }

    /// Wall-clock time between the first and last recorded event.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.events.first(), self.events.last()) {
            last.timestamp
                .signed_duration_since(first.timestamp)
                .to_std()
                .ok()
        } else {
            None
        }
    }

    pub fn events(&self) -> &[StateEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str) -> StateEvent {
        StateEvent::new(name, "Pass", json!({}), json!({}))
    }

    #[test]
    fn new_history_is_empty() {
        let history = ExecutionHistory::new();
        assert!(history.is_empty());
        assert!(history.path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let history = ExecutionHistory::new();
        let new_history = history.record(event("A"));

        assert_eq!(history.len(), 0);
        assert_eq!(new_history.len(), 1);
    }

    #[test]
    fn path_preserves_order() {
        let history = ExecutionHistory::new()
            .record(event("A"))
            .record(event("B"))
            .record(event("A"));

        assert_eq!(history.path(), vec!["A", "B", "A"]);
    }

    #[test]
    fn simulated_wait_is_summed() {
        let mut first = event("A");
        first.simulated_wait = Duration::from_secs(3);
        let mut second = event("B");
        second.simulated_wait = Duration::from_secs(4);

        let history = ExecutionHistory::new().record(first).record(second);
        assert_eq!(history.total_simulated_wait(), Duration::from_secs(7));
    }

    #[test]
    fn simulated_wait_saturates() {
        let mut first = event("A");
        first.simulated_wait = Duration::MAX;
        let mut second = event("B");
        second.simulated_wait = Duration::from_secs(1);

        let history = ExecutionHistory::new().record(first).record(second);
        assert_eq!(history.total_simulated_wait(), Duration::MAX);
    }

    #[test]
    fn push_appends_in_place() {
        let mut history = ExecutionHistory::new();
        history.push(event("A"));
        history.push(event("B"));

        assert_eq!(history.path(), vec!["A", "B"]);
    }

    #[test]
    fn single_event_has_zero_duration() {
        let history = ExecutionHistory::new().record(event("A"));
        assert_eq!(history.duration(), Some(Duration::ZERO));
    }

    #[test]
    fn history_serializes_correctly() {
        let history = ExecutionHistory::new().record(event("A"));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: ExecutionHistory = serde_json::from_str(&json).unwrap();

        assert_eq!(history, deserialized);
    }
}
