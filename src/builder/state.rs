//! Fluent construction of individual states.

use crate::core::{
    Catcher, ChoiceRule, PayloadTemplate, ReferencePath, ResultPath, Retrier, StateId,
    ValidationError,
};
use crate::runtime::StateMachine;
use crate::state::{
    ChoiceBranch, Pipeline, State, StateField, StateKind, StateType, WaitDuration,
    MAX_STATE_NAME_LENGTH,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Builder for a single state.
///
/// Start from the constructor matching the state type, chain the optional
/// fields, then call [`StateBuilder::build`] (or hand the builder to
/// [`StateMachineBuilder::add`](crate::builder::StateMachineBuilder::add)).
/// The first invalid field, such as a malformed path or a field the state
/// type does not support, is reported by `build`.
///
/// # Example
///
/// ```rust
/// use stepsim::builder::StateBuilder;
/// use stepsim::core::ValidationError;
///
/// let err = StateBuilder::pass("Pass 1").input_path("$.dataset*").build().unwrap_err();
/// assert!(err.to_string().contains(r#"Unsupported JSONPath operator: "*""#));
///
/// let err = StateBuilder::succeed("Done").result_path(None).build().unwrap_err();
/// assert_eq!(
///     err,
///     ValidationError::UnsupportedField { state_type: "Succeed", field: "ResultPath" }
/// );
/// ```
#[derive(Clone, Debug)]
pub struct StateBuilder {
    name: String,
    comment: Option<String>,
    kind: StateKind,
    pipeline: Pipeline,
    retriers: Vec<Retrier>,
    catchers: Vec<Catcher>,
    error: Option<ValidationError>,
}

impl StateBuilder {
    fn new(name: impl Into<String>, kind: StateKind) -> Self {
        Self {
            name: name.into(),
            comment: None,
            kind,
            pipeline: Pipeline::default(),
            retriers: Vec::new(),
            catchers: Vec::new(),
            error: None,
        }
    }

    pub fn pass(name: impl Into<String>) -> Self {
        Self::new(name, StateKind::Pass { result: None })
    }

    pub fn task(name: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new(
            name,
            StateKind::Task {
                resource: resource.into(),
            },
        )
    }

    /// A Choice state; add rules with [`StateBuilder::when`].
    pub fn choice(name: impl Into<String>) -> Self {
        Self::new(
            name,
            StateKind::Choice {
                choices: Vec::new(),
                default: None,
            },
        )
    }

    pub fn wait_seconds(name: impl Into<String>, seconds: u64) -> Self {
        Self::new(name, StateKind::Wait(WaitDuration::Seconds(seconds)))
    }

    pub fn wait_until(name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(name, StateKind::Wait(WaitDuration::Timestamp(timestamp)))
    }

    /// A Wait state reading its duration in seconds from the input.
    pub fn wait_seconds_path(name: impl Into<String>, path: &str) -> Self {
        Self::wait_path(name, path, WaitDuration::SecondsPath)
    }

    /// A Wait state reading an RFC 3339 timestamp from the input.
    pub fn wait_timestamp_path(name: impl Into<String>, path: &str) -> Self {
        Self::wait_path(name, path, WaitDuration::TimestampPath)
    }

    fn wait_path(
        name: impl Into<String>,
        path: &str,
        duration: fn(ReferencePath) -> WaitDuration,
    ) -> Self {
        match ReferencePath::parse(path) {
            Ok(path) => Self::new(name, StateKind::Wait(duration(path))),
            Err(err) => {
                let mut builder = Self::new(name, StateKind::Wait(WaitDuration::Seconds(0)));
                builder.record(err);
                builder
            }
        }
    }

    pub fn succeed(name: impl Into<String>) -> Self {
        Self::new(name, StateKind::Succeed)
    }

    pub fn fail(name: impl Into<String>) -> Self {
        Self::new(
            name,
            StateKind::Fail {
                error: None,
                cause: None,
            },
        )
    }

    /// A Map state running `iterator` over each item of its input.
    pub fn map(name: impl Into<String>, iterator: StateMachine) -> Self {
        Self::new(
            name,
            StateKind::Map {
                iterator: Box::new(iterator),
                items_path: None,
                max_concurrency: None,
            },
        )
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn input_path(mut self, path: &str) -> Self {
        if self.allows(StateField::InputPath) {
            if let Some(path) = self.parse_path(path) {
                self.pipeline.input_path = Some(path);
            }
        }
        self
    }

    pub fn output_path(mut self, path: &str) -> Self {
        if self.allows(StateField::OutputPath) {
            if let Some(path) = self.parse_path(path) {
                self.pipeline.output_path = Some(path);
            }
        }
        self
    }

    /// Where to place the result. `None` discards it and keeps the input.
    pub fn result_path(mut self, path: Option<&str>) -> Self {
        if self.allows(StateField::ResultPath) {
            match ResultPath::parse(path) {
                Ok(result_path) => self.pipeline.result_path = Some(result_path),
                Err(err) => self.record(err),
            }
        }
        self
    }

    pub fn parameters(mut self, template: Value) -> Self {
        if self.allows(StateField::Parameters) {
            match PayloadTemplate::parameters(&template) {
                Ok(template) => self.pipeline.parameters = Some(template),
                Err(err) => self.record(err),
            }
        }
        self
    }

    /// Reshape the raw result; every key must end in `.$`.
    pub fn result_selector(mut self, template: Value) -> Self {
        if self.allows(StateField::ResultSelector) {
            match PayloadTemplate::result_selector(&template) {
                Ok(template) => self.pipeline.result_selector = Some(template),
                Err(err) => self.record(err),
            }
        }
        self
    }

    pub fn add_retrier(mut self, retrier: Retrier) -> Self {
        if self.allows(StateField::Retry) {
            self.retriers.push(retrier);
        }
        self
    }

    pub fn add_catcher(mut self, catcher: Catcher) -> Self {
        if self.allows(StateField::Catch) {
            self.catchers.push(catcher);
        }
        self
    }

    /// Fixed output of a Pass state.
    pub fn result(mut self, value: Value) -> Self {
        match &mut self.kind {
            StateKind::Pass { result } => *result = Some(value),
            _ => self.unsupported("Result"),
        }
        self
    }

    /// Error name reported by a Fail state.
    pub fn error(mut self, name: impl Into<String>) -> Self {
        match &mut self.kind {
            StateKind::Fail { error, .. } => *error = Some(name.into()),
            _ => self.unsupported("Error"),
        }
        self
    }

    pub fn cause(mut self, text: impl Into<String>) -> Self {
        match &mut self.kind {
            StateKind::Fail { cause, .. } => *cause = Some(text.into()),
            _ => self.unsupported("Cause"),
        }
        self
    }

    /// Append a Choice rule. Rules are evaluated in the order added.
    pub fn when(mut self, rule: ChoiceRule, next: StateId) -> Self {
        match &mut self.kind {
            StateKind::Choice { choices, .. } => choices.push(ChoiceBranch { rule, next }),
            _ => self.unsupported("Choices"),
        }
        self
    }

    /// The Choice state's Default target.
    pub fn otherwise(mut self, next: StateId) -> Self {
        match &mut self.kind {
            StateKind::Choice { default, .. } => *default = Some(next),
            _ => self.unsupported("Default"),
        }
        self
    }

    pub fn items_path(mut self, path: &str) -> Self {
        if !matches!(self.kind, StateKind::Map { .. }) {
            self.unsupported("ItemsPath");
            return self;
        }
        if let Some(path) = self.parse_path(path) {
            if let StateKind::Map { items_path, .. } = &mut self.kind {
                *items_path = Some(path);
            }
        }
        self
    }

    /// Recorded in the definition only; simulation is sequential.
    pub fn max_concurrency(mut self, limit: u32) -> Self {
        match &mut self.kind {
            StateKind::Map {
                max_concurrency, ..
            } => *max_concurrency = Some(limit),
            _ => self.unsupported("MaxConcurrency"),
        }
        self
    }

    pub fn state_type(&self) -> StateType {
        self.kind.state_type()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate and produce the state.
    pub fn build(self) -> Result<State, ValidationError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let length = self.name.chars().count();
        if length > MAX_STATE_NAME_LENGTH {
            return Err(ValidationError::StateNameTooLong {
                length,
                max: MAX_STATE_NAME_LENGTH,
            });
        }

        if let StateKind::Choice { choices, .. } = &self.kind {
            if choices.is_empty() {
                return Err(ValidationError::NoChoices);
            }
        }

        for retrier in &self.retriers {
            retrier.validate()?;
        }
        for catcher in &self.catchers {
            catcher.validate()?;
        }

        Ok(State {
            name: self.name,
            comment: self.comment,
            kind: self.kind,
            next: None,
            pipeline: self.pipeline,
            retriers: self.retriers,
            catchers: self.catchers,
        })
    }

    fn allows(&mut self, field: StateField) -> bool {
        if self.state_type().supports(field) {
            true
        } else {
            self.unsupported(field.name());
            false
        }
    }

    fn unsupported(&mut self, field: &'static str) {
        self.record(ValidationError::UnsupportedField {
            state_type: self.state_type().as_str(),
            field,
        });
    }

    fn parse_path(&mut self, path: &str) -> Option<ReferencePath> {
        match ReferencePath::parse(path) {
            Ok(path) => Some(path),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    /// Keep the first error only.
    fn record(&mut self, err: ValidationError) {
        self.error.get_or_insert(err);
    }
}
