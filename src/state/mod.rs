//! States: a single composed record per state.
//!
//! Every state is a name, an optional comment, a [`StateKind`] carrying the
//! type-specific behaviour, and the optional stage configurations of the
//! data-processing pipeline (InputPath, Parameters, ResultSelector,
//! ResultPath, OutputPath) plus Retry/Catch policies. Which stages a state
//! may configure depends on its [`StateType`]; the builder enforces this.

mod kind;
pub mod pipeline;

pub use kind::{ChoiceBranch, StateKind, WaitDuration};

use crate::core::{Catcher, PayloadTemplate, ReferencePath, ResultPath, Retrier, StateId};
use crate::runtime::StateMachine;
use serde_json::{json, Map, Value};
use std::fmt;

/// Maximum length of a state name.
pub const MAX_STATE_NAME_LENGTH: usize = 128;

/// The ASL state type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateType {
    Pass,
    Task,
    Choice,
    Wait,
    Succeed,
    Fail,
    Map,
}

/// Optional fields whose availability depends on the state type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateField {
    InputPath,
    OutputPath,
    Next,
    ResultPath,
    Parameters,
    ResultSelector,
    Retry,
    Catch,
}

impl StateField {
    pub fn name(self) -> &'static str {
        match self {
            Self::InputPath => "InputPath",
            Self::OutputPath => "OutputPath",
            Self::Next => "Next",
            Self::ResultPath => "ResultPath",
            Self::Parameters => "Parameters",
            Self::ResultSelector => "ResultSelector",
            Self::Retry => "Retry",
            Self::Catch => "Catch",
        }
    }
}

impl StateType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Task => "Task",
            Self::Choice => "Choice",
            Self::Wait => "Wait",
            Self::Succeed => "Succeed",
            Self::Fail => "Fail",
            Self::Map => "Map",
        }
    }

    /// Whether states of this type accept `field`.
    pub fn supports(self, field: StateField) -> bool {
        match field {
            StateField::InputPath | StateField::OutputPath => self != Self::Fail,
            StateField::Next => matches!(self, Self::Pass | Self::Task | Self::Wait | Self::Map),
            StateField::ResultPath | StateField::Parameters => {
                matches!(self, Self::Pass | Self::Task | Self::Map)
            }
            StateField::ResultSelector | StateField::Retry | StateField::Catch => {
                matches!(self, Self::Task | Self::Map)
            }
        }
    }

    /// Choice, Succeed and Fail never have a `Next` field.
    pub fn is_terminal(self) -> bool {
        !self.supports(StateField::Next)
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage configurations, applied in a fixed order by the pipeline runner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pipeline {
    pub input_path: Option<ReferencePath>,
    pub parameters: Option<PayloadTemplate>,
    pub result_selector: Option<PayloadTemplate>,
    pub result_path: Option<ResultPath>,
    pub output_path: Option<ReferencePath>,
}

/// A fully validated state. Build one with [`crate::builder::StateBuilder`].
#[derive(Clone, Debug)]
pub struct State {
    pub(crate) name: String,
    pub(crate) comment: Option<String>,
    pub(crate) kind: StateKind,
    pub(crate) next: Option<StateId>,
    pub(crate) pipeline: Pipeline,
    pub(crate) retriers: Vec<Retrier>,
    pub(crate) catchers: Vec<Catcher>,
}

impl State {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn state_type(&self) -> StateType {
        self.kind.state_type()
    }

    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    /// The successor set with [`crate::builder::StateMachineBuilder::then`].
    pub fn next(&self) -> Option<StateId> {
        self.next
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn retriers(&self) -> &[Retrier] {
        &self.retriers
    }

    pub fn catchers(&self) -> &[Catcher] {
        &self.catchers
    }

    /// Every state this one can transition to.
    pub fn successors(&self) -> Vec<StateId> {
        let mut targets: Vec<StateId> = self.next.into_iter().collect();
        if let StateKind::Choice { choices, default } = &self.kind {
            targets.extend(choices.iter().map(|branch| branch.next));
            targets.extend(default);
        }
        targets.extend(self.catchers.iter().map(Catcher::next));
        targets
    }

    /// Compile to the ASL representation.
    ///
    /// Fields are added layer by layer: type and comment, type-specific
    /// fields, InputPath/OutputPath, Next/End, ResultPath, Parameters,
    /// ResultSelector, then Retry/Catch. A field is only emitted when it
    /// differs from its default, except ResultPath, which is emitted whenever
    /// it is configured: `$` as `"$"` and a discarding path as `null`.
    pub fn compile(&self, machine: &StateMachine) -> Value {
        let mut compiled = Map::new();
        self.compile_header(&mut compiled);
        self.kind.compile_into(&mut compiled, machine);
        self.compile_io_paths(&mut compiled);
        self.compile_transition(&mut compiled, machine);
        self.compile_result_path(&mut compiled);
        self.compile_templates(&mut compiled);
        self.compile_error_handlers(&mut compiled, machine);
        Value::Object(compiled)
    }

    fn compile_header(&self, compiled: &mut Map<String, Value>) {
        compiled.insert("Type".to_string(), json!(self.state_type().as_str()));
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            compiled.insert("Comment".to_string(), json!(comment));
        }
    }

    fn compile_io_paths(&self, compiled: &mut Map<String, Value>) {
        let paths = [
            ("InputPath", &self.pipeline.input_path),
            ("OutputPath", &self.pipeline.output_path),
        ];
        for (key, path) in paths {
            if let Some(path) = path.as_ref().filter(|p| !p.is_root()) {
                compiled.insert(key.to_string(), json!(path.to_string()));
            }
        }
    }

    fn compile_transition(&self, compiled: &mut Map<String, Value>, machine: &StateMachine) {
        if !self.state_type().supports(StateField::Next) {
            return;
        }
        match self.next {
            Some(next) => {
                compiled.insert("Next".to_string(), json!(machine.name_of(next)));
            }
            None => {
                compiled.insert("End".to_string(), json!(true));
            }
        }
    }

    fn compile_result_path(&self, compiled: &mut Map<String, Value>) {
        if let Some(result_path) = &self.pipeline.result_path {
            compiled.insert("ResultPath".to_string(), result_path.to_value());
        }
    }

    fn compile_templates(&self, compiled: &mut Map<String, Value>) {
        let templates = [
            ("Parameters", &self.pipeline.parameters),
            ("ResultSelector", &self.pipeline.result_selector),
        ];
        for (key, template) in templates {
            if let Some(template) = template.as_ref().filter(|t| !t.is_empty()) {
                compiled.insert(key.to_string(), template.compile());
            }
        }
    }

    fn compile_error_handlers(&self, compiled: &mut Map<String, Value>, machine: &StateMachine) {
        if !self.retriers.is_empty() {
            let retry: Vec<Value> = self.retriers.iter().map(Retrier::compile).collect();
            compiled.insert("Retry".to_string(), Value::Array(retry));
        }
        if !self.catchers.is_empty() {
            let catch: Vec<Value> = self
                .catchers
                .iter()
                .map(|catcher| catcher.compile(machine.name_of(catcher.next())))
                .collect();
            compiled.insert("Catch".to_string(), Value::Array(catch));
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}State({:?})", self.state_type(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table_matches_state_types() {
        assert!(StateType::Pass.supports(StateField::Parameters));
        assert!(!StateType::Pass.supports(StateField::ResultSelector));
        assert!(!StateType::Pass.supports(StateField::Retry));
        assert!(StateType::Task.supports(StateField::Catch));
        assert!(StateType::Map.supports(StateField::ResultSelector));
        assert!(StateType::Choice.supports(StateField::InputPath));
        assert!(!StateType::Choice.supports(StateField::ResultPath));
        assert!(!StateType::Wait.supports(StateField::Parameters));
        assert!(!StateType::Fail.supports(StateField::InputPath));
    }

    #[test]
    fn terminal_types_have_no_next() {
        assert!(StateType::Choice.is_terminal());
        assert!(StateType::Succeed.is_terminal());
        assert!(StateType::Fail.is_terminal());
        assert!(!StateType::Pass.is_terminal());
        assert!(!StateType::Map.is_terminal());
    }

    #[test]
    fn type_names_are_asl_names() {
        assert_eq!(StateType::Succeed.to_string(), "Succeed");
        assert_eq!(StateType::Map.as_str(), "Map");
    }
}
