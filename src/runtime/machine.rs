//! State machine that compiles to ASL and simulates against mock resources.

use crate::builder::StateMachineBuilder;
use crate::core::{ExecutionHistory, StateEvent, StateId};
use crate::runtime::error::SimulationError;
use crate::runtime::options::SimulationOptions;
use crate::runtime::resource::ResourceInvoker;
use crate::runtime::trace::{TraceSink, Tracer};
use crate::state::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// A validated state graph.
///
/// The machine owns every state; states refer to each other through
/// [`StateId`]s. A machine is immutable once built and can be compiled or
/// simulated any number of times.
#[derive(Clone, Debug)]
pub struct StateMachine {
    pub(crate) states: Vec<State>,
    pub(crate) start: StateId,
    pub(crate) comment: Option<String>,
    pub(crate) timeout_seconds: Option<u32>,
}

/// Result of a successful simulation.
#[derive(Clone, Debug, Serialize)]
pub struct Execution {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Output of the last state.
    pub output: Value,
    pub history: ExecutionHistory,
}

/// Per-run state shared by every state of a simulation, including the
/// iterator machines of Map states.
pub(crate) struct SimulationContext<'a> {
    pub resources: &'a dyn ResourceInvoker,
    pub tracer: Tracer<'a>,
    pub options: SimulationOptions,
    pub transitions: u64,
    pub history: ExecutionHistory,
}

impl StateMachine {
    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::new()
    }

    pub fn get(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())
    }

    /// Look a state up by name.
    pub fn find(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|state| state.name() == name)
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn start_state(&self) -> &State {
        &self.states[self.start.index()]
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn timeout_seconds(&self) -> Option<u32> {
        self.timeout_seconds
    }

    /// Name of the state behind `id`; empty for ids from another machine.
    pub fn name_of(&self, id: StateId) -> &str {
        self.get(id).map_or("", State::name)
    }

    /// Walk the `Next` chain from the start state.
    ///
    /// Each call starts a fresh walk. The walk visits at most as many states
    /// as the machine has, so a cyclic chain still terminates.
    pub fn iter(&self) -> Chain<'_> {
        Chain {
            machine: self,
            next: Some(self.start),
            remaining: self.states.len(),
        }
    }

    /// Compile to an ASL document.
    ///
    /// ```rust
    /// use stepsim::builder::{sequence, StateBuilder};
    /// use serde_json::json;
    ///
    /// let machine = sequence(vec![StateBuilder::pass("A"), StateBuilder::succeed("B")]).unwrap();
    ///
    /// assert_eq!(
    ///     machine.compile(),
    ///     json!({
    ///         "StartAt": "A",
    ///         "States": {
    ///             "A": {"Type": "Pass", "Next": "B"},
    ///             "B": {"Type": "Succeed"}
    ///         }
    ///     })
    /// );
    /// ```
    pub fn compile(&self) -> Value {
        let mut compiled = Map::new();
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            compiled.insert("Comment".to_string(), json!(comment));
        }
        compiled.insert("StartAt".to_string(), json!(self.start_state().name()));
        if let Some(timeout) = self.timeout_seconds {
            compiled.insert("TimeoutSeconds".to_string(), json!(timeout));
        }

        let states: Map<String, Value> = self
            .states
            .iter()
            .map(|state| (state.name().to_string(), state.compile(self)))
            .collect();
        compiled.insert("States".to_string(), Value::Object(states));

        Value::Object(compiled)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.compile())
    }

    /// Simulate the machine with default [`SimulationOptions`].
    pub fn simulate(
        &self,
        input: Value,
        resources: &dyn ResourceInvoker,
        sink: &mut dyn TraceSink,
    ) -> Result<Execution, SimulationError> {
        self.simulate_with_options(input, resources, sink, SimulationOptions::default())
    }

    /// Simulate the machine from its start state.
    ///
    /// Each state's output becomes the next state's input. The run ends at a
    /// state without a successor, or with the first failure that its state's
    /// Retry and Catch policies do not resolve.
    pub fn simulate_with_options(
        &self,
        input: Value,
        resources: &dyn ResourceInvoker,
        sink: &mut dyn TraceSink,
        options: SimulationOptions,
    ) -> Result<Execution, SimulationError> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            target: "stepsim::simulation",
            execution_id = %id,
            start_at = self.start_state().name(),
            "Starting simulation"
        );

        let mut ctx = SimulationContext {
            resources,
            tracer: Tracer::new(sink),
            options,
            transitions: 0,
            history: ExecutionHistory::new(),
        };

        match self.run(input, &mut ctx) {
            Ok(output) => {
                tracing::info!(
                    target: "stepsim::simulation",
                    execution_id = %id,
                    transitions = ctx.transitions,
                    "Simulation succeeded"
                );
                Ok(Execution {
                    id,
                    started_at,
                    output,
                    history: ctx.history,
                })
            }
            Err(err) => {
                ctx.tracer.failure(err.error_name(), &err.cause());
                Err(err)
            }
        }
    }

    /// Run from the start state within an existing simulation.
    pub(crate) fn run(
        &self,
        input: Value,
        ctx: &mut SimulationContext<'_>,
    ) -> Result<Value, SimulationError> {
        let parent = ctx.tracer.current_state().to_string();
        let result = self.walk(input, ctx);
        ctx.tracer.set_state(parent);
        result
    }

    fn walk(&self, input: Value, ctx: &mut SimulationContext<'_>) -> Result<Value, SimulationError> {
        let mut current = self.start;
        let mut data = input;

        loop {
            ctx.transitions += 1;
            if ctx.transitions > ctx.options.max_transitions {
                return Err(SimulationError::TransitionLimitExceeded {
                    limit: ctx.options.max_transitions,
                });
            }

            let state = &self.states[current.index()];
            ctx.tracer.enter(state.name());
            let step = state.simulate(&data, ctx)?;

            let mut event =
                StateEvent::new(state.name(), state.state_type().as_str(), data, step.output.clone());
            event.retries = step.retries;
            event.simulated_wait = step.simulated_wait;
            event.caught = step.caught;
            ctx.history.push(event);

            match step.next {
                Some(next) => {
                    current = next;
                    data = step.output;
                }
                None => return Ok(step.output),
            }
        }
    }
}

impl<'a> IntoIterator for &'a StateMachine {
    type Item = &'a State;
    type IntoIter = Chain<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the `Next` chain of a machine. See [`StateMachine::iter`].
#[derive(Clone, Debug)]
pub struct Chain<'a> {
    machine: &'a StateMachine,
    next: Option<StateId>,
    remaining: usize,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a State;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let state = self.machine.get(self.next?)?;
        self.remaining -= 1;
        self.next = state.next();
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{sequence, StateBuilder};
    use crate::runtime::{MemorySink, MockResources, NullSink};

    fn three_passes() -> StateMachine {
        sequence(vec![
            StateBuilder::pass("Pass 1").comment("The starting state"),
            StateBuilder::pass("Pass 2"),
            StateBuilder::pass("Pass 3"),
        ])
        .unwrap()
    }

    #[test]
    fn iter_follows_next_chain() {
        let machine = three_passes();
        let names: Vec<&str> = machine.iter().map(State::name).collect();

        assert_eq!(names, vec!["Pass 1", "Pass 2", "Pass 3"]);
    }

    #[test]
    fn iter_is_restartable() {
        let machine = three_passes();

        assert_eq!(machine.iter().count(), 3);
        assert_eq!(machine.iter().count(), 3);
        assert_eq!((&machine).into_iter().count(), 3);
    }

    #[test]
    fn iter_terminates_on_cycles() {
        let mut builder = StateMachine::builder();
        let a = builder.add(StateBuilder::pass("A")).unwrap();
        let b = builder.add(StateBuilder::pass("B")).unwrap();
        builder.then(a, b);
        builder.then(b, a);
        builder.start_at(a);
        let machine = builder.build().unwrap();

        assert_eq!(machine.iter().count(), 2);
    }

    #[test]
    fn compile_includes_machine_fields() {
        let mut builder = StateMachine::builder();
        let a = builder.add(StateBuilder::succeed("Done")).unwrap();
        builder.start_at(a).comment("Example").timeout_seconds(30);
        let machine = builder.build().unwrap();

        assert_eq!(
            machine.compile(),
            json!({
                "Comment": "Example",
                "StartAt": "Done",
                "TimeoutSeconds": 30,
                "States": {"Done": {"Type": "Succeed"}}
            })
        );
        assert!(machine.to_json_pretty().unwrap().contains("\"StartAt\": \"Done\""));
    }

    #[test]
    fn simulate_records_history() {
        let machine = three_passes();
        let execution = machine
            .simulate(json!({"a": 1}), &MockResources::new(), &mut NullSink)
            .unwrap();

        assert_eq!(execution.output, json!({"a": 1}));
        assert_eq!(execution.history.path(), vec!["Pass 1", "Pass 2", "Pass 3"]);
        assert_eq!(execution.history.events()[0].state_type, "Pass");
    }

    #[test]
    fn cyclic_machines_hit_transition_limit() {
        let mut builder = StateMachine::builder();
        let a = builder.add(StateBuilder::pass("A")).unwrap();
        builder.then(a, a);
        builder.start_at(a);
        let machine = builder.build().unwrap();

        let err = machine
            .simulate_with_options(
                json!({}),
                &MockResources::new(),
                &mut NullSink,
                SimulationOptions::default().max_transitions(5),
            )
            .unwrap_err();

        assert_eq!(err, SimulationError::TransitionLimitExceeded { limit: 5 });
    }

    #[test]
    fn lookups_by_id_and_name() {
        let machine = three_passes();

        assert_eq!(machine.find("Pass 2").map(State::name), Some("Pass 2"));
        assert!(machine.find("Missing").is_none());
        assert_eq!(machine.name_of(machine.start()), "Pass 1");
        assert_eq!(machine.states().len(), 3);
    }

    #[test]
    fn simulate_writes_step_trace() {
        let machine = three_passes();
        let mut sink = MemorySink::new();
        machine
            .simulate(json!({}), &MockResources::new(), &mut sink)
            .unwrap();

        assert_eq!(
            sink.step_output(),
            "Running Pass 1\nPassing\nRunning Pass 2\nPassing\nRunning Pass 3\nPassing\n"
        );
    }
}
