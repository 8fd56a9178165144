//! Builder for assembling states into a state machine.

use crate::builder::error::BuildError;
use crate::builder::state::StateBuilder;
use crate::core::StateId;
use crate::runtime::StateMachine;
use crate::state::State;
use std::collections::{HashSet, VecDeque};

/// Builder that owns states while they are being linked.
///
/// States are added first, which hands out their [`StateId`]s; links are
/// then made with [`then`](Self::then) or [`chain`](Self::chain). Targets
/// used by Choice rules and Catchers must be added before the state that
/// refers to them.
///
/// # Example
///
/// ```rust
/// use stepsim::builder::StateBuilder;
/// use stepsim::runtime::StateMachine;
///
/// let mut builder = StateMachine::builder();
/// let first = builder.add(StateBuilder::pass("First")).unwrap();
/// let second = builder.add(StateBuilder::pass("Second")).unwrap();
/// let done = builder.add(StateBuilder::succeed("Done")).unwrap();
///
/// let last = builder.then(first, second);
/// builder.then(last, done);
/// builder.start_at(first);
///
/// let machine = builder.build().unwrap();
/// let names: Vec<&str> = machine.iter().map(|s| s.name()).collect();
/// assert_eq!(names, vec!["First", "Second", "Done"]);
/// ```
#[derive(Debug, Default)]
pub struct StateMachineBuilder {
    states: Vec<State>,
    links: Vec<(StateId, StateId)>,
    start: Option<StateId>,
    comment: Option<String>,
    timeout_seconds: Option<u32>,
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `state` and add it, returning its id.
    pub fn add(&mut self, state: StateBuilder) -> Result<StateId, BuildError> {
        let state = state.build()?;
        self.add_state(state)
    }

    /// Add an already built state. Its `next` link is cleared.
    pub fn add_state(&mut self, mut state: State) -> Result<StateId, BuildError> {
        if self.states.iter().any(|s| s.name() == state.name()) {
            return Err(BuildError::DuplicateStateName(state.name().to_string()));
        }
        state.next = None;
        let id = StateId(self.states.len());
        self.states.push(state);
        Ok(id)
    }

    /// Set `to` as the successor of `from` and return `to`.
    pub fn then(&mut self, from: StateId, to: StateId) -> StateId {
        self.links.push((from, to));
        to
    }

    /// Link each state to the one after it. Returns the last id.
    pub fn chain(&mut self, ids: &[StateId]) -> Option<StateId> {
        for pair in ids.windows(2) {
            self.then(pair[0], pair[1]);
        }
        ids.last().copied()
    }

    pub fn start_at(&mut self, id: StateId) -> &mut Self {
        self.start = Some(id);
        self
    }

    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn timeout_seconds(&mut self, seconds: u32) -> &mut Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Validate the graph and produce the machine.
    pub fn build(self) -> Result<StateMachine, BuildError> {
        if self.states.is_empty() {
            return Err(BuildError::NoStates);
        }
        let start = self.start.ok_or(BuildError::MissingStartState)?;

        let mut states = self.states;
        let count = states.len();
        let check = |id: StateId| {
            if id.index() < count {
                Ok(id)
            } else {
                Err(BuildError::UnknownState(id))
            }
        };

        check(start)?;
        for (from, to) in self.links {
            let state = &mut states[check(from)?.index()];
            check(to)?;
            if state.state_type().is_terminal() {
                return Err(BuildError::TerminalSuccessor {
                    state: state.name().to_string(),
                    state_type: state.state_type().as_str(),
                });
            }
            state.next = Some(to);
        }

        for state in &states {
            for target in state.successors() {
                check(target)?;
            }
        }

        if let Some(unreachable) = find_unreachable(&states, start) {
            return Err(BuildError::UnreachableState(unreachable.name().to_string()));
        }

        Ok(StateMachine {
            states,
            start,
            comment: self.comment,
            timeout_seconds: self.timeout_seconds,
        })
    }
}

/// First state, in insertion order, that no path from `start` reaches.
fn find_unreachable(states: &[State], start: StateId) -> Option<&State> {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(id) = queue.pop_front() {
        for next in states[id.index()].successors() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    states
        .iter()
        .enumerate()
        .find(|(index, _)| !seen.contains(&StateId(*index)))
        .map(|(_, state)| state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Catcher, ChoiceRule, Comparison};

    #[test]
    fn builder_validates_required_fields() {
        let result = StateMachineBuilder::new().build();
        assert_eq!(result.unwrap_err(), BuildError::NoStates);

        let mut builder = StateMachineBuilder::new();
        builder.add(StateBuilder::pass("A")).unwrap();
        assert_eq!(builder.build().unwrap_err(), BuildError::MissingStartState);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut builder = StateMachineBuilder::new();
        builder.add(StateBuilder::pass("A")).unwrap();

        assert_eq!(
            builder.add(StateBuilder::succeed("A")),
            Err(BuildError::DuplicateStateName("A".to_string()))
        );
    }

    #[test]
    fn validation_errors_are_wrapped() {
        let mut builder = StateMachineBuilder::new();
        let err = builder
            .add(StateBuilder::pass("A").input_path("$.a*"))
            .unwrap_err();

        assert!(matches!(err, BuildError::Validation(_)));
    }

    #[test]
    fn terminal_states_cannot_have_next() {
        let mut builder = StateMachineBuilder::new();
        let done = builder.add(StateBuilder::succeed("Done")).unwrap();
        let after = builder.add(StateBuilder::pass("After")).unwrap();
        builder.then(done, after);
        builder.start_at(done);

        assert_eq!(
            builder.build().unwrap_err(),
            BuildError::TerminalSuccessor {
                state: "Done".to_string(),
                state_type: "Succeed"
            }
        );
    }

    #[test]
    fn foreign_ids_are_rejected() {
        let mut builder = StateMachineBuilder::new();
        let a = builder.add(StateBuilder::pass("A")).unwrap();
        builder.then(a, StateId(7));
        builder.start_at(a);

        assert_eq!(builder.build().unwrap_err(), BuildError::UnknownState(StateId(7)));
    }

    #[test]
    fn unreachable_states_are_rejected() {
        let mut builder = StateMachineBuilder::new();
        let a = builder.add(StateBuilder::pass("A")).unwrap();
        builder.add(StateBuilder::pass("Orphan")).unwrap();
        builder.start_at(a);

        assert_eq!(
            builder.build().unwrap_err(),
            BuildError::UnreachableState("Orphan".to_string())
        );
    }

    #[test]
    fn choice_and_catch_targets_count_as_reachable() {
        let mut builder = StateMachineBuilder::new();
        let yes = builder.add(StateBuilder::succeed("Yes")).unwrap();
        let no = builder.add(StateBuilder::fail("No")).unwrap();
        let handler = builder.add(StateBuilder::pass("Handler")).unwrap();
        let rule = ChoiceRule::variable("$.ok", Comparison::BooleanEquals(true)).unwrap();
        let choose = builder
            .add(StateBuilder::choice("Choose").when(rule, yes).otherwise(no))
            .unwrap();
        let task = builder
            .add(
                StateBuilder::task("Task", "arn:x")
                    .add_catcher(Catcher::new(["States.ALL"], handler)),
            )
            .unwrap();
        builder.then(task, choose);
        builder.then(handler, choose);
        builder.start_at(task);

        let machine = builder.build().unwrap();
        assert_eq!(machine.states().len(), 5);
        assert_eq!(machine.start_state().name(), "Task");
    }

    #[test]
    fn chain_links_in_order() {
        let mut builder = StateMachineBuilder::new();
        let ids: Vec<StateId> = ["A", "B", "C"]
            .into_iter()
            .map(|name| builder.add(StateBuilder::pass(name)).unwrap())
            .collect();

        assert_eq!(builder.chain(&ids), Some(ids[2]));
        builder.start_at(ids[0]);
        let machine = builder.build().unwrap();

        assert_eq!(machine.get(ids[0]).and_then(State::next), Some(ids[1]));
        assert_eq!(machine.get(ids[1]).and_then(State::next), Some(ids[2]));
        assert_eq!(machine.get(ids[2]).and_then(State::next), None);
    }
}
