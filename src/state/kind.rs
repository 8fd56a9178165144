//! Type-specific state behaviour.

use crate::core::{names, parse_timestamp, ChoiceRule, ReferencePath, StateFailure, StateId};
use crate::runtime::{
    InvokeError, SimulationContext, SimulationError, StateMachine,
};
use crate::state::StateType;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// One ordered Choice rule and the state it selects.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceBranch {
    pub rule: ChoiceRule,
    pub next: StateId,
}

/// How long a Wait state waits. Exactly one form is configured.
#[derive(Clone, Debug, PartialEq)]
pub enum WaitDuration {
    Seconds(u64),
    Timestamp(DateTime<Utc>),
    SecondsPath(ReferencePath),
    TimestampPath(ReferencePath),
}

/// The behaviour that distinguishes one state type from another.
#[derive(Clone, Debug)]
pub enum StateKind {
    /// Passes its input through, or a fixed `result` when configured.
    Pass { result: Option<Value> },
    /// Invokes an external resource.
    Task { resource: String },
    /// Picks the next state from ordered rules.
    Choice {
        choices: Vec<ChoiceBranch>,
        default: Option<StateId>,
    },
    /// Delays the machine; a no-op during simulation.
    Wait(WaitDuration),
    /// Ends the machine successfully.
    Succeed,
    /// Ends the machine with an error.
    Fail {
        error: Option<String>,
        cause: Option<String>,
    },
    /// Runs a nested machine over every item of an array, sequentially.
    Map {
        iterator: Box<StateMachine>,
        items_path: Option<ReferencePath>,
        max_concurrency: Option<u32>,
    },
}

/// Raw result of a state's own behaviour, before result processing.
pub(crate) struct Executed {
    pub output: Value,
    /// Successor chosen at run time (Choice only).
    pub branch: Option<StateId>,
}

impl Executed {
    fn output(output: Value) -> Self {
        Self {
            output,
            branch: None,
        }
    }
}

impl StateKind {
    pub fn state_type(&self) -> StateType {
        match self {
            Self::Pass { .. } => StateType::Pass,
            Self::Task { .. } => StateType::Task,
            Self::Choice { .. } => StateType::Choice,
            Self::Wait(_) => StateType::Wait,
            Self::Succeed => StateType::Succeed,
            Self::Fail { .. } => StateType::Fail,
            Self::Map { .. } => StateType::Map,
        }
    }

    pub(crate) fn compile_into(&self, compiled: &mut Map<String, Value>, machine: &StateMachine) {
        match self {
            Self::Pass { result } => {
                if let Some(result) = result {
                    compiled.insert("Result".to_string(), result.clone());
                }
            }
            Self::Task { resource } => {
                compiled.insert("Resource".to_string(), json!(resource));
            }
            Self::Choice { choices, default } => {
                let rules: Vec<Value> = choices
                    .iter()
                    .map(|branch| {
                        let mut rule = branch.rule.compile();
                        if let Value::Object(map) = &mut rule {
                            map.insert("Next".to_string(), json!(machine.name_of(branch.next)));
                        }
                        rule
                    })
                    .collect();
                compiled.insert("Choices".to_string(), Value::Array(rules));
                if let Some(default) = default {
                    compiled.insert("Default".to_string(), json!(machine.name_of(*default)));
                }
            }
            Self::Wait(wait) => {
                let (key, value) = match wait {
                    WaitDuration::Seconds(seconds) => ("Seconds", json!(seconds)),
                    WaitDuration::Timestamp(at) => (
                        "Timestamp",
                        json!(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                    ),
                    WaitDuration::SecondsPath(path) => ("SecondsPath", json!(path.to_string())),
                    WaitDuration::TimestampPath(path) => {
                        ("TimestampPath", json!(path.to_string()))
                    }
                };
                compiled.insert(key.to_string(), value);
            }
            Self::Succeed => {}
            Self::Fail { error, cause } => {
                if let Some(error) = error {
                    compiled.insert("Error".to_string(), json!(error));
                }
                if let Some(cause) = cause {
                    compiled.insert("Cause".to_string(), json!(cause));
                }
            }
            Self::Map {
                iterator,
                items_path,
                max_concurrency,
            } => {
                compiled.insert("Iterator".to_string(), iterator.compile());
                if let Some(path) = items_path.as_ref().filter(|p| !p.is_root()) {
                    compiled.insert("ItemsPath".to_string(), json!(path.to_string()));
                }
                if let Some(limit) = max_concurrency {
                    compiled.insert("MaxConcurrency".to_string(), json!(limit));
                }
            }
        }
    }

    /// Run the type-specific behaviour on the processed input.
    pub(crate) fn execute(
        &self,
        state: &str,
        input: Value,
        ctx: &mut SimulationContext<'_>,
    ) -> Result<Executed, SimulationError> {
        match self {
            Self::Pass { result } => {
                ctx.tracer.step("Passing");
                Ok(Executed::output(result.clone().unwrap_or(input)))
            }
            Self::Task { resource } => {
                ctx.tracer.step(format!("Invoking resource {resource}"));
                match ctx.resources.invoke(resource, input) {
                    Ok(output) => Ok(Executed::output(output)),
                    Err(InvokeError::NotFound) => Err(SimulationError::ResourceNotFound {
                        state: state.to_string(),
                        resource: resource.clone(),
                    }),
                    Err(InvokeError::Failed(failure)) => Err(SimulationError::Execution {
                        state: state.to_string(),
                        failure,
                    }),
                }
            }
            Self::Choice { choices, default } => {
                ctx.tracer.step("Choosing next state");
                let selected = choices
                    .iter()
                    .position(|branch| branch.rule.evaluate(&input));
                let next = match selected {
                    Some(index) => {
                        ctx.tracer.detail(format!("Choice rule {index} matched"), &input);
                        choices[index].next
                    }
                    None => match default {
                        Some(default) => {
                            ctx.tracer.detail("No choice rule matched, using default", &input);
                            *default
                        }
                        None => {
                            return Err(SimulationError::Execution {
                                state: state.to_string(),
                                failure: StateFailure::new(
                                    names::NO_CHOICE_MATCHED,
                                    "No Choice rule matched and no Default is configured",
                                ),
                            })
                        }
                    },
                };
                Ok(Executed {
                    output: input,
                    branch: Some(next),
                })
            }
            Self::Wait(wait) => {
                let line = describe_wait(wait, &input).map_err(|failure| {
                    SimulationError::Execution {
                        state: state.to_string(),
                        failure,
                    }
                })?;
                ctx.tracer.step(line);
                Ok(Executed::output(input))
            }
            Self::Succeed => {
                ctx.tracer.step("Succeeding");
                Ok(Executed::output(input))
            }
            Self::Fail { error, cause } => {
                ctx.tracer.step("Failing");
                Err(SimulationError::Failed {
                    state: state.to_string(),
                    error: error.clone(),
                    cause: cause.clone(),
                })
            }
            Self::Map {
                iterator,
                items_path,
                ..
            } => {
                let items = match items_path {
                    Some(path) => path.apply(&input).cloned(),
                    None => Some(input),
                };
                let Some(Value::Array(items)) = items else {
                    return Err(SimulationError::Execution {
                        state: state.to_string(),
                        failure: StateFailure::new(
                            names::RUNTIME,
                            "Map state input must resolve to an array",
                        ),
                    });
                };

                ctx.tracer.step(format!("Mapping over {} items", items.len()));
                let mut outputs = Vec::with_capacity(items.len());
                for item in items {
                    outputs.push(iterator.run(item, ctx)?);
                }
                Ok(Executed::output(Value::Array(outputs)))
            }
        }
    }
}

/// Resolve the wait and describe it; the simulation never sleeps.
fn describe_wait(wait: &WaitDuration, input: &Value) -> Result<String, StateFailure> {
    match wait {
        WaitDuration::Seconds(seconds) => Ok(format!("Waiting {seconds} seconds")),
        WaitDuration::Timestamp(at) => Ok(format!(
            "Waiting until {}",
            at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )),
        WaitDuration::SecondsPath(path) => path
            .apply(input)
            .and_then(Value::as_u64)
            .map(|seconds| format!("Waiting {seconds} seconds"))
            .ok_or_else(|| {
                StateFailure::new(
                    names::RUNTIME,
                    format!("SecondsPath {path} did not resolve to a non-negative integer"),
                )
            }),
        WaitDuration::TimestampPath(path) => path
            .apply(input)
            .and_then(parse_timestamp)
            .map(|at| {
                format!(
                    "Waiting until {}",
                    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
                )
            })
            .ok_or_else(|| {
                StateFailure::new(
                    names::RUNTIME,
                    format!("TimestampPath {path} did not resolve to an RFC 3339 timestamp"),
                )
            }),
    }
}
