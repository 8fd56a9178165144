//! The fixed data-processing pipeline every state runs.
//!
//! Stages run in this order, each one optional:
//!
//! 1. InputPath selects part of the raw state input.
//! 2. Parameters builds the payload handed to the state's behaviour.
//! 3. The state's own behaviour runs (see [`StateKind`](super::StateKind)).
//! 4. ResultSelector reshapes the raw result.
//! 5. ResultPath combines the post-InputPath input with the result.
//! 6. OutputPath selects part of the combined value.
//!
//! Stages 2 to 5 are covered by the state's Retry and Catch policies.
//! Each stage is also available as a pure function below.

use crate::core::{PayloadTemplate, ReferencePath, ResultPath, StateFailure, StateId};
use crate::runtime::{SimulationContext, SimulationError};
use crate::state::{State, StateField};
use serde_json::{json, Value};
use std::time::Duration;

fn select(path: Option<&ReferencePath>, value: &Value) -> Value {
    match path {
        None => value.clone(),
        Some(path) => path.apply(value).cloned().unwrap_or_else(|| json!({})),
    }
}

fn path_label(path: Option<&ReferencePath>) -> &str {
    path.map_or("$", ReferencePath::as_str)
}

/// Select the part of the raw input the state works on.
///
/// A path that does not resolve yields an empty object.
///
/// ```rust
/// use stepsim::core::ReferencePath;
/// use stepsim::state::pipeline::apply_input_path;
/// use serde_json::json;
///
/// let path = ReferencePath::parse("$.dataset2").unwrap();
/// let input = json!({"dataset1": 1, "dataset2": {"val1": "a"}});
///
/// assert_eq!(apply_input_path(Some(&path), &input), json!({"val1": "a"}));
/// assert_eq!(apply_input_path(None, &input), input);
/// ```
pub fn apply_input_path(path: Option<&ReferencePath>, input: &Value) -> Value {
    select(path, input)
}

/// Build the effective input from a Parameters template.
pub fn apply_parameters(template: Option<&PayloadTemplate>, input: Value) -> Value {
    match template {
        Some(template) => template.evaluate(&input),
        None => input,
    }
}

/// Reshape the raw result with a ResultSelector template.
pub fn apply_result_selector(template: Option<&PayloadTemplate>, result: Value) -> Value {
    match template {
        Some(template) => template.evaluate(&result),
        None => result,
    }
}

/// Combine the state input with its result. An unset ResultPath means `$`.
pub fn apply_result_path(
    result_path: Option<&ResultPath>,
    input: &Value,
    result: Value,
) -> Result<Value, StateFailure> {
    result_path
        .unwrap_or(&ResultPath::Replace)
        .merge(input, result)
}

/// Select the part of the combined value passed to the next state.
pub fn apply_output_path(path: Option<&ReferencePath>, output: &Value) -> Value {
    select(path, output)
}

/// Outcome of running one state.
#[derive(Debug)]
pub(crate) struct Step {
    pub output: Value,
    /// The state to run next; `None` ends the machine.
    pub next: Option<StateId>,
    pub retries: u32,
    pub simulated_wait: Duration,
    /// Error name handled by a Catcher, if any.
    pub caught: Option<String>,
}

struct Processed {
    output: Value,
    branch: Option<StateId>,
}

impl State {
    fn supports(&self, field: StateField) -> bool {
        self.state_type().supports(field)
    }

    /// Run the full pipeline against `raw`, resolving failures with the
    /// state's Retry and Catch policies.
    pub(crate) fn simulate(
        &self,
        raw: &Value,
        ctx: &mut SimulationContext<'_>,
    ) -> Result<Step, SimulationError> {
        let input_path = self.pipeline.input_path.as_ref();
        let input = apply_input_path(input_path, raw);
        if self.supports(StateField::InputPath) {
            ctx.tracer.detail(
                format!(
                    "State input after applying input path of {}",
                    path_label(input_path)
                ),
                &input,
            );
        }

        let mut attempts = vec![0u32; self.retriers.len()];
        let mut retries = 0u32;
        let mut simulated_wait = Duration::ZERO;

        loop {
            let err = match self.process(&input, ctx) {
                Ok(processed) => {
                    let output_path = self.pipeline.output_path.as_ref();
                    let output = apply_output_path(output_path, &processed.output);
                    if self.supports(StateField::OutputPath) {
                        ctx.tracer.detail(
                            format!(
                                "State output after applying output path of {}",
                                path_label(output_path)
                            ),
                            &output,
                        );
                    }
                    return Ok(Step {
                        output,
                        next: processed.branch.or(self.next),
                        retries,
                        simulated_wait,
                        caught: None,
                    });
                }
                Err(err) => err,
            };

            if !err.is_recoverable() {
                return Err(err);
            }
            let error_name = err.error_name().to_string();

            if let Some(index) = self.retriers.iter().position(|r| r.matches(&error_name)) {
                let retrier = &self.retriers[index];
                if attempts[index] < retrier.attempt_limit() {
                    attempts[index] += 1;
                    let delay = retrier.delay_before(attempts[index]);
                    retries += 1;
                    simulated_wait = simulated_wait.saturating_add(delay);
                    ctx.tracer
                        .retry(&error_name, attempts[index], retrier.attempt_limit(), delay);
                    continue;
                }
            }

            let Some(catcher) = self.catchers.iter().find(|c| c.matches(&error_name)) else {
                return Err(err);
            };

            let failure = err.to_failure();
            ctx.tracer.step(format!("Caught {error_name}"));
            let output = catcher
                .effective_result_path()
                .merge(raw, failure.to_error_output())
                .map_err(|failure| SimulationError::Execution {
                    state: self.name.clone(),
                    failure,
                })?;
            ctx.tracer.detail(
                format!(
                    "Output from applying catcher result path of {}",
                    catcher.effective_result_path()
                ),
                &output,
            );

            return Ok(Step {
                output,
                next: Some(catcher.next()),
                retries,
                simulated_wait,
                caught: Some(error_name),
            });
        }
    }

    /// Stages 2 to 5: everything Retry and Catch cover.
    fn process(
        &self,
        input: &Value,
        ctx: &mut SimulationContext<'_>,
    ) -> Result<Processed, SimulationError> {
        let parameters = self.pipeline.parameters.as_ref();
        let effective = apply_parameters(parameters, input.clone());
        if parameters.is_some() {
            ctx.tracer
                .detail("State input after applying parameters", &effective);
        }

        let executed = self.kind.execute(&self.name, effective, ctx)?;
        let mut output = match executed.output {
            Value::Null => json!({}),
            output => output,
        };

        let selector = self.pipeline.result_selector.as_ref();
        if selector.is_some() {
            output = apply_result_selector(selector, output);
            ctx.tracer
                .detail("Output after applying result selector", &output);
        }

        if self.supports(StateField::ResultPath) {
            let result_path = self.pipeline.result_path.as_ref();
            output = apply_result_path(result_path, input, output).map_err(|failure| {
                SimulationError::Execution {
                    state: self.name.clone(),
                    failure,
                }
            })?;
            ctx.tracer.detail(
                format!(
                    "Output from applying result path of {}",
                    result_path.unwrap_or(&ResultPath::Replace)
                ),
                &output,
            );
        }

        Ok(Processed {
            output,
            branch: executed.branch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::names;

    #[test]
    fn input_path_selects_field() {
        let path = ReferencePath::parse("$.a").unwrap();
        assert_eq!(apply_input_path(Some(&path), &json!({"a": {"b": 1}})), json!({"b": 1}));
    }

    #[test]
    fn unresolved_paths_yield_empty_object() {
        let path = ReferencePath::parse("$.missing").unwrap();
        assert_eq!(apply_input_path(Some(&path), &json!({"a": 1})), json!({}));
        assert_eq!(apply_output_path(Some(&path), &json!({"a": 1})), json!({}));
    }

    #[test]
    fn parameters_build_effective_input() {
        let template =
            PayloadTemplate::parameters(&json!({"static": 1, "copied.$": "$.value"})).unwrap();
        let effective = apply_parameters(Some(&template), json!({"value": "v", "other": 2}));

        assert_eq!(effective, json!({"static": 1, "copied": "v"}));
    }

    #[test]
    fn result_selector_drops_unselected_keys() {
        let template = PayloadTemplate::result_selector(&json!({"foo.$": "$.bar"})).unwrap();
        let selected = apply_result_selector(Some(&template), json!({"bar": 5, "baz": 6}));

        assert_eq!(selected, json!({"foo": 5}));
    }

    #[test]
    fn unset_result_path_replaces_input() {
        let merged = apply_result_path(None, &json!({"a": 1}), json!({"b": 2})).unwrap();
        assert_eq!(merged, json!({"b": 2}));
    }

    #[test]
    fn discarding_result_path_keeps_input() {
        let merged =
            apply_result_path(Some(&ResultPath::Discard), &json!({"a": 1}), json!({"b": 2}))
                .unwrap();
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn field_result_path_merges_into_input() {
        let result_path = ResultPath::parse(Some("$.result")).unwrap();
        let merged = apply_result_path(Some(&result_path), &json!({"a": 1}), json!(2)).unwrap();
        assert_eq!(merged, json!({"a": 1, "result": 2}));
    }

    #[test]
    fn field_result_path_on_scalar_input_fails() {
        let result_path = ResultPath::parse(Some("$.result")).unwrap();
        let err = apply_result_path(Some(&result_path), &json!(3), json!(2)).unwrap_err();
        assert_eq!(err.error, names::RESULT_PATH_MATCH_FAILURE);
    }
}
