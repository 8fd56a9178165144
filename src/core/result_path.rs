//! ResultPath: how a state's result is combined with its input.

use crate::core::error::ValidationError;
use crate::core::failure::{names, StateFailure};
use crate::core::reference_path::ReferencePath;
use serde_json::Value;
use std::fmt;

/// Where a state's result is placed.
///
/// Only the three forms below are representable, so merging can never hit an
/// unsupported pattern at simulation time. Multi-level targets such as
/// `$.a.b` are rejected when the ResultPath is parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultPath {
    /// `null`: keep the input, discard the result.
    Discard,
    /// `$`: the result replaces the input.
    Replace,
    /// `$.field`: the result is stored under `field` of the input.
    Field(ReferencePath),
}

impl ResultPath {
    /// Parse a ResultPath; `None` stands for a JSON `null`.
    ///
    /// ```rust
    /// use stepsim::core::ResultPath;
    ///
    /// assert_eq!(ResultPath::parse(None).unwrap(), ResultPath::Discard);
    /// assert_eq!(ResultPath::parse(Some("$")).unwrap(), ResultPath::Replace);
    /// assert!(ResultPath::parse(Some("$.a.b")).is_err());
    /// ```
    pub fn parse(path: Option<&str>) -> Result<Self, ValidationError> {
        let Some(path) = path else {
            return Ok(Self::Discard);
        };
        let path = ReferencePath::parse(path)?;
        if path.is_root() {
            Ok(Self::Replace)
        } else {
            Ok(Self::Field(path))
        }
    }

    /// Combine the (post-InputPath) state input with the state result.
    pub fn merge(&self, input: &Value, result: Value) -> Result<Value, StateFailure> {
        match self {
            Self::Replace => Ok(result),
            Self::Discard => Ok(input.clone()),
            Self::Field(path) => {
                let Some(field) = path.field() else {
                    return Ok(result);
                };
                match input {
                    Value::Object(map) => {
                        let mut merged = map.clone();
                        merged.insert(field.to_string(), result);
                        Ok(Value::Object(merged))
                    }
                    other => Err(StateFailure::new(
                        names::RESULT_PATH_MATCH_FAILURE,
                        format!("Unable to apply ResultPath {path} to input {other}"),
                    )),
                }
            }
        }
    }

    /// The ASL representation: a path string, or `null` for [`ResultPath::Discard`].
    pub fn to_value(&self) -> Value {
        match self {
            Self::Discard => Value::Null,
            Self::Replace => Value::String("$".to_string()),
            Self::Field(path) => Value::String(path.to_string()),
        }
    }
}

impl fmt::Display for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discard => f.write_str("null"),
            Self::Replace => f.write_str("$"),
            Self::Field(path) => write!(f, "{path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replace_keeps_result_only() {
        let merged = ResultPath::Replace
            .merge(&json!({"a": 1}), json!({"b": 2}))
            .unwrap();
        assert_eq!(merged, json!({"b": 2}));
    }

    #[test]
    fn discard_keeps_input_only() {
        let merged = ResultPath::Discard
            .merge(&json!({"a": 1}), json!({"b": 2}))
            .unwrap();
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn field_inserts_result_into_copy_of_input() {
        let input = json!({"a": 1, "result": "old"});
        let path = ResultPath::parse(Some("$.result")).unwrap();

        let merged = path.merge(&input, json!({"b": 2})).unwrap();

        assert_eq!(merged, json!({"a": 1, "result": {"b": 2}}));
        assert_eq!(input, json!({"a": 1, "result": "old"}));
    }

    #[test]
    fn field_on_non_object_input_fails() {
        let path = ResultPath::parse(Some("$.result")).unwrap();
        let err = path.merge(&json!([1, 2]), json!(3)).unwrap_err();

        assert_eq!(err.error, names::RESULT_PATH_MATCH_FAILURE);
    }

    #[test]
    fn compiles_to_asl_values() {
        assert_eq!(ResultPath::Discard.to_value(), Value::Null);
        assert_eq!(ResultPath::Replace.to_value(), json!("$"));
        assert_eq!(
            ResultPath::parse(Some("$.out")).unwrap().to_value(),
            json!("$.out")
        );
    }
}
