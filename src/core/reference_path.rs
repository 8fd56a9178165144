//! Reference paths: the restricted JSONPath subset used by InputPath,
//! OutputPath, Parameters, ResultSelector and Choice rule variables.
//!
//! Two forms are supported: `$` (the whole document) and `$.field`, where
//! the field is one or more ASCII letters. Every other JSONPath operator is
//! rejected when the path is constructed, so a `ReferencePath` value is
//! always applicable.

use crate::core::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// JSONPath operators that the restricted grammar refuses to accept.
const OPERATORS: &[char] = &['*', '.', '[', ']', '?', '@', ':', ',', '(', ')', '$'];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Selector {
    Root,
    Field(String),
}

/// A validated, immutable reference path.
///
/// # Example
///
/// ```rust
/// use stepsim::core::ReferencePath;
/// use serde_json::json;
///
/// let path = ReferencePath::parse("$.dataset").unwrap();
/// let data = json!({"dataset": {"val": 1}, "other": true});
///
/// assert_eq!(path.apply(&data), Some(&json!({"val": 1})));
/// assert_eq!(path.to_string(), "$.dataset");
///
/// assert!(ReferencePath::parse("$.dataset*").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferencePath {
    raw: String,
    selector: Selector,
}

impl ReferencePath {
    /// Parse and validate a path expression.
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        let Some(rest) = path.strip_prefix('$') else {
            return Err(ValidationError::InvalidReferencePath {
                path: path.to_string(),
                reason: "must begin with $".to_string(),
            });
        };

        if rest.is_empty() {
            return Ok(Self::root());
        }

        if rest.starts_with("..") {
            return Err(unsupported(path, ".."));
        }

        let Some(field) = rest.strip_prefix('.') else {
            let operator = rest.chars().next().map(String::from).unwrap_or_default();
            return Err(unsupported(path, &operator));
        };

        if field.is_empty() {
            return Err(ValidationError::InvalidReferencePath {
                path: path.to_string(),
                reason: "missing field name after '.'".to_string(),
            });
        }

        if let Some(bad) = field.chars().find(|c| !c.is_ascii_alphabetic()) {
            if OPERATORS.contains(&bad) {
                return Err(unsupported(path, &bad.to_string()));
            }
            return Err(ValidationError::InvalidReferencePath {
                path: path.to_string(),
                reason: format!("field names may only contain ASCII letters, found '{bad}'"),
            });
        }

        Ok(Self {
            raw: path.to_string(),
            selector: Selector::Field(field.to_string()),
        })
    }

    /// The identity path `$`.
    pub fn root() -> Self {
        Self {
            raw: "$".to_string(),
            selector: Selector::Root,
        }
    }

    /// True for `$`.
    pub fn is_root(&self) -> bool {
        matches!(self.selector, Selector::Root)
    }

    /// The selected field name for `$.field` paths.
    pub fn field(&self) -> Option<&str> {
        match &self.selector {
            Selector::Root => None,
            Selector::Field(name) => Some(name),
        }
    }

    /// The original path text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Select a sub-value.
    ///
    /// `$` returns the whole value. `$.field` performs a mapping lookup and
    /// returns `None` when the value is not an object or has no such key.
    pub fn apply<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match &self.selector {
            Selector::Root => Some(value),
            Selector::Field(name) => value.as_object().and_then(|map| map.get(name)),
        }
    }
}

fn unsupported(path: &str, operator: &str) -> ValidationError {
    ValidationError::UnsupportedOperator {
        path: path.to_string(),
        operator: operator.to_string(),
    }
}

impl fmt::Display for ReferencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ReferencePath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReferencePath {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferencePath> for String {
    fn from(path: ReferencePath) -> Self {
        path.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_path_is_identity() {
        let path = ReferencePath::parse("$").unwrap();
        let data = json!({"a": 1});

        assert!(path.is_root());
        assert_eq!(path.apply(&data), Some(&data));
    }

    #[test]
    fn field_path_selects_sub_value() {
        let path = ReferencePath::parse("$.dataset").unwrap();
        let data = json!({"dataset": [1, 2, 3], "other": "x"});

        assert_eq!(path.field(), Some("dataset"));
        assert_eq!(path.apply(&data), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn missing_field_resolves_to_nothing() {
        let path = ReferencePath::parse("$.missing").unwrap();

        assert_eq!(path.apply(&json!({"a": 1})), None);
        assert_eq!(path.apply(&json!([1, 2])), None);
        assert_eq!(path.apply(&json!("text")), None);
    }

    #[test]
    fn wildcard_is_rejected_with_operator() {
        let err = ReferencePath::parse("$.dataset*").unwrap_err();

        assert_eq!(
            err,
            ValidationError::UnsupportedOperator {
                path: "$.dataset*".to_string(),
                operator: "*".to_string(),
            }
        );
        assert!(err
            .to_string()
            .contains("Unsupported JSONPath operator: \"*\""));
    }

    #[test]
    fn other_operators_are_rejected() {
        let cases = [
            ("$..name", ".."),
            ("$[0]", "["),
            ("$.a.b", "."),
            ("$.items[0]", "["),
            ("$$", "$"),
            ("$.*", "*"),
        ];

        for (path, operator) in cases {
            match ReferencePath::parse(path) {
                Err(ValidationError::UnsupportedOperator { operator: op, .. }) => {
                    assert_eq!(op, operator, "path {path}")
                }
                other => panic!("expected unsupported operator for {path}, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(matches!(
            ReferencePath::parse("dataset"),
            Err(ValidationError::InvalidReferencePath { .. })
        ));
        assert!(matches!(
            ReferencePath::parse("$."),
            Err(ValidationError::InvalidReferencePath { .. })
        ));
        assert!(matches!(
            ReferencePath::parse("$.val1"),
            Err(ValidationError::InvalidReferencePath { .. })
        ));
    }

    #[test]
    fn display_round_trips_source_text() {
        for raw in ["$", "$.foo", "$.Bar"] {
            assert_eq!(ReferencePath::parse(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: ReferencePath = serde_json::from_value(json!("$.foo")).unwrap();
        assert_eq!(ok.field(), Some("foo"));

        let err = serde_json::from_value::<ReferencePath>(json!("$.foo[1]"));
        assert!(err.is_err());

        assert_eq!(serde_json::to_value(&ok).unwrap(), json!("$.foo"));
    }
}
