//! Payload templates for the Parameters and ResultSelector fields.
//!
//! A template is a JSON object whose keys either carry a literal value or,
//! when the key ends in `.$`, a reference path resolved against the data the
//! template is applied to.

use crate::core::error::ValidationError;
use crate::core::reference_path::ReferencePath;
use serde_json::{Map, Value};

const PATH_SUFFIX: &str = ".$";

/// Which field a template was parsed for. Decides validation and how
/// unresolved paths are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateKind {
    /// Literals, nested objects and `.$` paths; unresolved paths are omitted.
    Parameters,
    /// `.$` paths only; unresolved or falsy values are omitted.
    ResultSelector,
}

impl TemplateKind {
    fn field_name(self) -> &'static str {
        match self {
            Self::Parameters => "Parameters",
            Self::ResultSelector => "ResultSelector",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Entry {
    Literal(Value),
    Path(ReferencePath),
    Nested(PayloadTemplate),
}

/// A validated Parameters or ResultSelector mapping.
///
/// # Example
///
/// ```rust
/// use stepsim::core::PayloadTemplate;
/// use serde_json::json;
///
/// let selector = PayloadTemplate::result_selector(&json!({"foo.$": "$.bar"})).unwrap();
/// let output = selector.evaluate(&json!({"bar": 5, "baz": 6}));
///
/// assert_eq!(output, json!({"foo": 5}));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PayloadTemplate {
    kind: TemplateKind,
    entries: Vec<(String, Entry)>,
}

impl PayloadTemplate {
    /// Parse a Parameters object.
    pub fn parameters(template: &Value) -> Result<Self, ValidationError> {
        Self::parse(template, TemplateKind::Parameters)
    }

    /// Parse a ResultSelector object. Every key must end in `.$`.
    pub fn result_selector(template: &Value) -> Result<Self, ValidationError> {
        Self::parse(template, TemplateKind::ResultSelector)
    }

    fn parse(template: &Value, kind: TemplateKind) -> Result<Self, ValidationError> {
        let Value::Object(map) = template else {
            return Err(ValidationError::InvalidTemplate {
                field: kind.field_name(),
                reason: format!("expected a JSON object, got {template}"),
            });
        };

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            if let Some(stripped) = key.strip_suffix(PATH_SUFFIX) {
                let Value::String(path) = value else {
                    return Err(ValidationError::InvalidTemplate {
                        field: kind.field_name(),
                        reason: format!("value of '{key}' must be a reference path string"),
                    });
                };
                entries.push((stripped.to_string(), Entry::Path(ReferencePath::parse(path)?)));
                continue;
            }

            match kind {
                TemplateKind::ResultSelector => {
                    return Err(ValidationError::InvalidResultSelectorKey { key: key.clone() });
                }
                TemplateKind::Parameters => {
                    let entry = match value {
                        Value::Object(_) => Entry::Nested(Self::parse(value, kind)?),
                        literal => Entry::Literal(literal.clone()),
                    };
                    entries.push((key.clone(), entry));
                }
            }
        }

        Ok(Self { kind, entries })
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the payload from `data`.
    pub fn evaluate(&self, data: &Value) -> Value {
        let mut output = Map::new();
        for (key, entry) in &self.entries {
            match entry {
                Entry::Literal(value) => {
                    output.insert(key.clone(), value.clone());
                }
                Entry::Nested(template) => {
                    output.insert(key.clone(), template.evaluate(data));
                }
                Entry::Path(path) => {
                    let resolved = path.apply(data).filter(|value| match self.kind {
                        TemplateKind::Parameters => true,
                        TemplateKind::ResultSelector => is_truthy(value),
                    });
                    if let Some(value) = resolved {
                        output.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Value::Object(output)
    }

    /// The ASL representation, with `.$` suffixes restored.
    pub fn compile(&self) -> Value {
        let mut compiled = Map::new();
        for (key, entry) in &self.entries {
            match entry {
                Entry::Literal(value) => {
                    compiled.insert(key.clone(), value.clone());
                }
                Entry::Nested(template) => {
                    compiled.insert(key.clone(), template.compile());
                }
                Entry::Path(path) => {
                    compiled.insert(format!("{key}{PATH_SUFFIX}"), Value::String(path.to_string()));
                }
            }
        }
        Value::Object(compiled)
    }
}

/// Falsy values are `null`, `false`, zero, and empty strings, arrays or objects.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
