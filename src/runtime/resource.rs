//! Resources invoked by Task states.

use crate::core::StateFailure;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Why a resource invocation did not produce output.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvokeError {
    /// No implementation is registered for the URI.
    #[error("resource not found")]
    NotFound,

    /// The implementation ran and reported a named failure.
    #[error(transparent)]
    Failed(#[from] StateFailure),
}

/// Capability for invoking a resource by URI.
///
/// Implemented by [`MockResources`] and by any
/// `Fn(&str, Value) -> Result<Value, InvokeError>` closure.
pub trait ResourceInvoker {
    fn invoke(&self, resource: &str, input: Value) -> Result<Value, InvokeError>;
}

impl<F> ResourceInvoker for F
where
    F: Fn(&str, Value) -> Result<Value, InvokeError>,
{
    fn invoke(&self, resource: &str, input: Value) -> Result<Value, InvokeError> {
        self(resource, input)
    }
}

type MockFn = Box<dyn Fn(Value) -> Result<Value, StateFailure>>;

/// Registry of mock implementations keyed by resource URI.
///
/// # Example
///
/// ```rust
/// use stepsim::runtime::{InvokeError, MockResources, ResourceInvoker};
/// use serde_json::json;
///
/// let resources = MockResources::new()
///     .with("arn:double", |input| Ok(json!(input["n"].as_i64().unwrap_or(0) * 2)))
///     .with_value("arn:constant", json!("ok"));
///
/// assert_eq!(resources.invoke("arn:double", json!({"n": 4})), Ok(json!(8)));
/// assert_eq!(resources.invoke("arn:constant", json!({})), Ok(json!("ok")));
/// assert_eq!(resources.invoke("arn:missing", json!({})), Err(InvokeError::NotFound));
/// ```
#[derive(Default)]
pub struct MockResources {
    mocks: HashMap<String, MockFn>,
}

impl MockResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mock, replacing any previous one for the same URI.
    pub fn register<F>(&mut self, resource: impl Into<String>, mock: F)
    where
        F: Fn(Value) -> Result<Value, StateFailure> + 'static,
    {
        self.mocks.insert(resource.into(), Box::new(mock));
    }

    pub fn with<F>(mut self, resource: impl Into<String>, mock: F) -> Self
    where
        F: Fn(Value) -> Result<Value, StateFailure> + 'static,
    {
        self.register(resource, mock);
        self
    }

    /// Register a mock that always returns `value`.
    pub fn with_value(self, resource: impl Into<String>, value: Value) -> Self {
        self.with(resource, move |_| Ok(value.clone()))
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.mocks.contains_key(resource)
    }

    pub fn len(&self) -> usize {
        self.mocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mocks.is_empty()
    }
}

impl ResourceInvoker for MockResources {
    fn invoke(&self, resource: &str, input: Value) -> Result<Value, InvokeError> {
        let mock = self.mocks.get(resource).ok_or(InvokeError::NotFound)?;
        Ok(mock(input)?)
    }
}

impl fmt::Debug for MockResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resources: Vec<&str> = self.mocks.keys().map(String::as_str).collect();
        resources.sort_unstable();
        f.debug_struct("MockResources")
            .field("resources", &resources)
            .finish()
    }
}
