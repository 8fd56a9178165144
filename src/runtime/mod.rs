//! Simulation runtime.
//!
//! A [`StateMachine`] walks its states from the start state, feeding each
//! state's output to the next. Task states call out through a
//! [`ResourceInvoker`], usually a [`MockResources`] registry, and every step
//! is reported to a [`TraceSink`].

mod error;
mod machine;
mod options;
mod resource;
mod trace;

pub use error::SimulationError;
pub use machine::{Chain, Execution, StateMachine};
pub(crate) use machine::SimulationContext;
pub use options::SimulationOptions;
pub use resource::{InvokeError, MockResources, ResourceInvoker};
pub use trace::{MemorySink, NullSink, TraceLevel, TraceSink, WriterSink};
