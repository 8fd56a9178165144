//! Stepsim: Amazon States Language state machines with local simulation
//!
//! Stepsim builds state machines from typed states, compiles them to the
//! Amazon States Language (ASL) JSON document, and simulates them locally
//! against mock resources. Definitions are pure data; simulation is a
//! synchronous walk over the states that never touches the network.
//!
//! # Core Concepts
//!
//! - **State**: one record per state, combining the type-specific behaviour
//!   with the optional InputPath, Parameters, ResultSelector, ResultPath and
//!   OutputPath stages and Retry/Catch policies
//! - **Builders**: every validation runs at construction time
//! - **Simulation**: mock resources stand in for Task resources, and every
//!   step is reported to a trace sink and to `tracing`
//!
//! # Example
//!
//! ```rust
//! use stepsim::builder::StateBuilder;
//! use stepsim::core::Retrier;
//! use stepsim::runtime::{MemorySink, MockResources, StateMachine};
//! use serde_json::json;
//!
//! let mut builder = StateMachine::builder();
//! let lookup = builder
//!     .add(
//!         StateBuilder::task("Lookup", "arn:aws:lambda:us-east-1:123456789012:function:lookup")
//!             .input_path("$.order")
//!             .result_selector(json!({"total.$": "$.total"}))
//!             .result_path(Some("$.price"))
//!             .add_retrier(Retrier::new(["States.ALL"]).max_attempts(2)),
//!     )
//!     .unwrap();
//! let done = builder.add(StateBuilder::succeed("Done")).unwrap();
//! builder.then(lookup, done);
//! builder.start_at(lookup);
//! let machine = builder.build().unwrap();
//!
//! assert_eq!(machine.compile()["States"]["Lookup"]["ResultPath"], json!("$.price"));
//!
//! let resources = MockResources::new().with(
//!     "arn:aws:lambda:us-east-1:123456789012:function:lookup",
//!     |_| Ok(json!({"total": 42, "currency": "EUR"})),
//! );
//! let mut trace = MemorySink::new();
//! let execution = machine
//!     .simulate(json!({"order": {"id": 7}}), &resources, &mut trace)
//!     .unwrap();
//!
//! assert_eq!(execution.output, json!({"id": 7, "price": {"total": 42}}));
//! assert_eq!(execution.history.path(), vec!["Lookup", "Done"]);
//! ```

pub mod builder;
pub mod core;
pub mod runtime;
pub mod state;

// Re-export commonly used types
pub use builder::{sequence, BuildError, StateBuilder, StateMachineBuilder};
pub use crate::core::{Catcher, ChoiceRule, Comparison, Retrier, StateFailure, ValidationError};
pub use runtime::{Execution, MockResources, SimulationError, StateMachine, TraceSink};
pub use state::{State, StateType};
