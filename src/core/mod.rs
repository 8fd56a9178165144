//! Core definition types.
//!
//! This module contains the pure building blocks every state is made of:
//! - Reference paths and ResultPath merging
//! - Parameters / ResultSelector templates
//! - Retry and Catch policies
//! - Choice rules
//! - Immutable execution history
//!
//! Nothing in this module performs I/O or invokes resources.

mod choice;
mod error;
mod error_handlers;
mod failure;
mod history;
mod id;
mod reference_path;
mod result_path;
mod template;

pub(crate) use choice::parse_timestamp;
pub use choice::{ChoiceRule, Comparison};
pub use error::ValidationError;
pub use error_handlers::{Catcher, Retrier};
pub use failure::{names, StateFailure};
pub use history::{ExecutionHistory, StateEvent};
pub use id::StateId;
pub use reference_path::ReferencePath;
pub use result_path::ResultPath;
pub use template::{is_truthy, PayloadTemplate, TemplateKind};
