//! Proposal validation and sandboxed action dispatch.
//!
//! The validator checks a proposed action against the catalog with no side
//! effects; the dispatcher maps each validated action to its handler,
//! mutates the workspace, and appends exactly one task record per attempt.

pub mod dispatcher;
pub mod environment;
mod process;
pub mod validator;

pub use dispatcher::Dispatcher;
pub use environment::validate_environment;
pub use validator::{check_redundancy, validate};
