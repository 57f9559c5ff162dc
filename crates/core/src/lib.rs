//! Core domain types for autoforge.
//!
//! This crate defines the vocabulary shared by every other crate:
//! the action catalog, task records, conversation turns, session state,
//! and the error taxonomy. It holds no I/O and no side effects.

pub mod action;
pub mod conversation;
pub mod error;
pub mod session;
pub mod task;

pub use action::{ActionCatalog, ActionDefinition, ActionKind, ActionOutcome, ParamType, ParameterSpec};
pub use conversation::{ConversationTurn, TurnPart, TurnRole};
pub use error::{ActionError, Error, OracleError, Result, StateError, ValidationError};
pub use session::{Language, SessionState};
pub use task::{Protocol, TaskRecord};
