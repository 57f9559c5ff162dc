//! The orchestration loop.
//!
//! A [`Driver`] owns one session and repeatedly asks the planning oracle
//! for work, under one of two protocols: iterative tool calling
//! ([`protocol_a`]) or batch task graphs with failure recovery
//! ([`protocol_b`]). Between iterations the session is saved, assessed,
//! and the operator console is consulted.

pub mod console;
pub mod driver;
pub mod protocol_a;
pub mod protocol_b;

pub use console::{Decision, OperatorConsole, parse_decision};
pub use driver::{Driver, Limits, RunEnd};
pub use protocol_a::ExchangeEnd;
