//! Security boundary for the autoforge dispatcher.
//!
//! The only boundary this crate enforces is the path sandbox: every path
//! argument an action receives must resolve inside the project root.

pub mod path;

pub use path::{PathViolation, check_raw, resolve_in_root};
