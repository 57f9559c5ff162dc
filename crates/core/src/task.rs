//! Task records: the append-only execution log.
//!
//! Every action invocation, successful or not, produces exactly one record.
//! Records are never mutated or reordered; they are cleared only on a full
//! session reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionKind;

/// Maximum length of a stored result-or-error summary.
pub const MAX_SUMMARY_LEN: usize = 400;

/// Which planning protocol produced a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Protocol A: iterative single-action tool-calling
    ToolCalling,
    /// Protocol B: batch dependency-graph task lists
    TaskGraph,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::ToolCalling => f.write_str("tool_calling"),
            Protocol::TaskGraph => f.write_str("task_graph"),
        }
    }
}

/// One entry in the append-only execution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// The executed action (always present in the catalog at write time)
    pub action: ActionKind,

    /// The argument mapping the action ran with
    pub args: serde_json::Map<String, serde_json::Value>,

    /// Whether the handler succeeded
    pub success: bool,

    /// Truncated result or error summary
    pub summary: String,

    /// When the attempt finished
    pub timestamp: DateTime<Utc>,

    /// Which protocol proposed this task
    pub protocol: Protocol,
}

impl TaskRecord {
    pub fn new(
        action: ActionKind,
        args: serde_json::Map<String, serde_json::Value>,
        success: bool,
        summary: impl Into<String>,
        protocol: Protocol,
    ) -> Self {
        Self {
            action,
            args,
            success,
            summary: truncate_summary(summary.into()),
            timestamp: Utc::now(),
            protocol,
        }
    }
}

/// Truncate a summary to `MAX_SUMMARY_LEN` characters on a char boundary.
fn truncate_summary(mut s: String) -> String {
    if s.chars().count() <= MAX_SUMMARY_LEN {
        return s;
    }
    let cut = s
        .char_indices()
        .nth(MAX_SUMMARY_LEN)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s.truncate(cut);
    s.push_str("... (truncated)");
    s
}
