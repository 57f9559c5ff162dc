//! The planning-oracle abstraction.
//!
//! The orchestration loop talks to an oracle through two calls: `exchange`
//! for the iterative tool-calling protocol and `plan` for the batch
//! task-graph protocol. The HTTP client lives in [`http`]; a scripted
//! stand-in for tests lives in [`mock`].

pub mod http;
pub mod mock;

use async_trait::async_trait;
use autoforge_core::{ConversationTurn, OracleError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use http::HttpOracle;
pub use mock::ScriptedOracle;

/// One iterative-protocol request: the directive, a digest of the session,
/// the advertised action catalog, and the conversation so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub directive: String,
    pub digest: Value,
    pub catalog: Value,
    pub turns: Vec<ConversationTurn>,
}

/// One batch-protocol request. `failed_task` is populated only on recovery
/// requests, carrying the failed task and its error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub directive: String,
    pub digest: Value,
    pub catalog: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_task: Option<Value>,
}

/// A single task in a batch plan. `depends_on` holds zero-based indices
/// into the same plan's task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub depends_on: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

/// The oracle's batch reply: an ordered task list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPlan {
    #[serde(default)]
    pub tasks: Vec<PlannedTask>,
}

/// A planning oracle the orchestration loop can drive.
#[async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    /// Iterative protocol: send the conversation, get one turn back.
    async fn exchange(&self, request: ExchangeRequest) -> Result<ConversationTurn, OracleError>;

    /// Batch protocol: request a full dependency-ordered task plan.
    async fn plan(&self, request: PlanRequest) -> Result<TaskPlan, OracleError>;
}
