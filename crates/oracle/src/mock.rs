//! Scripted oracle for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use autoforge_core::{ConversationTurn, OracleError};

use crate::{ExchangeRequest, Oracle, PlanRequest, TaskPlan};

/// An oracle that replays queued replies and records every request it saw.
///
/// Running out of queued replies is an [`OracleError::EmptyReply`], which
/// doubles as a test that the loop fails fast on oracle trouble.
#[derive(Default)]
pub struct ScriptedOracle {
    turns: Mutex<VecDeque<ConversationTurn>>,
    plans: Mutex<VecDeque<TaskPlan>>,
    exchange_requests: Mutex<Vec<ExchangeRequest>>,
    plan_requests: Mutex<Vec<PlanRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_turn(&self, turn: ConversationTurn) {
        self.turns.lock().unwrap().push_back(turn);
    }

    pub fn push_plan(&self, plan: TaskPlan) {
        self.plans.lock().unwrap().push_back(plan);
    }

    pub fn exchange_requests(&self) -> Vec<ExchangeRequest> {
        self.exchange_requests.lock().unwrap().clone()
    }

    pub fn plan_requests(&self) -> Vec<PlanRequest> {
        self.plan_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn exchange(&self, request: ExchangeRequest) -> Result<ConversationTurn, OracleError> {
        self.exchange_requests.lock().unwrap().push(request);
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(OracleError::EmptyReply)
    }

    async fn plan(&self, request: PlanRequest) -> Result<TaskPlan, OracleError> {
        self.plan_requests.lock().unwrap().push(request);
        self.plans
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(OracleError::EmptyReply)
    }
}
