//! Batch task-graph protocol.
//!
//! The oracle delivers a whole plan at once: an ordered task list where
//! each task may depend on earlier tasks by index. All tasks are validated
//! before any execute. Execution is strictly in list order; a task whose
//! dependency did not succeed is recorded as failed without running. An
//! execution failure triggers one recovery request to the oracle, whose
//! plan runs recursively up to a fixed depth, after which the outer list
//! continues.

use autoforge_actions::{Dispatcher, validator};
use autoforge_core::{Error, SessionState};
use autoforge_oracle::{Oracle, PlanRequest, TaskPlan};
use autoforge_session::ContextDigest;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::console::OperatorConsole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    /// Failed validation; never executed
    Invalid,
    /// Skipped as redundant; counts as satisfied for dependents
    Satisfied,
    Succeeded,
    Failed,
}

/// Execute a task plan against the session.
pub async fn run_batch(
    oracle: &dyn Oracle,
    dispatcher: &Dispatcher,
    console: &mut dyn OperatorConsole,
    state: &mut SessionState,
    plan: &TaskPlan,
    max_depth: u32,
) -> Result<(), Error> {
    run_batch_inner(oracle, dispatcher, console, state, plan, 0, max_depth).await
}

async fn run_batch_inner(
    oracle: &dyn Oracle,
    dispatcher: &Dispatcher,
    console: &mut dyn OperatorConsole,
    state: &mut SessionState,
    plan: &TaskPlan,
    depth: u32,
    max_depth: u32,
) -> Result<(), Error> {
    info!(tasks = plan.tasks.len(), depth, "Executing task plan");

    // Validate everything up front; invalid tasks never run.
    let mut slots = vec![Slot::Pending; plan.tasks.len()];
    let mut kinds = Vec::with_capacity(plan.tasks.len());
    for (i, task) in plan.tasks.iter().enumerate() {
        let args = task_args(task);
        match validator::validate(dispatcher.catalog(), &task.action, &args) {
            Ok(kind) => {
                if let Some(reason) = validator::check_redundancy(state, kind, &args) {
                    debug!(index = i, action = %task.action, reason, "Skipping redundant task");
                    slots[i] = Slot::Satisfied;
                }
                kinds.push(Some(kind));
            }
            Err(e) => {
                warn!(index = i, action = %task.action, error = %e, "Invalid task in plan");
                slots[i] = Slot::Invalid;
                kinds.push(None);
            }
        }
    }

    for (i, task) in plan.tasks.iter().enumerate() {
        if slots[i] != Slot::Pending {
            continue;
        }
        let kind = match kinds[i] {
            Some(kind) => kind,
            None => continue,
        };
        let args = task_args(task);

        // Only earlier tasks are legal dependencies.
        let unmet = task.depends_on.iter().any(|&d| {
            d >= i || !matches!(slots[d], Slot::Succeeded | Slot::Satisfied)
        });
        let protocol = state.protocol;
        if unmet {
            dispatcher.record_unmet_dependency(state, kind, &args, protocol);
            slots[i] = Slot::Failed;
            continue;
        }

        match dispatcher.dispatch(state, kind, &args, protocol).await {
            Ok(outcome) => {
                if let Some(question) = outcome
                    .data
                    .as_ref()
                    .and_then(|d| d.get("question"))
                    .and_then(|q| q.as_str())
                {
                    let answer = console.clarify(question);
                    state.directive = format!("{}\nOperator clarification: {answer}", state.directive);
                }
                slots[i] = if outcome.success { Slot::Succeeded } else { Slot::Failed };
            }
            Err(e) => {
                slots[i] = Slot::Failed;
                if depth >= max_depth {
                    warn!(index = i, depth, "Recovery depth exhausted, continuing plan");
                    continue;
                }
                info!(index = i, depth, "Requesting recovery plan");
                let recovery = oracle
                    .plan(PlanRequest {
                        directive: state.directive.clone(),
                        digest: ContextDigest::to_value(state),
                        catalog: dispatcher.catalog().advertisement(),
                        failed_task: Some(json!({
                            "index": i,
                            "action": task.action,
                            "parameters": task.parameters,
                            "error": e.to_string(),
                        })),
                    })
                    .await?;
                Box::pin(run_batch_inner(
                    oracle,
                    dispatcher,
                    console,
                    state,
                    &recovery,
                    depth + 1,
                    max_depth,
                ))
                .await?;
            }
        }
    }

    Ok(())
}

fn task_args(task: &autoforge_oracle::PlannedTask) -> Map<String, Value> {
    let mut args = task.parameters.clone();
    if let Some(feature) = &task.feature {
        args.insert("feature".to_string(), Value::String(feature.clone()));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoforge_actions::dispatcher::UNMET_DEPENDENCY;
    use autoforge_core::{ActionKind, Language, Protocol};
    use autoforge_oracle::{PlannedTask, ScriptedOracle};
    use autoforge_session::Assessment;
    use crate::console::{Decision, OperatorConsole};

    struct SilentConsole;

    impl OperatorConsole for SilentConsole {
        fn decide(&mut self, _: &Assessment, _: &SessionState) -> Decision {
            Decision::Stop
        }

        fn clarify(&mut self, _question: &str) -> String {
            String::new()
        }
    }

    fn node_state(dir: &std::path::Path) -> SessionState {
        SessionState::new(
            dir.to_path_buf(),
            Language::Node,
            "build a web app",
            Protocol::TaskGraph,
        )
    }

    fn task(action: &str, params: Value, depends_on: Vec<usize>) -> PlannedTask {
        PlannedTask {
            action: action.into(),
            parameters: params.as_object().cloned().unwrap_or_default(),
            depends_on,
            feature: None,
        }
    }

    #[tokio::test]
    async fn failed_dependency_skips_dependent() {
        // create_venv fails for a node project; the dependent file must
        // never be written
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::new();
        oracle.push_plan(TaskPlan::default()); // empty recovery plan
        let dispatcher = Dispatcher::new();
        let mut state = node_state(dir.path());

        let plan = TaskPlan {
            tasks: vec![
                task("create_venv", json!({"path": "."}), vec![]),
                task(
                    "create_file",
                    json!({"path": "server.js", "content": "x"}),
                    vec![0],
                ),
            ],
        };

        run_batch(&oracle, &dispatcher, &mut SilentConsole, &mut state, &plan, 3)
            .await
            .unwrap();

        assert!(!dir.path().join("server.js").exists());
        assert_eq!(state.history.len(), 2);
        assert!(!state.history[0].success);
        assert_eq!(state.history[1].summary, UNMET_DEPENDENCY);
        assert_eq!(state.history[1].action, ActionKind::CreateFile);
    }

    #[tokio::test]
    async fn recovery_plan_is_requested_and_executed() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::new();
        oracle.push_plan(TaskPlan {
            tasks: vec![task(
                "create_file",
                json!({"path": "recovered.txt", "content": "ok"}),
                vec![],
            )],
        });
        let dispatcher = Dispatcher::new();
        let mut state = node_state(dir.path());

        let plan = TaskPlan {
            tasks: vec![task("create_venv", json!({"path": "."}), vec![])],
        };

        run_batch(&oracle, &dispatcher, &mut SilentConsole, &mut state, &plan, 3)
            .await
            .unwrap();

        assert!(dir.path().join("recovered.txt").exists());
        let requests = oracle.plan_requests();
        assert_eq!(requests.len(), 1);
        let failed = requests[0].failed_task.as_ref().unwrap();
        assert_eq!(failed["action"], "create_venv");
    }

    #[tokio::test]
    async fn recovery_depth_is_bounded() {
        // every recovery plan fails again; with depth 1 only one recovery
        // request may be issued
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::new();
        for _ in 0..5 {
            oracle.push_plan(TaskPlan {
                tasks: vec![task("create_venv", json!({"path": "."}), vec![])],
            });
        }
        let dispatcher = Dispatcher::new();
        let mut state = node_state(dir.path());

        let plan = TaskPlan {
            tasks: vec![task("create_venv", json!({"path": "."}), vec![])],
        };

        run_batch(&oracle, &dispatcher, &mut SilentConsole, &mut state, &plan, 1)
            .await
            .unwrap();

        assert_eq!(oracle.plan_requests().len(), 1);
    }

    #[tokio::test]
    async fn invalid_task_blocks_dependents_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::new();
        let dispatcher = Dispatcher::new();
        let mut state = node_state(dir.path());

        let plan = TaskPlan {
            tasks: vec![
                task("summon_daemon", json!({}), vec![]),
                task("create_file", json!({"path": "a.txt", "content": "x"}), vec![0]),
            ],
        };

        run_batch(&oracle, &dispatcher, &mut SilentConsole, &mut state, &plan, 3)
            .await
            .unwrap();

        // the invalid task leaves no record; the dependent is marked failed
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].summary, UNMET_DEPENDENCY);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn forward_dependency_is_unmet() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::new();
        let dispatcher = Dispatcher::new();
        let mut state = node_state(dir.path());

        let plan = TaskPlan {
            tasks: vec![
                task("create_file", json!({"path": "a.txt", "content": "x"}), vec![1]),
                task("create_file", json!({"path": "b.txt", "content": "x"}), vec![]),
            ],
        };

        run_batch(&oracle, &dispatcher, &mut SilentConsole, &mut state, &plan, 3)
            .await
            .unwrap();

        assert!(!dir.path().join("a.txt").exists());
        assert!(dir.path().join("b.txt").exists());
        assert_eq!(state.history[0].summary, UNMET_DEPENDENCY);
    }

    #[tokio::test]
    async fn redundant_task_satisfies_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::new();
        let dispatcher = Dispatcher::new();
        let mut state = node_state(dir.path());
        state.add_feature("authentication");

        let plan = TaskPlan {
            tasks: vec![
                PlannedTask {
                    action: "create_file".into(),
                    parameters: json!({"path": "auth.js", "content": "x"})
                        .as_object()
                        .cloned()
                        .unwrap(),
                    depends_on: vec![],
                    feature: Some("authentication".into()),
                },
                task("create_file", json!({"path": "b.txt", "content": "x"}), vec![0]),
            ],
        };

        run_batch(&oracle, &dispatcher, &mut SilentConsole, &mut state, &plan, 3)
            .await
            .unwrap();

        // the duplicate is skipped, its dependent still runs
        assert!(!dir.path().join("auth.js").exists());
        assert!(dir.path().join("b.txt").exists());
        assert_eq!(state.history.len(), 1);
    }
}
