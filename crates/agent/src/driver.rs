//! The top-level orchestration driver.
//!
//! One driver owns one session: each iteration asks the oracle for work
//! under the session's protocol, executes it, saves the session, assesses
//! progress, and consults the operator console. A cooperative cancel flag
//! is checked at iteration boundaries so an interrupt saves before exit;
//! work inside an iteration is not interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use autoforge_actions::Dispatcher;
use autoforge_core::{Error, Protocol, SessionState};
use autoforge_oracle::{Oracle, PlanRequest};
use autoforge_session::{Assessment, ContextDigest, SessionStore, assess};
use tracing::{info, warn};

use crate::console::{Decision, OperatorConsole};
use crate::protocol_a::{ExchangeEnd, run_exchange};
use crate::protocol_b::run_batch;

/// Loop limits, usually taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Oracle replies per iteration under the tool-calling protocol
    pub tool_call_ceiling: u32,
    /// Recovery recursion depth under the task-graph protocol
    pub recovery_depth: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            tool_call_ceiling: 5,
            recovery_depth: 3,
        }
    }
}

/// How a driver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The operator stopped a session whose assessment had reached
    /// completion; the project was finalized
    Completed,
    /// The operator stopped an incomplete session; the project was
    /// finalized as-is
    Stopped,
    /// The session was saved for later resumption
    Paused,
}

pub struct Driver {
    oracle: Arc<dyn Oracle>,
    console: Box<dyn OperatorConsole>,
    dispatcher: Dispatcher,
    store: SessionStore,
    limits: Limits,
    cancel: Arc<AtomicBool>,
}

impl Driver {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        console: Box<dyn OperatorConsole>,
        dispatcher: Dispatcher,
        store: SessionStore,
        limits: Limits,
    ) -> Self {
        Self {
            oracle,
            console,
            dispatcher,
            store,
            limits,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The cooperative cancel flag; set it (e.g. from a signal handler) to
    /// make the driver save and pause at the next iteration boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Drive the session until the operator stops or pauses it.
    pub async fn run(&mut self, state: &mut SessionState) -> Result<RunEnd, Error> {
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                info!("Cancel requested, saving session");
                self.store.save(state)?;
                return Ok(RunEnd::Paused);
            }

            state.iteration += 1;
            info!(iteration = state.iteration, protocol = %state.protocol, "Starting iteration");

            match state.protocol {
                Protocol::ToolCalling => {
                    let end = run_exchange(
                        self.oracle.as_ref(),
                        &self.dispatcher,
                        self.console.as_mut(),
                        state,
                        self.limits.tool_call_ceiling,
                    )
                    .await?;
                    if let ExchangeEnd::FreeText(text) = end {
                        info!(%text, "Oracle summary");
                    }
                }
                Protocol::TaskGraph => {
                    let plan = self
                        .oracle
                        .plan(PlanRequest {
                            directive: state.directive.clone(),
                            digest: ContextDigest::to_value(state),
                            catalog: self.dispatcher.catalog().advertisement(),
                            failed_task: None,
                        })
                        .await?;
                    run_batch(
                        self.oracle.as_ref(),
                        &self.dispatcher,
                        self.console.as_mut(),
                        state,
                        &plan,
                        self.limits.recovery_depth,
                    )
                    .await?;
                }
            }

            self.store.save(state)?;
            let assessment = assess(state);
            info!(score = assessment.score, complete = assessment.complete, "Assessed progress");

            // The assessment is advisory. The operator is consulted after
            // every iteration and is the only one who can end the session.
            match self.console.decide(&assessment, state) {
                Decision::Continue => {}
                Decision::AddFeature(feature) => {
                    state.directive = format!("{}\nAdd feature: {feature}", state.directive);
                }
                Decision::Directive(directive) => {
                    state.directive = directive;
                }
                Decision::Stop => {
                    self.finalize(state, &assessment).await?;
                    self.store.clear()?;
                    return Ok(if assessment.complete {
                        RunEnd::Completed
                    } else {
                        RunEnd::Stopped
                    });
                }
                Decision::Pause => {
                    return Ok(RunEnd::Paused);
                }
            }
        }
    }

    /// Write the project summary and, for version-controlled projects,
    /// commit the final tree.
    async fn finalize(&self, state: &mut SessionState, assessment: &Assessment) -> Result<(), Error> {
        let summary = render_summary(state, assessment);
        let path = state.project_root.join("PROJECT_SUMMARY.md");
        tokio::fs::write(&path, summary)
            .await
            .map_err(|e| Error::Internal(format!("write {}: {e}", path.display())))?;
        info!(path = %path.display(), "Wrote project summary");

        if state.vcs_initialized {
            let mut args = serde_json::Map::new();
            args.insert("path".into(), serde_json::Value::String(".".into()));
            args.insert(
                "message".into(),
                serde_json::Value::String("Finalize project".into()),
            );
            let protocol = state.protocol;
            if let Err(e) = self
                .dispatcher
                .dispatch(state, autoforge_core::ActionKind::GitCommit, &args, protocol)
                .await
            {
                warn!(error = %e, "Final commit failed");
            }
        }
        Ok(())
    }
}

fn render_summary(state: &SessionState, assessment: &Assessment) -> String {
    let mut out = String::new();
    out.push_str("# Project Summary\n\n");
    out.push_str(&format!("Directive: {}\n", state.directive));
    out.push_str(&format!("Language: {}\n", state.language.name()));
    out.push_str(&format!("Completeness score: {}/100\n", assessment.score));
    out.push_str(&format!("Iterations: {}\n\n", state.iteration));

    out.push_str("## Files\n");
    for f in &state.tracked_files {
        out.push_str(&format!("- {f}\n"));
    }
    out.push_str("\n## Features\n");
    for f in &state.features {
        out.push_str(&format!("- {f}\n"));
    }
    out.push_str("\n## Dependencies\n");
    for d in &state.installed_deps {
        out.push_str(&format!("- {d}\n"));
    }
    if !state.test_results.is_empty() {
        out.push_str("\n## Test results\n");
        for t in &state.test_results {
            out.push_str(&format!("- {t}\n"));
        }
    }
    if !assessment.issues.is_empty() {
        out.push_str("\n## Open issues\n");
        for i in &assessment.issues {
            out.push_str(&format!("- {i}\n"));
        }
    }
    out
}
