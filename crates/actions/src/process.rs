//! Subprocess helper shared by the dispatcher's handlers.
//!
//! Exit status is the only authoritative success signal; captured output is
//! returned for coarse substring heuristics and task summaries.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

pub(crate) struct CmdOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    /// Combined output for summaries: stdout, with stderr appended on failure.
    pub fn combined(&self) -> String {
        if self.success || self.stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            format!("{}\n{}", self.stdout.trim(), self.stderr.trim())
                .trim()
                .to_string()
        }
    }
}

pub(crate) enum RunError {
    Spawn(String),
    TimedOut(u64),
}

/// Run a subprocess to completion, optionally bounded by a timeout.
pub(crate) async fn run(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<CmdOutput, RunError> {
    debug!(program, ?args, "Running subprocess");

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let fut = cmd.output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| RunError::TimedOut(timeout.map(|t| t.as_secs()).unwrap_or(0)))?,
        None => fut.await,
    }
    .map_err(|e| RunError::Spawn(format!("failed to run {program}: {e}")))?;

    Ok(CmdOutput {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
