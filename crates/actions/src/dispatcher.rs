//! The execution dispatcher: one handler per catalog entry, dispatched by
//! exhaustive match on [`ActionKind`].
//!
//! Every invocation appends exactly one task record, successful or not.
//! Handlers are caught at the dispatch boundary, recorded, and the error is
//! returned to the caller. Side effects are not transactional: a failing
//! handler may leave partial filesystem mutations behind, and recovery is
//! the orchestration loop's job.

use std::path::{Path, PathBuf};
use std::time::Duration;

use autoforge_core::{
    ActionCatalog, ActionError, ActionKind, ActionOutcome, Language, Protocol, SessionState,
    TaskRecord,
};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::process::{self, RunError};

const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Marker summary for a batch task skipped because a dependency failed.
pub const UNMET_DEPENDENCY: &str = "failed-by-unmet-dependency";

/// Sandboxed executor for the fixed action catalog.
pub struct Dispatcher {
    catalog: ActionCatalog,
    install_timeout: Duration,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            catalog: ActionCatalog::builtin(),
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
        }
    }

    /// Bound the dependency-install subprocess by a custom timeout.
    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// Execute a validated action against the session's workspace.
    ///
    /// Appends exactly one [`TaskRecord`] whether the handler succeeds,
    /// returns a soft failure, or errors out.
    pub async fn dispatch(
        &self,
        state: &mut SessionState,
        kind: ActionKind,
        args: &Map<String, Value>,
        protocol: Protocol,
    ) -> Result<ActionOutcome, ActionError> {
        debug!(action = %kind, "Dispatching action");
        let result = self.execute(state, kind, args).await;

        match &result {
            Ok(outcome) => {
                info!(action = %kind, success = outcome.success, "Action finished");
                state.record(TaskRecord::new(
                    kind,
                    args.clone(),
                    outcome.success,
                    outcome.summary.clone(),
                    protocol,
                ));
            }
            Err(e) => {
                warn!(action = %kind, error = %e, "Action failed");
                state.record(TaskRecord::new(
                    kind,
                    args.clone(),
                    false,
                    e.to_string(),
                    protocol,
                ));
            }
        }

        result
    }

    /// Record a batch task whose handler was never invoked because one of
    /// its dependencies failed.
    pub fn record_unmet_dependency(
        &self,
        state: &mut SessionState,
        kind: ActionKind,
        args: &Map<String, Value>,
        protocol: Protocol,
    ) {
        warn!(action = %kind, "Skipping task: dependency not met");
        state.record(TaskRecord::new(kind, args.clone(), false, UNMET_DEPENDENCY, protocol));
    }

    async fn execute(
        &self,
        state: &mut SessionState,
        kind: ActionKind,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        match kind {
            ActionKind::CreateDirectory => self.create_directory(state, args).await,
            ActionKind::CreateVenv => self.create_venv(state, args).await,
            ActionKind::CreateFile | ActionKind::GenerateDocs => {
                self.write_file(state, kind, args, false).await
            }
            ActionKind::ModifyFile => self.write_file(state, kind, args, true).await,
            ActionKind::DeleteFile => self.delete_file(state, args).await,
            ActionKind::InstallDependency => self.install_dependency(state, args).await,
            ActionKind::InitGit => self.init_git(state, args).await,
            ActionKind::GitCommit => self.git_commit(state, args).await,
            ActionKind::GitBranch => self.git_branch(state, args).await,
            ActionKind::GitPush => self.git_push(state, args).await,
            ActionKind::RunScript => self.run_script(state, args).await,
            ActionKind::RunTest => self.run_test(state, args).await,
            ActionKind::RunLint => self.run_lint(state, args).await,
            ActionKind::AskOperator => Self::ask_operator(args),
        }
    }

    // --- Handlers ---

    async fn create_directory(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let dir = resolve(state, args, "path")?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| handler_err(ActionKind::CreateDirectory, e))?;
        Ok(ActionOutcome::ok(format!(
            "created directory {}",
            display_path(state, &dir)
        )))
    }

    async fn create_venv(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        if state.language != Language::Python {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::CreateVenv.name().into(),
                reason: "virtual environments only apply to python projects".into(),
            });
        }
        let base = resolve(state, args, "path")?;
        let name = str_arg(args, "name").unwrap_or(".venv");
        let venv_dir = base.join(name);
        tokio::fs::create_dir_all(&base)
            .await
            .map_err(|e| handler_err(ActionKind::CreateVenv, e))?;

        let out = run_checked(
            ActionKind::CreateVenv,
            "python3",
            &["-m", "venv", &venv_dir.to_string_lossy()],
            Some(&state.project_root),
            None,
        )
        .await?;
        if !out.success {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::CreateVenv.name().into(),
                reason: out.combined(),
            });
        }
        state.venv_path = Some(venv_dir.clone());
        Ok(ActionOutcome::ok(format!(
            "created virtual environment at {}",
            display_path(state, &venv_dir)
        )))
    }

    async fn write_file(
        &self,
        state: &mut SessionState,
        kind: ActionKind,
        args: &Map<String, Value>,
        expect_existing: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let path = resolve(state, args, "path")?;
        let content = str_arg(args, "content").unwrap_or_default().to_string();

        if expect_existing && !path.exists() {
            warn!(path = %path.display(), "File to modify does not exist, creating it");
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| handler_err(kind, e))?;
        }
        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| handler_err(kind, e))?;

        let display = display_path(state, &path);
        state.track_file(&display);
        state
            .file_hashes
            .insert(path.to_string_lossy().to_string(), content_hash(&content));
        if let Some(feature) = str_arg(args, "feature") {
            state.add_feature(feature);
        }
        Ok(ActionOutcome::ok(format!(
            "wrote {} bytes to {display}",
            content.len()
        )))
    }

    async fn delete_file(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let path = resolve(state, args, "path")?;
        let shown = display_path(state, &path);
        if !path.exists() {
            warn!(path = %shown, "File to delete does not exist");
            return Ok(ActionOutcome::ok(format!("{shown} did not exist")));
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| handler_err(ActionKind::DeleteFile, e))?;
        state.untrack_file(&shown);
        state.file_hashes.remove(&path.to_string_lossy().to_string());
        Ok(ActionOutcome::ok(format!("deleted {shown}")))
    }

    async fn install_dependency(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let package = str_arg(args, "package").unwrap_or_default().to_string();
        let version = str_arg(args, "version").map(str::to_string);

        let (program, cmd_args, recorded) = match state.language {
            Language::Python => {
                let interp = interpreter(state);
                let spec = match &version {
                    Some(v) => format!("{package}=={v}"),
                    None => package.clone(),
                };
                (interp, vec!["-m".into(), "pip".into(), "install".into(), spec.clone()], spec)
            }
            Language::Node => {
                let spec = match &version {
                    Some(v) => format!("{package}@{v}"),
                    None => package.clone(),
                };
                ("npm".into(), vec!["install".into(), spec.clone()], spec)
            }
        };

        let arg_refs: Vec<&str> = cmd_args.iter().map(String::as_str).collect();
        let out = run_checked(
            ActionKind::InstallDependency,
            &program,
            &arg_refs,
            Some(&state.project_root),
            Some(self.install_timeout),
        )
        .await?;

        if !out.success {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::InstallDependency.name().into(),
                reason: out.combined(),
            });
        }
        if !state.installed_deps.contains(&recorded) {
            state.installed_deps.push(recorded.clone());
        }
        if let Some(feature) = str_arg(args, "feature") {
            state.add_feature(feature);
        }
        Ok(ActionOutcome::ok(format!("installed {recorded}")))
    }

    async fn init_git(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let repo = resolve(state, args, "path")?;
        tokio::fs::create_dir_all(&repo)
            .await
            .map_err(|e| handler_err(ActionKind::InitGit, e))?;
        let out =
            run_checked(ActionKind::InitGit, "git", &["init"], Some(&repo), None).await?;
        if !out.success {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::InitGit.name().into(),
                reason: out.combined(),
            });
        }
        state.vcs_initialized = true;
        Ok(ActionOutcome::ok(format!(
            "initialized git repository in {}",
            display_path(state, &repo)
        )))
    }

    async fn git_commit(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let repo = resolve(state, args, "path")?;
        let message = str_arg(args, "message").unwrap_or("Automated commit");

        run_checked(ActionKind::GitCommit, "git", &["add", "-A"], Some(&repo), None).await?;
        let out = run_checked(
            ActionKind::GitCommit,
            "git",
            &["commit", "-m", message],
            Some(&repo),
            None,
        )
        .await?;
        if !out.success {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::GitCommit.name().into(),
                reason: out.combined(),
            });
        }
        Ok(ActionOutcome::ok(format!("committed: {message}")))
    }

    async fn git_branch(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let repo = resolve(state, args, "path")?;
        let name = str_arg(args, "name").unwrap_or_default().to_string();

        // `checkout -b` also works on an unborn HEAD, unlike `git branch`.
        let out = run_checked(
            ActionKind::GitBranch,
            "git",
            &["checkout", "-b", &name],
            Some(&repo),
            None,
        )
        .await?;
        if !out.success {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::GitBranch.name().into(),
                reason: out.combined(),
            });
        }
        Ok(ActionOutcome::ok(format!("switched to new branch {name}")))
    }

    async fn git_push(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let repo = resolve(state, args, "path")?;
        let remote = str_arg(args, "remote").unwrap_or("origin");
        let mut cmd_args = vec!["push", remote];
        if let Some(branch) = str_arg(args, "branch") {
            cmd_args.push(branch);
        }

        let out =
            run_checked(ActionKind::GitPush, "git", &cmd_args, Some(&repo), None).await?;
        if !out.success {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::GitPush.name().into(),
                reason: out.combined(),
            });
        }
        Ok(ActionOutcome::ok(format!("pushed to {remote}")))
    }

    async fn run_script(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let script = resolve(state, args, "path")?;
        let script_str = script.to_string_lossy().to_string();
        let (program, cmd_args) = match state.language {
            Language::Python => (interpreter(state), vec![script_str.clone()]),
            Language::Node => ("node".to_string(), vec![script_str.clone()]),
        };
        let arg_refs: Vec<&str> = cmd_args.iter().map(String::as_str).collect();
        let out = run_checked(
            ActionKind::RunScript,
            &program,
            &arg_refs,
            Some(&state.project_root),
            None,
        )
        .await?;
        if !out.success {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::RunScript.name().into(),
                reason: format!("exit {}: {}", out.exit_code, out.combined()),
            });
        }
        Ok(ActionOutcome::ok(out.combined()))
    }

    async fn run_test(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let test_path = resolve(state, args, "path")?;
        let display = display_path(state, &test_path);
        let test_str = test_path.to_string_lossy().to_string();

        let (program, cmd_args) = match state.language {
            Language::Python => (
                interpreter(state),
                vec!["-m".to_string(), "pytest".to_string(), test_str.clone()],
            ),
            Language::Node => (
                "npm".to_string(),
                vec!["test".to_string(), "--".to_string(), test_str.clone()],
            ),
        };
        let arg_refs: Vec<&str> = cmd_args.iter().map(String::as_str).collect();
        let out = run_checked(
            ActionKind::RunTest,
            &program,
            &arg_refs,
            Some(&state.project_root),
            None,
        )
        .await?;

        let verdict = if out.success { "Passed" } else { "Failed" };
        state
            .test_results
            .push(format!("Tests for {display}: {verdict}"));
        if !out.success {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::RunTest.name().into(),
                reason: out.combined(),
            });
        }
        Ok(ActionOutcome::ok(format!("tests passed for {display}")))
    }

    async fn run_lint(
        &self,
        state: &mut SessionState,
        args: &Map<String, Value>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve(state, args, "path")?;
        let display = display_path(state, &target);
        let target_str = target.to_string_lossy().to_string();
        let default_tool = match state.language {
            Language::Python => "flake8",
            Language::Node => "eslint",
        };
        let tool = str_arg(args, "tool").unwrap_or(default_tool);
        if tool != default_tool {
            return Err(ActionError::HandlerFailed {
                action: ActionKind::RunLint.name().into(),
                reason: format!("unsupported linter '{tool}' for {}", state.language.name()),
            });
        }
        let fix = args
            .get("fix")
            .map(|v| v.as_bool().unwrap_or(v.as_str() == Some("true")))
            .unwrap_or(false);

        let mut summary = format!("Linting {display} with {tool}: ");

        match state.language {
            Language::Python => {
                if fix {
                    let interp = interpreter(state);
                    let fix_out = run_checked(
                        ActionKind::RunLint,
                        &interp,
                        &["-m", "autopep8", "--in-place", &target_str],
                        Some(&state.project_root),
                        None,
                    )
                    .await?;
                    summary.push_str(if fix_out.success {
                        "Fixed issues with autopep8. "
                    } else {
                        "autopep8 failed. "
                    });
                }
                let interp = interpreter(state);
                let mut out = run_checked(
                    ActionKind::RunLint,
                    &interp,
                    &["-m", "flake8", &target_str],
                    Some(&state.project_root),
                    None,
                )
                .await?;
                if missing_module(&out, "flake8") {
                    info!("flake8 not installed, installing it");
                    let install = run_checked(
                        ActionKind::RunLint,
                        &interp,
                        &["-m", "pip", "install", "flake8"],
                        Some(&state.project_root),
                        Some(self.install_timeout),
                    )
                    .await?;
                    if install.success {
                        out = run_checked(
                            ActionKind::RunLint,
                            &interp,
                            &["-m", "flake8", &target_str],
                            Some(&state.project_root),
                            None,
                        )
                        .await?;
                    } else {
                        summary.push_str("flake8 missing and could not be installed. ");
                    }
                }
                summary.push_str(&lint_verdict(&out));
            }
            Language::Node => {
                let mut cmd_args = vec![target_str.as_str()];
                if fix {
                    cmd_args.push("--fix");
                }
                let out = run_checked(
                    ActionKind::RunLint,
                    "eslint",
                    &cmd_args,
                    Some(&state.project_root),
                    None,
                )
                .await?;
                summary.push_str(&lint_verdict(&out));
            }
        }

        state.lint_results.push(summary.clone());
        if let Some(feature) = str_arg(args, "feature") {
            state.add_feature(feature);
        }
        Ok(ActionOutcome::ok(summary))
    }

    fn ask_operator(args: &Map<String, Value>) -> Result<ActionOutcome, ActionError> {
        let question = str_arg(args, "question").unwrap_or_default().to_string();
        Ok(ActionOutcome {
            success: true,
            summary: format!("clarification requested: {question}"),
            data: Some(serde_json::json!({ "question": question })),
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// --- Helpers ---

/// Exit status is authoritative, but tools that report cleanliness in prose
/// get a coarse substring check as well.
fn lint_verdict(out: &process::CmdOutput) -> String {
    if out.success || out.combined().to_lowercase().contains("no issues found") {
        "Passed".into()
    } else {
        format!("Issues found: {}", out.combined())
    }
}

/// Detect `python -m <module>` failing because the module is absent.
/// Interpreter versions differ on quoting the module name.
fn missing_module(out: &process::CmdOutput, module: &str) -> bool {
    if out.success {
        return false;
    }
    let combined = out.combined();
    combined.contains(&format!("No module named {module}"))
        || combined.contains(&format!("No module named '{module}'"))
}

fn resolve(
    state: &SessionState,
    args: &Map<String, Value>,
    name: &str,
) -> Result<PathBuf, ActionError> {
    let raw = str_arg(args, name).ok_or_else(|| ActionError::HandlerFailed {
        action: "resolve".into(),
        reason: format!("missing '{name}' argument"),
    })?;
    autoforge_security::resolve_in_root(&state.project_root, raw).map_err(|_| {
        ActionError::PathEscape { path: raw.to_string() }
    })
}

fn display_path(state: &SessionState, path: &Path) -> String {
    path.strip_prefix(&state.project_root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

fn str_arg<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

fn content_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

fn interpreter(state: &SessionState) -> String {
    if let Some(venv) = &state.venv_path {
        let bin = if cfg!(target_os = "windows") {
            venv.join("Scripts").join("python.exe")
        } else {
            venv.join("bin").join("python")
        };
        return bin.to_string_lossy().to_string();
    }
    match state.language {
        Language::Python => "python3".into(),
        Language::Node => "node".into(),
    }
}

fn handler_err(action: ActionKind, e: impl std::fmt::Display) -> ActionError {
    ActionError::HandlerFailed {
        action: action.name().into(),
        reason: e.to_string(),
    }
}

async fn run_checked(
    action: ActionKind,
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Option<std::time::Duration>,
) -> Result<process::CmdOutput, ActionError> {
    process::run(program, args, cwd, timeout)
        .await
        .map_err(|e| match e {
            RunError::Spawn(reason) => ActionError::HandlerFailed {
                action: action.name().into(),
                reason,
            },
            RunError::TimedOut(secs) => ActionError::Timeout {
                action: action.name().into(),
                timeout_secs: secs,
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(root: &Path) -> SessionState {
        SessionState::new(
            root.to_path_buf(),
            Language::Python,
            "build a web app",
            Protocol::TaskGraph,
        )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn create_file_writes_tracks_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        let outcome = dispatcher
            .dispatch(
                &mut state,
                ActionKind::CreateFile,
                &args(json!({"path": "src/app.py", "content": "print(1)"})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();

        assert!(outcome.success);
        let written = dir.path().join("src/app.py");
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "print(1)");

        assert_eq!(state.history.len(), 1);
        assert!(state.history[0].success);
        assert_eq!(state.history[0].action, ActionKind::CreateFile);
        assert!(state.tracked_files.contains(&"src/app.py".to_string()));
        assert!(state
            .file_hashes
            .contains_key(&written.to_string_lossy().to_string()));
    }

    #[tokio::test]
    async fn delete_file_removes_hash_and_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        dispatcher
            .dispatch(
                &mut state,
                ActionKind::CreateFile,
                &args(json!({"path": "tmp.txt", "content": "x"})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();
        dispatcher
            .dispatch(
                &mut state,
                ActionKind::DeleteFile,
                &args(json!({"path": "tmp.txt"})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();

        assert!(!dir.path().join("tmp.txt").exists());
        assert!(state.tracked_files.is_empty());
        assert!(state.file_hashes.is_empty());
        assert_eq!(state.history.len(), 2);
    }

    #[tokio::test]
    async fn path_escape_fails_and_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        let err = dispatcher
            .dispatch(
                &mut state,
                ActionKind::CreateFile,
                &args(json!({"path": "/etc/autoforge_escape.txt", "content": "x"})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::PathEscape { .. }));
        assert_eq!(state.history.len(), 1);
        assert!(!state.history[0].success);
        assert!(!Path::new("/etc/autoforge_escape.txt").exists());
    }

    #[tokio::test]
    async fn modify_missing_file_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        let outcome = dispatcher
            .dispatch(
                &mut state,
                ActionKind::ModifyFile,
                &args(json!({"path": "late.txt", "content": "v2", "feature": "configuration"})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("late.txt")).unwrap(),
            "v2"
        );
        assert!(state.has_feature("configuration"));
    }

    #[tokio::test]
    async fn create_directory_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        dispatcher
            .dispatch(
                &mut state,
                ActionKind::CreateDirectory,
                &args(json!({"path": "a/b/c"})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[tokio::test]
    async fn ask_operator_carries_question_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        let outcome = dispatcher
            .dispatch(
                &mut state,
                ActionKind::AskOperator,
                &args(json!({"question": "Which database should I use?"})),
                Protocol::ToolCalling,
            )
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(
            outcome.data.unwrap()["question"],
            "Which database should I use?"
        );
        assert_eq!(state.history[0].protocol, Protocol::ToolCalling);
    }

    #[tokio::test]
    async fn init_git_and_commit() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        dispatcher
            .dispatch(
                &mut state,
                ActionKind::InitGit,
                &args(json!({"path": "."})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();
        assert!(state.vcs_initialized);
        assert!(dir.path().join(".git").exists());

        // Commits need an identity; configure one locally for the test repo
        for (k, v) in [("user.email", "test@example.com"), ("user.name", "Test")] {
            std::process::Command::new("git")
                .args(["config", k, v])
                .current_dir(dir.path())
                .output()
                .unwrap();
        }
        std::fs::write(dir.path().join("file.txt"), "hi").unwrap();

        let outcome = dispatcher
            .dispatch(
                &mut state,
                ActionKind::GitCommit,
                &args(json!({"path": ".", "message": "first"})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.summary.contains("first"));
    }

    #[tokio::test]
    async fn git_branch_switches_head() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        dispatcher
            .dispatch(
                &mut state,
                ActionKind::InitGit,
                &args(json!({"path": "."})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();

        let outcome = dispatcher
            .dispatch(
                &mut state,
                ActionKind::GitBranch,
                &args(json!({"path": ".", "name": "feature/api"})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();
        assert!(outcome.success);

        let head = std::process::Command::new("git")
            .args(["symbolic-ref", "--short", "HEAD"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&head.stdout).trim(),
            "feature/api"
        );
    }

    #[tokio::test]
    async fn git_push_without_remote_fails_and_is_recorded() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        dispatcher
            .dispatch(
                &mut state,
                ActionKind::InitGit,
                &args(json!({"path": "."})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap();

        let err = dispatcher
            .dispatch(
                &mut state,
                ActionKind::GitPush,
                &args(json!({"path": "."})),
                Protocol::TaskGraph,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::HandlerFailed { .. }));

        let last = state.history.last().unwrap();
        assert_eq!(last.action, ActionKind::GitPush);
        assert!(!last.success);
    }

    #[test]
    fn missing_module_detects_absent_flake8() {
        let absent = process::CmdOutput {
            success: false,
            exit_code: 1,
            stdout: String::new(),
            stderr: "/usr/bin/python3: No module named flake8".into(),
        };
        assert!(missing_module(&absent, "flake8"));

        let quoted = process::CmdOutput {
            success: false,
            exit_code: 1,
            stdout: String::new(),
            stderr: "ModuleNotFoundError: No module named 'flake8'".into(),
        };
        assert!(missing_module(&quoted, "flake8"));

        let lint_failure = process::CmdOutput {
            success: false,
            exit_code: 1,
            stdout: "app.py:1:1: F401 'os' imported but unused".into(),
            stderr: String::new(),
        };
        assert!(!missing_module(&lint_failure, "flake8"));

        let clean = process::CmdOutput {
            success: true,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(!missing_module(&clean, "flake8"));
    }

    #[tokio::test]
    async fn unmet_dependency_marker_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path());
        let dispatcher = Dispatcher::new();

        dispatcher.record_unmet_dependency(
            &mut state,
            ActionKind::CreateFile,
            &args(json!({"path": "x.txt", "content": "x"})),
            Protocol::TaskGraph,
        );

        assert_eq!(state.history.len(), 1);
        assert!(!state.history[0].success);
        assert_eq!(state.history[0].summary, UNMET_DEPENDENCY);
        assert!(!dir.path().join("x.txt").exists());
    }
}
