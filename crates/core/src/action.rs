//! The action catalog: the fixed set of operations the agent may perform
//! against a project workspace.
//!
//! Dispatch is an exhaustive `match` on [`ActionKind`]; the catalog itself
//! stays data-driven so it can be advertised to the decision oracle as a
//! parameter schema. The catalog is built once at startup and never mutated.

use serde::{Deserialize, Serialize};

/// Semantic type of an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Boolean,
    Number,
}

/// Schema for one parameter of an action.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    /// Whether this parameter names a filesystem path (sandboxed on dispatch).
    #[serde(skip)]
    pub path: bool,
    pub description: &'static str,
}

impl ParameterSpec {
    const fn string(name: &'static str, required: bool, description: &'static str) -> Self {
        Self { name, kind: ParamType::String, required, path: false, description }
    }

    const fn path(name: &'static str, required: bool, description: &'static str) -> Self {
        Self { name, kind: ParamType::String, required, path: true, description }
    }

    const fn boolean(name: &'static str, required: bool, description: &'static str) -> Self {
        Self { name, kind: ParamType::Boolean, required, path: false, description }
    }
}

/// The closed set of actions the dispatcher knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateDirectory,
    CreateVenv,
    CreateFile,
    ModifyFile,
    DeleteFile,
    InstallDependency,
    InitGit,
    GitCommit,
    GitBranch,
    GitPush,
    RunScript,
    RunTest,
    RunLint,
    GenerateDocs,
    AskOperator,
}

impl ActionKind {
    pub const ALL: [ActionKind; 15] = [
        ActionKind::CreateDirectory,
        ActionKind::CreateVenv,
        ActionKind::CreateFile,
        ActionKind::ModifyFile,
        ActionKind::DeleteFile,
        ActionKind::InstallDependency,
        ActionKind::InitGit,
        ActionKind::GitCommit,
        ActionKind::GitBranch,
        ActionKind::GitPush,
        ActionKind::RunScript,
        ActionKind::RunTest,
        ActionKind::RunLint,
        ActionKind::GenerateDocs,
        ActionKind::AskOperator,
    ];

    /// The wire name of this action (matches the serde representation).
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::CreateDirectory => "create_directory",
            ActionKind::CreateVenv => "create_venv",
            ActionKind::CreateFile => "create_file",
            ActionKind::ModifyFile => "modify_file",
            ActionKind::DeleteFile => "delete_file",
            ActionKind::InstallDependency => "install_dependency",
            ActionKind::InitGit => "init_git",
            ActionKind::GitCommit => "git_commit",
            ActionKind::GitBranch => "git_branch",
            ActionKind::GitPush => "git_push",
            ActionKind::RunScript => "run_script",
            ActionKind::RunTest => "run_test",
            ActionKind::RunLint => "run_lint",
            ActionKind::GenerateDocs => "generate_docs",
            ActionKind::AskOperator => "ask_operator",
        }
    }

    /// Look up an action by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the action catalog: an action plus its parameter schema.
#[derive(Debug, Clone, Serialize)]
pub struct ActionDefinition {
    #[serde(rename = "action")]
    pub kind: ActionKind,
    pub description: &'static str,
    pub params: Vec<ParameterSpec>,
}

/// Immutable, ordered catalog of every supported action.
///
/// Used by the validator to check proposals and by the oracle message
/// builders to advertise the available actions.
pub struct ActionCatalog {
    defs: Vec<ActionDefinition>,
}

impl ActionCatalog {
    /// Build the fixed builtin catalog. Called once at process start.
    pub fn builtin() -> Self {
        use ParameterSpec as P;
        let defs = vec![
            ActionDefinition {
                kind: ActionKind::CreateDirectory,
                description: "Create a directory (and any missing parents) inside the project",
                params: vec![P::path("path", true, "Directory to create")],
            },
            ActionDefinition {
                kind: ActionKind::CreateVenv,
                description: "Create a Python virtual environment for the project",
                params: vec![
                    P::path("path", true, "Directory to place the environment under"),
                    P::string("name", false, "Environment directory name (default: .venv)"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::CreateFile,
                description: "Create a file with the given content",
                params: vec![
                    P::path("path", true, "File to create"),
                    P::string("content", true, "Full file content"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::ModifyFile,
                description: "Replace the content of an existing file",
                params: vec![
                    P::path("path", true, "File to modify"),
                    P::string("content", true, "New file content"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::DeleteFile,
                description: "Delete a file from the project",
                params: vec![P::path("path", true, "File to delete")],
            },
            ActionDefinition {
                kind: ActionKind::InstallDependency,
                description: "Install a package into the project environment",
                params: vec![
                    P::string("package", true, "Package name"),
                    P::string("version", false, "Exact version to pin"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::InitGit,
                description: "Initialize a git repository in the project",
                params: vec![P::path("path", true, "Repository root")],
            },
            ActionDefinition {
                kind: ActionKind::GitCommit,
                description: "Stage all changes and commit",
                params: vec![
                    P::path("path", true, "Repository root"),
                    P::string("message", false, "Commit message"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::GitBranch,
                description: "Create a branch and switch to it",
                params: vec![
                    P::path("path", true, "Repository root"),
                    P::string("name", true, "Branch name"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::GitPush,
                description: "Push commits to a remote",
                params: vec![
                    P::path("path", true, "Repository root"),
                    P::string("remote", false, "Remote name (default: origin)"),
                    P::string("branch", false, "Branch to push (default: current)"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::RunScript,
                description: "Run a script with the project interpreter",
                params: vec![P::path("path", true, "Script to run")],
            },
            ActionDefinition {
                kind: ActionKind::RunTest,
                description: "Run the test runner against a test file",
                params: vec![P::path("path", true, "Test file to run")],
            },
            ActionDefinition {
                kind: ActionKind::RunLint,
                description: "Run the linter, optionally auto-fixing issues first",
                params: vec![
                    P::path("path", true, "File to lint"),
                    P::string("tool", false, "Lint tool (defaults to the language's linter)"),
                    P::boolean("fix", false, "Attempt auto-fix before linting"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::GenerateDocs,
                description: "Write a documentation file",
                params: vec![
                    P::path("path", true, "Documentation file to write"),
                    P::string("content", true, "Documentation content"),
                ],
            },
            ActionDefinition {
                kind: ActionKind::AskOperator,
                description: "Ask the human operator a clarifying question",
                params: vec![P::string("question", true, "Question to put to the operator")],
            },
        ];
        Self { defs }
    }

    /// Look up a definition by wire name.
    pub fn lookup(&self, name: &str) -> Option<&ActionDefinition> {
        self.defs.iter().find(|d| d.kind.name() == name)
    }

    /// Look up a definition by kind.
    pub fn get(&self, kind: ActionKind) -> &ActionDefinition {
        self.defs
            .iter()
            .find(|d| d.kind == kind)
            .expect("builtin catalog covers every ActionKind")
    }

    /// All definitions in catalog order.
    pub fn definitions(&self) -> &[ActionDefinition] {
        &self.defs
    }

    /// The catalog rendered as JSON for oracle prompts.
    pub fn advertisement(&self) -> serde_json::Value {
        serde_json::to_value(&self.defs).unwrap_or_default()
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The result of executing one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the handler succeeded
    pub success: bool,

    /// Human-readable output summary
    pub summary: String,

    /// Optional structured payload (e.g. the question for ask_operator)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionOutcome {
    pub fn ok(summary: impl Into<String>) -> Self {
        Self { success: true, summary: summary.into(), data: None }
    }

    pub fn failed(summary: impl Into<String>) -> Self {
        Self { success: false, summary: summary.into(), data: None }
    }
}
