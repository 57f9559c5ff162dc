//! Session state: the single durable source of truth for one project build.
//!
//! Everything else (context digests, progress assessments, oracle prompts)
//! is derived from this structure and can be regenerated at any time.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationTurn;
use crate::task::{Protocol, TaskRecord};

/// Workspace language tag; selects interpreter, installer, test and lint tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Node,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Node => "node",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "python" => Some(Language::Python),
            "node" | "nodejs" => Some(Language::Node),
            _ => None,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Python
    }
}

/// The full durable snapshot of an agent's progress on one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Stable identifier for this session, minted at creation
    #[serde(default = "uuid::Uuid::new_v4")]
    pub id: uuid::Uuid,

    /// Absolute project root; every path argument resolves under it
    pub project_root: PathBuf,

    /// Workspace language tag
    pub language: Language,

    /// The current top-level directive
    pub directive: String,

    /// Active planning protocol, fixed for the session's lifetime
    pub protocol: Protocol,

    /// Files created or modified, project-root-relative where possible
    #[serde(default)]
    pub tracked_files: Vec<String>,

    /// Installed dependencies ("package" or "package==version")
    #[serde(default)]
    pub installed_deps: Vec<String>,

    /// Implemented feature tags
    #[serde(default)]
    pub features: Vec<String>,

    /// Recorded lint run outcomes
    #[serde(default)]
    pub lint_results: Vec<String>,

    /// Recorded test run outcomes
    #[serde(default)]
    pub test_results: Vec<String>,

    /// Resolved absolute path -> content hash of the last successful write
    #[serde(default)]
    pub file_hashes: HashMap<String, String>,

    /// Virtual environment path, if one was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venv_path: Option<PathBuf>,

    /// Whether the workspace is under version control
    #[serde(default)]
    pub vcs_initialized: bool,

    /// Completed orchestration iterations
    #[serde(default)]
    pub iteration: u64,

    /// Append-only execution history
    #[serde(default)]
    pub history: Vec<TaskRecord>,

    /// Oracle conversation (protocol A only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation: Vec<ConversationTurn>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Create a fresh session for a new top-level directive.
    pub fn new(
        project_root: PathBuf,
        language: Language,
        directive: impl Into<String>,
        protocol: Protocol,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            project_root,
            language,
            directive: directive.into(),
            protocol,
            tracked_files: Vec::new(),
            installed_deps: Vec::new(),
            features: Vec::new(),
            lint_results: Vec::new(),
            test_results: Vec::new(),
            file_hashes: HashMap::new(),
            venv_path: None,
            vcs_initialized: false,
            iteration: 0,
            history: Vec::new(),
            conversation: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a task record. Records are never removed or reordered.
    pub fn record(&mut self, record: TaskRecord) {
        self.updated_at = Utc::now();
        self.history.push(record);
    }

    /// Track a created or modified file (idempotent).
    pub fn track_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.tracked_files.contains(&path) {
            self.tracked_files.push(path);
        }
        self.updated_at = Utc::now();
    }

    /// Stop tracking a deleted file.
    pub fn untrack_file(&mut self, path: &str) {
        self.tracked_files.retain(|f| f != path);
        self.updated_at = Utc::now();
    }

    /// Record a feature tag (idempotent).
    pub fn add_feature(&mut self, feature: impl Into<String>) {
        let feature = feature.into();
        if feature.is_empty() {
            return;
        }
        if !self.features.contains(&feature) {
            self.features.push(feature);
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// The most recent task records, newest last.
    pub fn recent_history(&self, limit: usize) -> &[TaskRecord] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;

    fn state() -> SessionState {
        SessionState::new(
            PathBuf::from("/proj"),
            Language::Python,
            "build a web app",
            Protocol::TaskGraph,
        )
    }

    #[test]
    fn tracking_is_idempotent() {
        let mut s = state();
        s.track_file("src/app.py");
        s.track_file("src/app.py");
        assert_eq!(s.tracked_files.len(), 1);
        s.untrack_file("src/app.py");
        assert!(s.tracked_files.is_empty());
    }

    #[test]
    fn history_appends_in_order() {
        let mut s = state();
        for i in 0..10 {
            s.record(TaskRecord::new(
                ActionKind::CreateFile,
                serde_json::Map::new(),
                true,
                format!("file {i}"),
                Protocol::TaskGraph,
            ));
        }
        assert_eq!(s.history.len(), 10);
        assert_eq!(s.recent_history(3).len(), 3);
        assert_eq!(s.recent_history(3)[0].summary, "file 7");
        assert_eq!(s.recent_history(100).len(), 10);
    }

    #[test]
    fn features_deduplicate_and_skip_empty() {
        let mut s = state();
        s.add_feature("authentication");
        s.add_feature("authentication");
        s.add_feature("");
        assert_eq!(s.features, vec!["authentication"]);
        assert!(s.has_feature("authentication"));
        assert!(!s.has_feature("docker"));
    }

    #[test]
    fn state_serialization_roundtrip() {
        let mut s = state();
        s.track_file("src/app.py");
        s.file_hashes.insert("/proj/src/app.py".into(), "abc123".into());
        s.conversation.push(ConversationTurn::operator_text("hello"));
        let json = serde_json::to_string(&s).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tracked_files, s.tracked_files);
        assert_eq!(back.file_hashes, s.file_hashes);
        assert_eq!(back.conversation, s.conversation);
        assert_eq!(back.protocol, Protocol::TaskGraph);
    }
}
