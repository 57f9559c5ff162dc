//! The oracle-facing context digest.
//!
//! A compact view of the session the orchestration loop ships with every
//! oracle request: project metadata, the current assessment, short file
//! summaries, and the most recent task records. Small files are inlined
//! whole; larger ones are cut to their opening lines.

use std::collections::BTreeMap;

use autoforge_core::{SessionState, TaskRecord};
use serde::Serialize;

use crate::assess::{Assessment, assess};

const INLINE_LIMIT_BYTES: usize = 500;
const PREVIEW_LINES: usize = 5;
const RECENT_TASKS: usize = 5;

#[derive(Debug, Serialize)]
pub struct ContextDigest {
    pub metadata: Metadata,
    pub completeness: Assessment,
    /// Tracked file -> inlined content or truncated preview
    pub file_summaries: BTreeMap<String, String>,
    /// Newest last
    pub recent_tasks: Vec<TaskRecord>,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub project_root: String,
    pub language: &'static str,
    pub directive: String,
    pub features: Vec<String>,
    pub dependencies: Vec<String>,
    pub iteration: u64,
}

impl ContextDigest {
    pub fn build(state: &SessionState) -> Self {
        let file_summaries = state
            .tracked_files
            .iter()
            .map(|f| (f.clone(), summarize_file(state, f)))
            .collect();

        Self {
            metadata: Metadata {
                project_root: state.project_root.display().to_string(),
                language: state.language.name(),
                directive: state.directive.clone(),
                features: state.features.clone(),
                dependencies: state.installed_deps.clone(),
                iteration: state.iteration,
            },
            completeness: assess(state),
            file_summaries,
            recent_tasks: state.recent_history(RECENT_TASKS).to_vec(),
        }
    }

    /// The digest as a JSON value, ready to embed in an oracle request.
    pub fn to_value(state: &SessionState) -> serde_json::Value {
        serde_json::to_value(Self::build(state)).unwrap_or(serde_json::Value::Null)
    }
}

fn summarize_file(state: &SessionState, tracked: &str) -> String {
    let path = state.project_root.join(tracked);
    match std::fs::read_to_string(&path) {
        Ok(content) if content.len() < INLINE_LIMIT_BYTES => content,
        Ok(content) => {
            let preview: Vec<&str> = content.lines().take(PREVIEW_LINES).collect();
            format!("{}\n... (truncated)", preview.join("\n"))
        }
        Err(e) => format!("(unreadable: {e})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoforge_core::{Language, Protocol};

    #[test]
    fn small_files_are_inlined() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), "print(1)\n").unwrap();

        let mut s = SessionState::new(
            dir.path().to_path_buf(),
            Language::Python,
            "build",
            Protocol::TaskGraph,
        );
        s.track_file("app.py");

        let digest = ContextDigest::build(&s);
        assert_eq!(digest.file_summaries["app.py"], "print(1)\n");
        assert_eq!(digest.metadata.language, "python");
    }

    #[test]
    fn large_files_are_previewed() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = (0..100).map(|i| format!("line {i}\n")).collect();
        std::fs::write(dir.path().join("big.py"), &body).unwrap();

        let mut s = SessionState::new(
            dir.path().to_path_buf(),
            Language::Python,
            "build",
            Protocol::TaskGraph,
        );
        s.track_file("big.py");

        let summary = &ContextDigest::build(&s).file_summaries["big.py"];
        assert!(summary.starts_with("line 0\nline 1\nline 2\nline 3\nline 4"));
        assert!(summary.ends_with("... (truncated)"));
    }

    #[test]
    fn missing_file_is_noted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = SessionState::new(
            dir.path().to_path_buf(),
            Language::Python,
            "build",
            Protocol::TaskGraph,
        );
        s.track_file("ghost.py");

        let digest = ContextDigest::build(&s);
        assert!(digest.file_summaries["ghost.py"].starts_with("(unreadable:"));
    }

    #[test]
    fn assessment_survives_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = SessionState::new(
            dir.path().to_path_buf(),
            Language::Python,
            "build",
            Protocol::TaskGraph,
        );
        s.track_file("app.py");
        s.track_file("test_app.py");
        s.vcs_initialized = true;
        let before = assess(&s).score;

        let store = crate::store::SessionStore::new(dir.path().join(".autoforge"));
        store.save(&s).unwrap();
        let reloaded = store.load().unwrap().unwrap();
        assert_eq!(assess(&reloaded).score, before);
    }
}
