//! Progress assessment: a pure scoring function over the session state.
//!
//! The assessor never touches the filesystem, so assessing a freshly
//! reloaded session yields exactly the score the previous run saw.

use autoforge_core::SessionState;
use serde::Serialize;
use tracing::debug;

/// Feature tags that count toward the completeness score.
pub const RECOGNIZED_FEATURES: [&str; 5] = [
    "authentication",
    "persistent-storage",
    "error-handling",
    "configuration",
    "interface-docs",
];

/// The result of one assessment pass.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    /// 0..=100
    pub score: u32,
    /// Blocking problems; completeness requires this to be empty
    pub issues: Vec<String>,
    /// Recognized feature tags not yet recorded
    pub missing_features: Vec<String>,
    pub complete: bool,
}

/// Score a session.
///
/// Weights: entry-point file 20, test file 20, a recorded passing test run
/// 20, a clean lint record 10, each recognized feature 5, version control 5.
/// The project is complete when the score reaches 80 with no open issues.
pub fn assess(state: &SessionState) -> Assessment {
    let mut score = 0u32;
    let mut issues = Vec::new();

    let has_entry = state.tracked_files.iter().any(|f| {
        let name = file_name(f);
        name.starts_with("app.") || name.starts_with("main.")
    });
    if has_entry {
        score += 20;
    } else {
        issues.push("no main entry point file".to_string());
    }

    let has_test_file = state
        .tracked_files
        .iter()
        .any(|f| file_name(f).starts_with("test_"));
    if has_test_file {
        score += 20;
        if state.test_results.iter().any(|r| r.contains("Passed")) {
            score += 20;
        } else {
            issues.push("tests present but no passing results".to_string());
        }
    } else {
        issues.push("no test files".to_string());
    }

    if !state.lint_results.is_empty() {
        let clean = state
            .lint_results
            .iter()
            .all(|r| r.contains("Passed") || r.contains("Fixed"));
        if clean {
            score += 10;
        } else {
            issues.push("lint issues outstanding".to_string());
        }
    }

    let missing_features: Vec<String> = RECOGNIZED_FEATURES
        .iter()
        .filter(|f| !state.has_feature(f))
        .map(|f| f.to_string())
        .collect();
    score += 5 * (RECOGNIZED_FEATURES.len() - missing_features.len()) as u32;

    if state.vcs_initialized {
        score += 5;
    } else {
        issues.push("no version control".to_string());
    }

    let complete = score >= 80 && issues.is_empty();
    debug!(score, complete, issue_count = issues.len(), "Assessed session");

    Assessment {
        score,
        issues,
        missing_features,
        complete,
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
