//! Pre-flight checks for the host toolchain.

use std::path::Path;

use autoforge_core::Language;
use tracing::{info, warn};

/// Return the names of required tools missing from `PATH` for the given
/// project language. An empty vector means the environment is usable.
pub fn validate_environment(language: Language) -> Vec<String> {
    let required: &[&str] = match language {
        Language::Python => &["python3", "git"],
        Language::Node => &["node", "npm", "git"],
    };

    let missing: Vec<String> = required
        .iter()
        .filter(|tool| !tool_on_path(tool))
        .map(|tool| tool.to_string())
        .collect();

    if missing.is_empty() {
        info!(language = language.name(), "Environment check passed");
    } else {
        warn!(language = language.name(), ?missing, "Required tools missing");
    }
    missing
}

fn tool_on_path(tool: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| {
        let candidate = dir.join(tool);
        is_executable(&candidate) || is_executable(&candidate.with_extension("exe"))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_tool_is_not_on_path() {
        assert!(!tool_on_path("definitely-not-a-real-binary-xyz"));
    }

    #[test]
    fn shell_is_on_path() {
        // sh is guaranteed on any unix host running these tests
        assert!(tool_on_path("sh"));
    }
}
