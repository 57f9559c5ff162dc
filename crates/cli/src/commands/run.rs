//! `autoforge run` — Build a project from a directive.

use std::path::Path;

use autoforge_actions::validate_environment;
use autoforge_agent::RunEnd;
use autoforge_config::AppConfig;
use autoforge_core::{Language, Protocol, SessionState};
use autoforge_session::SessionStore;

pub async fn run(
    directive: &str,
    path: &Path,
    language: Option<String>,
    protocol: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(path)?;

    std::fs::create_dir_all(path)?;
    let project_root = path.canonicalize()?;

    let store = SessionStore::new(project_root.join(&config.session.state_dir));
    if store.load()?.is_some() {
        return Err(format!(
            "A saved session exists in {}. Use `autoforge resume` to continue it.",
            project_root.display()
        )
        .into());
    }

    let language_name = language.unwrap_or_else(|| config.session.language.clone());
    let language = Language::from_name(&language_name)
        .ok_or_else(|| format!("unknown language '{language_name}'"))?;

    let protocol = match protocol.as_deref().unwrap_or(&config.session.protocol) {
        "tool_calling" => Protocol::ToolCalling,
        "task_graph" => Protocol::TaskGraph,
        other => return Err(format!("unknown protocol '{other}'").into()),
    };

    let missing = validate_environment(language);
    if !missing.is_empty() {
        return Err(format!("missing required tools: {}", missing.join(", ")).into());
    }

    let mut state = SessionState::new(project_root, language, directive, protocol);

    let mut driver = super::build_driver(&config, path)?;
    super::watch_interrupt(&driver);

    match driver.run(&mut state).await? {
        RunEnd::Completed => println!("Project complete. See PROJECT_SUMMARY.md."),
        RunEnd::Stopped => println!("Session stopped. See PROJECT_SUMMARY.md."),
        RunEnd::Paused => println!("Session paused. Run `autoforge resume` to continue."),
    }
    Ok(())
}
