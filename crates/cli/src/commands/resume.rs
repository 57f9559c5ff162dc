//! `autoforge resume` — Pick up a paused session.

use std::path::Path;

use autoforge_actions::validate_environment;
use autoforge_agent::RunEnd;
use autoforge_config::AppConfig;
use autoforge_session::SessionStore;

pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(path)?;
    let project_root = path.canonicalize()?;

    let store = SessionStore::new(project_root.join(&config.session.state_dir));
    let Some(mut state) = store.load()? else {
        return Err(format!(
            "No saved session in {}. Use `autoforge run` to start one.",
            project_root.display()
        )
        .into());
    };

    let missing = validate_environment(state.language);
    if !missing.is_empty() {
        return Err(format!("missing required tools: {}", missing.join(", ")).into());
    }

    println!(
        "Resuming session {} (iteration {}): {}",
        state.id, state.iteration, state.directive
    );

    let mut driver = super::build_driver(&config, path)?;
    super::watch_interrupt(&driver);

    match driver.run(&mut state).await? {
        RunEnd::Completed => println!("Project complete. See PROJECT_SUMMARY.md."),
        RunEnd::Stopped => println!("Session stopped. See PROJECT_SUMMARY.md."),
        RunEnd::Paused => println!("Session paused. Run `autoforge resume` to continue."),
    }
    Ok(())
}
