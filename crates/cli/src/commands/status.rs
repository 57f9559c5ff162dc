//! `autoforge status` — Show the saved session and its assessment.

use std::path::Path;

use autoforge_config::AppConfig;
use autoforge_session::{SessionStore, assess};

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(path)?;

    println!("Autoforge Status");
    println!("================");
    println!("  Oracle:    {}", config.oracle.base_url);
    println!("  API key:   {}", if config.has_api_key() { "configured" } else { "missing" });
    println!("  Protocol:  {}", config.session.protocol);
    println!("  Language:  {}", config.session.language);

    let store = SessionStore::new(path.join(&config.session.state_dir));
    let Some(state) = store.load()? else {
        println!("\n  No saved session.");
        return Ok(());
    };

    let assessment = assess(&state);
    println!("\n  Session:    {}", state.id);
    println!("  Directive:  {}", state.directive);
    println!("  Iterations: {}", state.iteration);
    println!("  Tasks run:  {}", state.history.len());
    println!("  Files:      {}", state.tracked_files.len());
    println!("  Score:      {}/100", assessment.score);
    for issue in &assessment.issues {
        println!("    issue: {issue}");
    }
    if !assessment.missing_features.is_empty() {
        println!("    missing: {}", assessment.missing_features.join(", "));
    }
    Ok(())
}
