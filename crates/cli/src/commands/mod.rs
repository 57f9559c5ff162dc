pub mod init;
pub mod resume;
pub mod run;
pub mod status;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use autoforge_actions::Dispatcher;
use autoforge_agent::{Driver, Limits};
use autoforge_config::AppConfig;
use autoforge_oracle::HttpOracle;
use autoforge_session::SessionStore;

use crate::console::StdinConsole;

/// Assemble a driver from configuration. Shared by `run` and `resume`.
pub fn build_driver(
    config: &AppConfig,
    project_dir: &Path,
) -> Result<Driver, Box<dyn std::error::Error>> {
    let api_key = config.oracle.api_key.clone().ok_or(
        "No API key configured. Set AUTOFORGE_API_KEY or add it to autoforge.toml.",
    )?;
    let oracle = HttpOracle::new("http", config.oracle.base_url.as_str(), api_key)?;

    let dispatcher = Dispatcher::new()
        .with_install_timeout(Duration::from_secs(config.limits.install_timeout_secs));
    let store = SessionStore::new(project_dir.join(&config.session.state_dir));
    let limits = Limits {
        tool_call_ceiling: config.limits.tool_call_ceiling,
        recovery_depth: config.limits.recovery_depth,
    };

    Ok(Driver::new(
        Arc::new(oracle),
        Box::new(StdinConsole),
        dispatcher,
        store,
        limits,
    ))
}

/// Save-and-pause on Ctrl+C: the flag is checked at iteration boundaries.
pub fn watch_interrupt(driver: &Driver) {
    let cancel = driver.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, pausing after the current iteration");
            cancel.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });
}
