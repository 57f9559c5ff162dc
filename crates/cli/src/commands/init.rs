//! `autoforge init` — Write a default config file.

use std::path::Path;

use autoforge_config::{AppConfig, CONFIG_FILE};

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()).into());
    }

    std::fs::create_dir_all(path)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;

    println!("Wrote {}", config_path.display());
    println!("Set AUTOFORGE_API_KEY (or oracle.api_key) before running.");
    Ok(())
}
