//! Configuration loading and validation for autoforge.
//!
//! Loads configuration from an `autoforge.toml` in the project directory
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "autoforge.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("failed to parse config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// The root configuration structure.
///
/// Maps directly to `autoforge.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Planning oracle endpoint and credentials
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Loop and subprocess limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Session and workspace settings
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL of the planning oracle endpoint
    #[serde(default = "default_oracle_url")]
    pub base_url: String,

    /// API key, usually supplied via `AUTOFORGE_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum tool calls per iteration under the tool-calling protocol
    #[serde(default = "default_tool_call_ceiling")]
    pub tool_call_ceiling: u32,

    /// Maximum recovery recursion depth under the task-graph protocol
    #[serde(default = "default_recovery_depth")]
    pub recovery_depth: u32,

    /// Dependency-install subprocess timeout in seconds
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory (relative to the project root) holding session state
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Project language: "python" or "node"
    #[serde(default = "default_language")]
    pub language: String,

    /// Planning protocol: "tool_calling" or "task_graph"
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_oracle_url() -> String {
    "http://localhost:8080/v1".into()
}
fn default_tool_call_ceiling() -> u32 {
    5
}
fn default_recovery_depth() -> u32 {
    3
}
fn default_install_timeout_secs() -> u64 {
    300
}
fn default_state_dir() -> String {
    ".autoforge".into()
}
fn default_language() -> String {
    "python".into()
}
fn default_protocol() -> String {
    "task_graph".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("oracle", &self.oracle)
            .field("limits", &self.limits)
            .field("session", &self.session)
            .finish()
    }
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            oracle: OracleConfig::default(),
            limits: LimitsConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_oracle_url(),
            api_key: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            tool_call_ceiling: default_tool_call_ceiling(),
            recovery_depth: default_recovery_depth(),
            install_timeout_secs: default_install_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            language: default_language(),
            protocol: default_protocol(),
        }
    }
}

impl AppConfig {
    /// Load configuration for a project directory.
    ///
    /// Reads `autoforge.toml` from the directory if present, then applies
    /// environment variable overrides:
    /// - `AUTOFORGE_ORACLE_URL`
    /// - `AUTOFORGE_API_KEY`
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&project_dir.join(CONFIG_FILE))?;

        if let Ok(url) = std::env::var("AUTOFORGE_ORACLE_URL") {
            config.oracle.base_url = url;
        }
        if config.oracle.api_key.is_none() {
            config.oracle.api_key = std::env::var("AUTOFORGE_API_KEY").ok();
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.tool_call_ceiling == 0 {
            return Err(ConfigError::ValidationError(
                "tool_call_ceiling must be at least 1".into(),
            ));
        }
        if !matches!(self.session.language.as_str(), "python" | "node" | "nodejs") {
            return Err(ConfigError::ValidationError(format!(
                "unknown language '{}'",
                self.session.language
            )));
        }
        if !matches!(self.session.protocol.as_str(), "tool_calling" | "task_graph") {
            return Err(ConfigError::ValidationError(format!(
                "unknown protocol '{}'",
                self.session.protocol
            )));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.oracle.api_key.is_some()
    }

    /// Generate a default config TOML string (for `init` output).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}
