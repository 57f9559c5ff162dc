//! Autoforge CLI — the main entry point.
//!
//! Commands:
//! - `init`    — Write a default config file
//! - `run`     — Start building a project from a directive
//! - `resume`  — Pick up a paused session
//! - `status`  — Show the saved session and its assessment

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod console;

#[derive(Parser)]
#[command(
    name = "autoforge",
    about = "Autoforge — autonomous project-builder agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default autoforge.toml to the project directory
    Init {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },

    /// Build a project from a directive
    Run {
        /// What to build
        directive: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Override the configured language (python or node)
        #[arg(short, long)]
        language: Option<String>,

        /// Override the configured protocol (tool_calling or task_graph)
        #[arg(long)]
        protocol: Option<String>,
    },

    /// Resume a paused session
    Resume {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },

    /// Show the saved session and its assessment
    Status {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { path } => commands::init::run(&path)?,
        Commands::Run {
            directive,
            path,
            language,
            protocol,
        } => commands::run::run(&directive, &path, language, protocol).await?,
        Commands::Resume { path } => commands::resume::run(&path).await?,
        Commands::Status { path } => commands::status::run(&path)?,
    }

    Ok(())
}
