mod commands;

use clap::{Parser, Subcommand};
use skillbridge_core::config::LoggingConfig;
use skillbridge_core::{Config, Paths};
use skillbridge_engine::Bridge;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "skillbridge")]
#[command(about = "Run one script request from stdin, print one JSON response")]
#[command(long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $SKILLBRIDGE_HOME/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the inline `code` of the request
    Code,

    /// Call the `run` function of a skill file with the request's `params`
    Skill {
        /// Skill file, relative to `skills.root` when configured
        skill_file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config problems must not cost the caller its response document.
    let (config, config_error) = match load_config(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_tracing(cli.verbose, &config.logging);
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    let bridge = Bridge::new(config.engine.clone());
    let outcome = match cli.command {
        Commands::Code => commands::code::run(&bridge),
        Commands::Skill { skill_file } => {
            commands::skill::run(&bridge, &config, skill_file.as_deref())
        }
    };

    commands::emit(&outcome)
}

fn load_config(path: Option<&Path>) -> skillbridge_core::Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(&Paths::new()),
    }
}

/// Logs go to stderr; stdout carries nothing but the response.
fn init_tracing(verbose: bool, logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(&logging.level)
        }
    });

    let (text, json) = if logging.json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}
