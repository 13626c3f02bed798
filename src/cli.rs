//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::DEFAULT_CONFIG_FILE;
use clap::Parser;
use std::path::PathBuf;

/// Experiment Server - field-experiment submission intake
///
/// Accepts sensor/survey submissions over HTTP and emails operators an
/// hourly count of submissions per beacon during the configured hours.
///
/// Examples:
///   experiment-server --config-file lab.toml
///   experiment-server --config-file lab.toml --port 9000 --verbose
///   experiment-server --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the configuration file
    #[arg(
        long,
        default_value = DEFAULT_CONFIG_FILE,
        value_name = "FILE",
        env = "EXPERIMENT_SERVER_CONFIG"
    )]
    pub config_file: PathBuf,

    /// Port to listen on (overrides server.port)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Do not send the startup notice email
    ///
    /// Without the notice the mail path is not verified before serving.
    #[arg(long)]
    pub skip_startup_notice: bool,

    /// Write a default configuration file to --config-file and exit
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
