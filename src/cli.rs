//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Datawright - LLM-driven data analysis with verified code synthesis
///
/// Inspects a data file with model-written scripts, summarizes what it
/// finds, explores it statistically, then takes further requests
/// interactively. Every script is reviewed by a second model call before
/// it runs.
///
/// Examples:
///   datawright
///   datawright sales.csv --model gpt-4o
///   datawright events.json --report session.md
///   datawright --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Data file to analyze
    #[arg(value_name = "FILE", default_value = "file.csv")]
    pub file: PathBuf,

    /// Model used to generate code and summaries
    ///
    /// Can also be set via DATAWRIGHT_MODEL env var or .datawright.toml config.
    #[arg(short, long, env = "DATAWRIGHT_MODEL")]
    pub model: Option<String>,

    /// Model used to review generated code (defaults to --model)
    #[arg(long, value_name = "MODEL")]
    pub verifier_model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, value_name = "URL", env = "OPENAI_BASE_URL")]
    pub api_base: Option<String>,

    /// API key for the inference service
    #[arg(long, env = "OPENAI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Temperature for code generation (0.0 - 1.0)
    ///
    /// Review calls always use 0.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Operation cap for each generated script (0 = unlimited)
    #[arg(long, value_name = "COUNT")]
    pub max_operations: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .datawright.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a session report to this file when the session ends
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Session report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: ReportFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .datawright.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the session report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref api_base) = self.api_base {
            if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
                return Err("API base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
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
