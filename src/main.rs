//! Datawright - LLM-driven data analysis
//!
//! A CLI tool that has a language model write Rhai scripts to inspect and
//! explore a data file, reviews every script with a second model call,
//! and runs the accepted scripts in an embedded interpreter.
//!
//! Exit codes:
//!   0 - Session finished (user typed 'quit' or input ended)
//!   1 - Runtime error (synthesis exhausted, script failure, API error, etc.)

mod agent;
mod analysis;
mod cli;
mod config;
mod console;
mod error;
mod gateway;
mod models;
mod report;
mod sandbox;

use agent::{ModelVerifier, SynthesisSettings};
use analysis::Analyst;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, ReportFormat};
use config::Config;
use console::StdConsole;
use gateway::{OpenAiConfig, OpenAiGateway};
use models::{SessionMetadata, SessionReport};
use sandbox::{ExecutorOptions, ScriptExecutor};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Datawright v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_session(args).await {
        error!("Session failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .datawright.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, API endpoint and sandbox limits.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr; stdout belongs to the session transcript.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one analysis session end to end.
async fn run_session(args: Args) -> Result<()> {
    let start_time = Instant::now();
    let started_at = Utc::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let api_key = args
        .api_key
        .clone()
        .context("No API key: set OPENAI_KEY or pass --api-key")?;

    let gateway = OpenAiGateway::new(OpenAiConfig {
        api_base: config.model.api_base.clone(),
        api_key,
        timeout_seconds: config.model.timeout_seconds,
        show_progress: !args.quiet,
    })?;
    let verifier = ModelVerifier::new(&gateway, config.model.verifier_model());
    let executor = ScriptExecutor::new(&ExecutorOptions {
        max_operations: config.sandbox.max_operations,
    });
    let console = StdConsole;

    info!(
        "Model: {} (verifier: {}) at {}",
        config.model.name,
        config.model.verifier_model(),
        config.model.api_base
    );

    let settings = SynthesisSettings {
        model: config.model.name.clone(),
        temperature: config.model.temperature,
        preview_chars: config.sandbox.preview_chars,
    };
    let analyst = Analyst::new(&gateway, &verifier, &executor, &console, settings);

    let filename = args.file.to_string_lossy().into_owned();
    let session = analyst.analyze(&filename).await?;

    if let Some(ref path) = args.report {
        let report = SessionReport {
            metadata: SessionMetadata {
                filename: session.filename.clone(),
                model_used: config.model.name.clone(),
                verifier_model: config.model.verifier_model().to_string(),
                started_at,
                duration_seconds: start_time.elapsed().as_secs_f64(),
            },
            data_summary: session.data_summary,
            results: session.results,
            stages: session.stages,
        };

        let output = match args.format {
            ReportFormat::Json => report::generate_json_report(&report)?,
            ReportFormat::Markdown => report::generate_markdown_report(&report),
        };

        std::fs::write(path, &output)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("📝 Session report saved to: {}", path.display());
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
