//! cachai - feedback-driven TTL prediction
//!
//! CLI entry point with global panic handler.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cachai::cli::{
    ConfigCommand, ConfigOptions, FeedbackCommand, FeedbackOptions, RunCommand, RunOptions,
};
use cachai::config::Config;
use cachai::error::{exit_codes, CachaiError};

// =============================================================================
// CLI Definition
// =============================================================================

/// cachai - feedback-driven TTL prediction for cached records
#[derive(Parser)]
#[command(name = "cachai")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an experiment against the simulated workload
    Run {
        /// Config file to use instead of ./cachai.toml
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Classify a predicted TTL against the true time-to-update
    Feedback {
        /// Seconds until the record actually changed
        y_true: f64,
        /// Predicted TTL in seconds
        y_pred: f64,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Config file to use instead of ./cachai.toml
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    setup_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("cachai error: {}", e);
            let code = e
                .downcast_ref::<CachaiError>()
                .map_or(exit_codes::ERROR, CachaiError::exit_code);
            to_exit_code(code)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, prints to stderr and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("cachai panic: {}", info);
        std::process::exit(exit_codes::CRASH);
    }));
}

/// Log to stderr, filtered by `CACHAI_LOG` (default `warn`).
fn setup_logging() {
    let filter = EnvFilter::try_from_env("CACHAI_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            json,
            quiet,
        } => run_experiment(config, json, quiet),
        Commands::Feedback {
            y_true,
            y_pred,
            json,
        } => run_feedback(y_true, y_pred, json),
        Commands::Config { config, json } => run_config(config, json),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}

/// Print command output, skipping empty strings.
fn print_output(text: &str) {
    if !text.is_empty() {
        print!("{}", text);
        if !text.ends_with('\n') {
            println!();
        }
    }
}

fn run_experiment(
    config_path: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load(config_path.as_deref())?;
    let cmd = RunCommand::new(config);
    let options = RunOptions { json, quiet };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_feedback(
    y_true: f64,
    y_pred: f64,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = FeedbackCommand::new();
    let options = FeedbackOptions { json };

    let output = cmd.run(y_true, y_pred, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_config(
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load(config_path.as_deref())?;
    let cmd = ConfigCommand::new(config);
    let options = ConfigOptions { json };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(if output.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::USAGE
    }))
}
