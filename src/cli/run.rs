//! Run command for cachai.
//!
//! Runs one experiment with the effective configuration and reports its loss
//! and cache metrics.

use serde::Serialize;

use crate::config::Config;
use crate::error::{exit_codes, CachaiError};
use crate::experiment::{run_experiment, ExperimentSummary};

/// Options for the run command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the run command.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Whether the experiment completed.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ExperimentSummary>,
    /// Error message if the experiment failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this outcome.
    #[serde(skip)]
    pub exit_code: i32,
}

impl RunOutput {
    pub fn success(summary: ExperimentSummary) -> Self {
        Self {
            success: true,
            summary: Some(summary),
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    pub fn failure(error: &CachaiError) -> Self {
        Self {
            success: false,
            summary: None,
            error: Some(error.to_string()),
            exit_code: error.exit_code(),
        }
    }
}

/// The run command implementation.
pub struct RunCommand {
    config: Config,
}

impl RunCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the experiment.
    pub fn run(&self, _options: &RunOptions) -> RunOutput {
        match run_experiment(&self.config) {
            Ok(summary) => RunOutput::success(summary),
            Err(e) => {
                tracing::error!(error = %e, "experiment failed");
                RunOutput::failure(&e)
            }
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &RunOutput, options: &RunOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &RunOutput) -> String {
        let Some(summary) = output.summary.as_ref().filter(|_| output.success) else {
            return format!(
                "Experiment failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let loss = &summary.loss;
        let cache = &summary.cache;
        let mut text = format!(
            "Experiment '{}' ({} strategy, {} iterations)\n",
            summary.experiment_name, summary.strategy, summary.iterations
        );
        text.push_str(&format!("Output: {}\n\n", summary.output_dir.display()));
        text.push_str("Loss\n");
        text.push_str(&format!(
            "  rmse {:.3}  mae {:.3}  mbe {:+.3}\n\n",
            loss.rmse, loss.mae, loss.mbe
        ));
        text.push_str("Cache\n");
        text.push_str(&format!(
            "  hit {}  valid ttl {}  stale {}  miss {}  total {}\n",
            cache.hit, cache.valid_ttl, cache.stale, cache.miss, cache.total
        ));
        text.push_str(&format!(
            "  serve rate {:.1}%  hit precision {:.1}%  stale rate {:.1}%  miss rate {:.1}%\n",
            cache.serve_rate * 100.0,
            cache.hit_precision * 100.0,
            cache.stale_rate * 100.0,
            cache.miss_rate * 100.0
        ));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.experiment.name = "cli run".to_string();
        config.experiment.output_dir = dir.path().to_path_buf();
        config.simulator.records_count = 3;
        config.simulator.operations_count = 10;
        config.simulator.seed = Some(2);
        config
    }

    #[test]
    fn test_run_success() {
        let dir = TempDir::new().unwrap();
        let cmd = RunCommand::new(config(&dir));
        let output = cmd.run(&RunOptions::default());

        assert!(output.success);
        assert_eq!(output.exit_code, exit_codes::SUCCESS);
        let summary = output.summary.as_ref().unwrap();
        assert_eq!(summary.iterations, 10);
        assert!(dir.path().join("cli_run").exists());
    }

    #[test]
    fn test_run_failure() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.simulator.hit_rate = 3.0;
        let output = RunCommand::new(config).run(&RunOptions::default());

        assert!(!output.success);
        assert!(output.summary.is_none());
        assert_eq!(output.exit_code, exit_codes::USAGE);
        assert!(output.error.unwrap().contains("hit_rate"));
    }

    #[test]
    fn test_format_output_modes() {
        let dir = TempDir::new().unwrap();
        let cmd = RunCommand::new(config(&dir));
        let output = cmd.run(&RunOptions::default());

        let quiet = RunOptions {
            quiet: true,
            ..RunOptions::default()
        };
        assert!(cmd.format_output(&output, &quiet).is_empty());

        let json = RunOptions {
            json: true,
            ..RunOptions::default()
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&output, &json)).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["summary"]["iterations"], 10);

        let human = cmd.format_output(&output, &RunOptions::default());
        assert!(human.contains("Experiment 'cli run'"));
        assert!(human.contains("serve rate"));
        assert!(human.contains("valid ttl"));
    }

    #[test]
    fn test_format_failure() {
        let cmd = RunCommand::new(Config::default());
        let failure = RunOutput::failure(&CachaiError::serde("boom"));
        assert_eq!(failure.exit_code, exit_codes::ERROR);
        let text = cmd.format_output(&failure, &RunOptions::default());
        assert_eq!(text, "Experiment failed: serialization error: boom\n");
    }
}
