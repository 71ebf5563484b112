//! Config command for cachai.
//!
//! Prints the effective configuration after every layer has been applied, and
//! whether it would pass validation.

use serde::Serialize;

use crate::config::Config;

/// Options for the config command.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Output as JSON.
    pub json: bool,
}

/// Output format for the config command.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigOutput {
    /// Whether the configuration is valid.
    pub valid: bool,
    pub config: Config,
    /// Validation error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The config command implementation.
pub struct ConfigCommand {
    config: Config,
}

impl ConfigCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self, _options: &ConfigOptions) -> ConfigOutput {
        let error = self.config.validate().err().map(|e| e.to_string());
        ConfigOutput {
            valid: error.is_none(),
            config: self.config.clone(),
            error,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ConfigOutput, options: &ConfigOptions) -> String {
        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let mut text = toml::to_string_pretty(&output.config)
            .unwrap_or_else(|e| format!("# failed to render config: {}\n", e));
        if let Some(error) = &output.error {
            text.push_str(&format!("\n# invalid: {}\n", error));
        }
        text
    }
}
