//! Feedback command for cachai.
//!
//! Shows which feedback event a cache would see for a served TTL, given the
//! true time-to-update.

use serde::Serialize;

use crate::core::{classify, ObservationType};
use crate::error::exit_codes;

/// Options for the feedback command.
#[derive(Debug, Clone, Default)]
pub struct FeedbackOptions {
    /// Output as JSON.
    pub json: bool,
}

/// Output format for the feedback command.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackOutput {
    pub success: bool,
    pub y_true: f64,
    pub y_pred: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_type: Option<ObservationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub exit_code: i32,
}

/// The feedback command implementation.
#[derive(Debug, Default)]
pub struct FeedbackCommand;

impl FeedbackCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, y_true: f64, y_pred: f64, _options: &FeedbackOptions) -> FeedbackOutput {
        match classify(y_true, y_pred) {
            Ok(outcome) => FeedbackOutput {
                success: true,
                y_true,
                y_pred,
                observation_type: Some(outcome.observation_type),
                observation_time: Some(outcome.observation_time),
                hits: Some(outcome.hits),
                error: None,
                exit_code: exit_codes::SUCCESS,
            },
            Err(e) => FeedbackOutput {
                success: false,
                y_true,
                y_pred,
                observation_type: None,
                observation_time: None,
                hits: None,
                error: Some(e.to_string()),
                exit_code: e.exit_code(),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &FeedbackOutput, options: &FeedbackOptions) -> String {
        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        match (output.observation_type, output.observation_time, output.hits) {
            (Some(ty), Some(time), Some(hits)) if output.success => format!(
                "{} after {}s ({} hits) for y_true={} y_pred={}\n",
                ty, time, hits, output.y_true, output.y_pred
            ),
            _ => format!(
                "Feedback failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_valid_ttl() {
        let output = FeedbackCommand::new().run(10.0, 10.0, &FeedbackOptions::default());
        assert!(output.success);
        assert_eq!(output.observation_type, Some(ObservationType::ValidTtl));
        assert_eq!(output.observation_time, Some(10));
        assert_eq!(output.hits, Some(9));
    }

    #[test]
    fn test_feedback_rejects_negative() {
        let output = FeedbackCommand::new().run(-1.0, 10.0, &FeedbackOptions::default());
        assert!(!output.success);
        assert!(output.error.is_some());
        assert_eq!(output.exit_code, exit_codes::USAGE);
    }

    #[test]
    fn test_format_human() {
        let cmd = FeedbackCommand::new();
        let output = cmd.run(8.0, 10.0, &FeedbackOptions::default());
        assert_eq!(
            cmd.format_output(&output, &FeedbackOptions::default()),
            "stale after 7s (6 hits) for y_true=8 y_pred=10\n"
        );
    }

    #[test]
    fn test_format_json() {
        let cmd = FeedbackCommand::new();
        let output = cmd.run(10.0, 8.0, &FeedbackOptions::default());
        let json = cmd.format_output(&output, &FeedbackOptions { json: true });
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["observation_type"], "miss");
        assert_eq!(parsed["observation_time"], 9);
        assert_eq!(parsed["hits"], 8);
    }

    #[test]
    fn test_format_failure_omits_outcome() {
        let cmd = FeedbackCommand::new();
        let output = cmd.run(f64::NAN, 1.0, &FeedbackOptions::default());
        assert!(cmd
            .format_output(&output, &FeedbackOptions::default())
            .starts_with("Feedback failed"));
    }
}
