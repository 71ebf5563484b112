//! CLI commands for cachai.
//!
//! - **run**: run an experiment and report its metrics
//! - **feedback**: classify one prediction against the truth
//! - **config**: show the effective configuration

pub mod config_cmd;
pub mod feedback;
pub mod run;

pub use config_cmd::{ConfigCommand, ConfigOptions, ConfigOutput};
pub use feedback::{FeedbackCommand, FeedbackOptions, FeedbackOutput};
pub use run::{RunCommand, RunOptions, RunOutput};
