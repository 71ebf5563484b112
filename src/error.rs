//! Unified error types for cachai.
//!
//! Predictor errors are never swallowed: a bad configuration or a malformed
//! observation surfaces to the caller immediately. The only fail-open path is
//! side-channel I/O such as the observation journal, which must not be able to
//! break a prediction.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cachai operations.
#[derive(Error, Debug)]
pub enum CachaiError {
    /// Unknown strategy/function names, invalid parameters, missing keys in
    /// per-key mode.
    #[error("config error: {message}")]
    Config { message: String },

    /// A required observation or request field was not supplied.
    #[error("missing field: {field}")]
    MissingField { field: &'static str },

    /// Observation that cannot be processed, e.g. feedback older than the write.
    #[error("invalid observation: {message}")]
    InvalidObservation { message: String },

    /// Aggregation input outside the function's domain.
    #[error("numeric error: {message}")]
    Numeric { message: String },

    /// I/O errors from journal or config files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },
}

/// A specialized Result type for cachai operations.
pub type Result<T> = std::result::Result<T, CachaiError>;

impl CachaiError {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Create an invalid observation error.
    pub fn invalid_observation(message: impl Into<String>) -> Self {
        Self::InvalidObservation {
            message: message.into(),
        }
    }

    /// Create a numeric domain error.
    pub fn numeric(message: impl Into<String>) -> Self {
        Self::Numeric {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Whether the error was caused by caller input rather than I/O.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::MissingField { .. }
                | Self::InvalidObservation { .. }
                | Self::Numeric { .. }
        )
    }

    /// CLI exit code for the error.
    pub fn exit_code(&self) -> i32 {
        if self.is_caller_error() {
            exit_codes::USAGE
        } else {
            exit_codes::ERROR
        }
    }
}

impl From<io::Error> for CachaiError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CachaiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Warn-and-continue handling for side-channel results.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }
}

/// Exit codes for the cachai CLI.
pub mod exit_codes {
    /// Command completed.
    pub const SUCCESS: i32 = 0;

    /// Command failed (I/O, serialization).
    pub const ERROR: i32 = 1;

    /// Command rejected its input (bad config, bad observation).
    pub const USAGE: i32 = 2;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
