//! Append-only JSONL journals.
//!
//! The advisor writes one [`ObservationRecord`] per observation; the experiment
//! runner writes one [`ExperimentRecord`] per iteration. Both go through the
//! same [`JsonlLog`] writer.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::ObservationType;
use crate::error::{CachaiError, Result};

/// Schema version for journal records.
///
/// Increment when a record schema changes in a breaking way.
pub const JOURNAL_SCHEMA_VERSION: u8 = 1;

/// One observation seen by the advisor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservationRecord {
    /// Schema version for forward compatibility.
    pub v: u8,
    pub observation_time: DateTime<Utc>,
    pub observation_type: ObservationType,
    pub key: String,
}

impl ObservationRecord {
    pub fn new(
        observation_time: DateTime<Utc>,
        observation_type: ObservationType,
        key: impl Into<String>,
    ) -> Self {
        Self {
            v: JOURNAL_SCHEMA_VERSION,
            observation_time,
            observation_type,
            key: key.into(),
        }
    }
}

/// One simulated request/feedback cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    /// Schema version for forward compatibility.
    pub v: u8,
    pub experiment_name: String,
    pub iteration: u64,
    /// Seconds after the write at which feedback was observed.
    pub observation_time: u64,
    pub observation_type: ObservationType,
    pub key: String,
    /// Hits served before the feedback.
    pub hits: u64,
    pub y_true: f64,
    pub y_pred: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mbe: f64,
}

/// JSONL writer for one record type.
#[derive(Debug, Clone)]
pub struct JsonlLog<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

/// Journal of advisor observations.
pub type ObservationLog = JsonlLog<ObservationRecord>;

/// Journal of experiment iterations.
pub type ExperimentLog = JsonlLog<ExperimentRecord>;

impl<R: Serialize + DeserializeOwned> JsonlLog<R> {
    /// Create a log writing to `path`. Nothing is touched until the first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _record: PhantomData,
        }
    }

    /// Append one record as a JSON line.
    pub fn append(&self, record: &R) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CachaiError::storage(parent, e))?;
            }
        }

        let json = serde_json::to_string(record)
            .map_err(|e| CachaiError::serde(format!("Failed to serialize journal record: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CachaiError::storage(&self.path, e))?;

        writeln!(file, "{}", json).map_err(|e| CachaiError::storage(&self.path, e))?;
        Ok(())
    }

    /// Read every record back. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<R>> {
        let Some(content) = self.read_content()? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|e| {
                CachaiError::serde(format!(
                    "Failed to parse journal record on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Number of non-empty lines in the log.
    pub fn count(&self) -> Result<usize> {
        Ok(self
            .read_content()?
            .map_or(0, |content| content.lines().filter(|l| !l.trim().is_empty()).count()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_content(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| CachaiError::storage(&self.path, e))
    }
}
