//! Feature-driven control strategy.
//!
//! Serves the first feature plus a fixed offset. Fed the true TTL as its only
//! feature, it sets the best case an experiment can reach.

use serde::{Deserialize, Serialize};

use crate::error::{CachaiError, Result};
use crate::strategies::{Feedback, Strategy};

/// Oracle strategy parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleParams {
    /// Added to the first feature.
    pub offset: f64,
}

impl OracleParams {
    pub fn validate(&self) -> Result<()> {
        if !self.offset.is_finite() {
            return Err(CachaiError::config(format!(
                "offset must be finite, got {}",
                self.offset
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OracleStrategy {
    params: OracleParams,
}

impl OracleStrategy {
    pub fn new(params: OracleParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl Strategy for OracleStrategy {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn predict(&self, _key: &str, features: &[f64]) -> Result<f64> {
        features
            .first()
            .map(|x| x + self.params.offset)
            .ok_or(CachaiError::missing_field("features"))
    }

    fn update(&mut self, _feedback: &Feedback<'_>) -> Result<()> {
        Ok(())
    }
}
