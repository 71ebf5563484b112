//! Incremental-growth strategy.
//!
//! A MISS or VALID_TTL means the served TTL was not too long, so it grows; a
//! STALE means it was, so it falls back to the initial value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::ObservationType;
use crate::error::{CachaiError, Result};
use crate::storage::KeyedScalarStore;
use crate::strategies::{Feedback, Strategy};

/// Default cap for exponential growth.
pub const DEFAULT_MAX_VALUE: f64 = 1e10;

/// Growth function applied on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrowthFunction {
    /// Grow by `factor`.
    #[default]
    Linear,
    /// Grow by `x * factor`.
    Scalar,
    /// Grow by `x ^ factor`.
    Power,
    /// Grow by `min(factor ^ x, max_value)`.
    Exponential,
}

impl GrowthFunction {
    /// All growth functions, in declaration order.
    pub const ALL: [GrowthFunction; 4] = [
        GrowthFunction::Linear,
        GrowthFunction::Scalar,
        GrowthFunction::Power,
        GrowthFunction::Exponential,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Scalar => "scalar",
            Self::Power => "power",
            Self::Exponential => "exponential",
        }
    }

    /// Increment for base `x`.
    pub fn grow(&self, x: f64, factor: f64, max_value: f64) -> f64 {
        match self {
            Self::Linear => factor,
            Self::Scalar => x * factor,
            Self::Power => x.powf(factor),
            Self::Exponential => factor.powf(x).min(max_value),
        }
    }
}

impl fmt::Display for GrowthFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrowthFunction {
    type Err = CachaiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CachaiError::config(format!("unknown increment function_type: '{}'", s)))
    }
}

/// Increment strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncrementParams {
    pub function_type: GrowthFunction,
    /// Track a TTL per key instead of globally.
    pub per_key: bool,
    /// TTL served before any feedback and after a STALE.
    pub initial_value: f64,
    /// Grow from the observed feedback instead of the current TTL when larger.
    pub increment_feedback_ttl: bool,
    pub factor: f64,
    /// Cap for exponential growth.
    pub max_value: f64,
}

impl Default for IncrementParams {
    fn default() -> Self {
        Self {
            function_type: GrowthFunction::default(),
            per_key: true,
            initial_value: 10.0,
            increment_feedback_ttl: false,
            factor: 1.0,
            max_value: DEFAULT_MAX_VALUE,
        }
    }
}

impl IncrementParams {
    /// Reject parameter combinations the strategy cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("initial_value", self.initial_value),
            ("factor", self.factor),
        ] {
            if !value.is_finite() {
                return Err(CachaiError::config(format!("{} must be finite, got {}", name, value)));
            }
        }
        if self.initial_value < 0.0 {
            return Err(CachaiError::config(format!(
                "initial_value must be non-negative, got {}",
                self.initial_value
            )));
        }
        if self.max_value.is_nan() || self.max_value <= 0.0 {
            return Err(CachaiError::config(format!(
                "max_value must be positive, got {}",
                self.max_value
            )));
        }
        Ok(())
    }
}

/// TTL that grows on success and resets on staleness.
#[derive(Debug, Clone)]
pub struct IncrementStrategy {
    params: IncrementParams,
    ttl: KeyedScalarStore,
}

impl IncrementStrategy {
    /// Create the strategy, validating its parameters.
    pub fn new(params: IncrementParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            ttl: KeyedScalarStore::new(params.per_key, params.initial_value),
            params,
        })
    }

    pub fn params(&self) -> &IncrementParams {
        &self.params
    }
}

impl Strategy for IncrementStrategy {
    fn name(&self) -> &'static str {
        "increment"
    }

    fn predict(&self, key: &str, _features: &[f64]) -> Result<f64> {
        self.ttl.get(Some(key))
    }

    fn update(&mut self, feedback: &Feedback<'_>) -> Result<()> {
        let key = Some(feedback.key);
        let ttl = match feedback.observation_type {
            ObservationType::Miss | ObservationType::ValidTtl => {
                let current = self.ttl.get(key)?;
                let base = if self.params.increment_feedback_ttl {
                    (feedback.y_feedback - current).max(current)
                } else {
                    current
                };
                current
                    + self
                        .params
                        .function_type
                        .grow(base, self.params.factor, self.params.max_value)
            }
            ObservationType::Stale => self.params.initial_value,
            _ => return Ok(()),
        };
        self.ttl.set(ttl, key)?;

        tracing::debug!(
            key = feedback.key,
            observation_type = %feedback.observation_type,
            ttl,
            tracked = self.ttl.len(),
            "increment ttl updated"
        );
        Ok(())
    }
}
