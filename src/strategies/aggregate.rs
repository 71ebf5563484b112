//! Aggregation strategy: TTL as a statistic over recent feedback.
//!
//! Every feedback value is appended to a bounded window and the configured
//! function is re-applied to the window. The result, rounded up, is served for
//! the next request on that key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CachaiError, Result};
use crate::storage::{KeyedBuffer, KeyedScalarStore};
use crate::strategies::{Feedback, Strategy};

/// Default EWMA smoothing factor when none is configured.
pub const DEFAULT_EWMA_ALPHA: f64 = 0.5;

/// Lower bound on the mean time-to-update used by `update_risk`.
pub const MIN_UPDATE_RISK_MEAN: f64 = 0.1;

/// Aggregation function applied to the feedback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    /// Always the configured initial value.
    Constant,
    /// Unweighted mean.
    #[default]
    ArithmeticMean,
    /// Exponentially weighted mean, newest sample heaviest.
    Ewma,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
    /// Statistical median.
    Median,
    /// Most frequent value (non-negative integers only).
    Mode,
    /// Inverse exponential CDF at the configured threshold.
    UpdateRisk,
}

impl AggregateFunction {
    /// All functions, in declaration order.
    pub const ALL: [AggregateFunction; 8] = [
        AggregateFunction::Constant,
        AggregateFunction::ArithmeticMean,
        AggregateFunction::Ewma,
        AggregateFunction::Min,
        AggregateFunction::Max,
        AggregateFunction::Median,
        AggregateFunction::Mode,
        AggregateFunction::UpdateRisk,
    ];

    /// Config name of the function.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::ArithmeticMean => "arithmetic_mean",
            Self::Ewma => "ewma",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::UpdateRisk => "update_risk",
        }
    }

    /// Apply the function to a non-empty batch.
    pub fn apply(&self, batch: &[f64], params: &AggregateParams) -> Result<f64> {
        if batch.is_empty() {
            return Err(CachaiError::numeric(format!(
                "{} over an empty feedback window",
                self.as_str()
            )));
        }

        match self {
            Self::Constant => Ok(params.initial_value),
            Self::ArithmeticMean => Ok(arithmetic_mean(batch)),
            Self::Ewma => Ok(ewma(batch, params.ewma_alpha.unwrap_or(DEFAULT_EWMA_ALPHA))),
            Self::Min => Ok(batch.iter().copied().fold(f64::INFINITY, f64::min)),
            Self::Max => Ok(batch.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            Self::Median => Ok(median(batch)),
            Self::Mode => mode(batch),
            Self::UpdateRisk => {
                let threshold = params
                    .update_risk_threshold
                    .ok_or_else(|| CachaiError::config("update_risk requires update_risk_threshold"))?;
                Ok(update_risk(batch, threshold))
            }
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateFunction {
    type Err = CachaiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CachaiError::config(format!("unknown aggregate function_type: '{}'", s)))
    }
}

/// Aggregation strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateParams {
    /// Function applied to the feedback window.
    pub function_type: AggregateFunction,
    /// Track a window and a TTL per key instead of globally.
    pub per_key: bool,
    /// Window length.
    pub max_length: usize,
    /// TTL served before any feedback, and the `constant` result.
    pub initial_value: f64,
    /// EWMA smoothing factor in [0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ewma_alpha: Option<f64>,
    /// Cumulative update probability for `update_risk`, in [0, 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_risk_threshold: Option<f64>,
}

impl Default for AggregateParams {
    fn default() -> Self {
        Self {
            function_type: AggregateFunction::default(),
            per_key: true,
            max_length: 10,
            initial_value: 10.0,
            ewma_alpha: None,
            update_risk_threshold: None,
        }
    }
}

impl AggregateParams {
    /// Reject parameter combinations the strategy cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(CachaiError::config("max_length must be at least 1"));
        }
        if !self.initial_value.is_finite() || self.initial_value < 0.0 {
            return Err(CachaiError::config(format!(
                "initial_value must be finite and non-negative, got {}",
                self.initial_value
            )));
        }
        if let Some(alpha) = self.ewma_alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(CachaiError::config(format!(
                    "ewma_alpha must be in [0, 1], got {}",
                    alpha
                )));
            }
        }
        match (self.function_type, self.update_risk_threshold) {
            (AggregateFunction::UpdateRisk, None) => Err(CachaiError::config(
                "update_risk requires update_risk_threshold",
            )),
            (_, Some(threshold)) if !(0.0..1.0).contains(&threshold) => {
                Err(CachaiError::config(format!(
                    "update_risk_threshold must be in [0, 1), got {}",
                    threshold
                )))
            }
            _ => Ok(()),
        }
    }
}

/// TTL as a statistic over a window of past feedback.
#[derive(Debug, Clone)]
pub struct AggregateStrategy {
    params: AggregateParams,
    buffer: KeyedBuffer,
    ttl: KeyedScalarStore,
}

impl AggregateStrategy {
    /// Create the strategy, validating its parameters.
    pub fn new(params: AggregateParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            buffer: KeyedBuffer::new(params.per_key, params.max_length),
            ttl: KeyedScalarStore::new(params.per_key, params.initial_value),
            params,
        })
    }

    /// Parameters the strategy was built with.
    pub fn params(&self) -> &AggregateParams {
        &self.params
    }

    /// Feedback window for a key.
    pub fn window(&self, key: &str) -> Result<Vec<f64>> {
        self.buffer.get(Some(key))
    }
}

impl Strategy for AggregateStrategy {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn predict(&self, key: &str, _features: &[f64]) -> Result<f64> {
        self.ttl.get(Some(key))
    }

    fn update(&mut self, feedback: &Feedback<'_>) -> Result<()> {
        let key = Some(feedback.key);

        // Aggregate over the window as it will be after the append, and only
        // commit once the function accepts it.
        let mut batch = self.buffer.get(key)?;
        if self.buffer.len_of(key)? >= self.buffer.max_length() {
            batch.remove(0);
        }
        batch.push(feedback.y_feedback);
        let value = self.params.function_type.apply(&batch, &self.params)?;
        let ttl = value.ceil();

        self.buffer.append(feedback.y_feedback, key)?;
        self.ttl.set(ttl, key)?;

        tracing::debug!(
            key = feedback.key,
            function = %self.params.function_type,
            window = batch.len(),
            tracked = self.ttl.len(),
            ttl,
            "aggregate ttl updated"
        );
        Ok(())
    }
}

/// Unweighted mean.
pub fn arithmetic_mean(batch: &[f64]) -> f64 {
    batch.iter().sum::<f64>() / batch.len() as f64
}

/// Weighted mean where the i-th oldest of n samples weighs `(1 - alpha)^(n - 1 - i)`.
pub fn ewma(batch: &[f64], alpha: f64) -> f64 {
    let n = batch.len();
    let (weighted, total) = batch
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(weighted, total), (i, value)| {
            let weight = (1.0 - alpha).powi((n - 1 - i) as i32);
            (weighted + weight * value, total + weight)
        });
    weighted / total
}

/// Median; the mean of the two middle values for an even count.
pub fn median(batch: &[f64]) -> f64 {
    let mut sorted = batch.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most frequent value; ties go to the smallest value.
///
/// Only non-negative integers are accepted.
pub fn mode(batch: &[f64]) -> Result<f64> {
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for &value in batch {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(CachaiError::numeric(format!(
                "mode requires non-negative integer feedback, got {}",
                value
            )));
        }
        *counts.entry(value as u64).or_default() += 1;
    }

    let mut best: Option<(u64, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value as f64)
        .ok_or_else(|| CachaiError::numeric("mode over an empty feedback window"))
}

/// Time by which an update has happened with probability `threshold`.
///
/// Time-to-update is modelled as exponential with mean
/// `max(0.1, mean(batch))`.
pub fn update_risk(batch: &[f64], threshold: f64) -> f64 {
    let mu = arithmetic_mean(batch).max(MIN_UPDATE_RISK_MEAN);
    -(1.0 - threshold).ln() * mu
}

/// Probability that an update has happened within `t` seconds (forward CDF).
pub fn update_risk_probability(mu: f64, t: f64) -> f64 {
    1.0 - (-t / mu).exp()
}
