//! TTL prediction strategies.
//!
//! A strategy answers `predict` with the TTL to serve for a key and learns from
//! the feedback events the advisor forwards to `update`. Which strategy runs,
//! and which function it applies, is resolved once from [`StrategyConfig`].

pub mod aggregate;
pub mod increment;
pub mod oracle;

pub use aggregate::{AggregateFunction, AggregateParams, AggregateStrategy};
pub use increment::{GrowthFunction, IncrementParams, IncrementStrategy};
pub use oracle::{OracleParams, OracleStrategy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ObservationInfo, ObservationType, ObservedKeyState};
use crate::error::Result;

/// A feedback event forwarded by the advisor.
#[derive(Debug, Clone, Copy)]
pub struct Feedback<'a> {
    /// When the event was observed.
    pub time: DateTime<Utc>,
    /// MISS, STALE or VALID_TTL.
    pub observation_type: ObservationType,
    /// The key the event belongs to.
    pub key: &'a str,
    /// Tracked state for the key since its last write.
    pub state: &'a ObservedKeyState,
    /// Seconds between the write and the event.
    pub y_feedback: f64,
    /// Payload the caller attached to the event.
    pub info: &'a ObservationInfo,
}

/// Capability shared by every TTL strategy.
pub trait Strategy: Send {
    /// Short strategy name used in logs.
    fn name(&self) -> &'static str;

    /// TTL to serve for `key`.
    ///
    /// `features` is empty unless the caller has a feature vector for the
    /// request.
    fn predict(&self, key: &str, features: &[f64]) -> Result<f64>;

    /// Learn from a MISS, STALE or VALID_TTL event.
    fn update(&mut self, feedback: &Feedback<'_>) -> Result<()>;
}

impl<T: Strategy + ?Sized> Strategy for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn predict(&self, key: &str, features: &[f64]) -> Result<f64> {
        (**self).predict(key, features)
    }

    fn update(&mut self, feedback: &Feedback<'_>) -> Result<()> {
        (**self).update(feedback)
    }
}

/// Strategy selection, discriminated by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Statistic over a window of past feedback.
    Aggregate(AggregateParams),
    /// Grow the previous TTL on success, reset on staleness.
    Increment(IncrementParams),
    /// Serve the first feature plus an offset.
    Oracle(OracleParams),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::Aggregate(AggregateParams::default())
    }
}

impl StrategyConfig {
    /// Strategy name as written in config files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aggregate(_) => "aggregate",
            Self::Increment(_) => "increment",
            Self::Oracle(_) => "oracle",
        }
    }

    /// Check parameters without building the strategy.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Aggregate(params) => params.validate(),
            Self::Increment(params) => params.validate(),
            Self::Oracle(params) => params.validate(),
        }
    }
}

/// Build the configured strategy.
pub fn build_strategy(config: &StrategyConfig) -> Result<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match config {
        StrategyConfig::Aggregate(params) => Box::new(AggregateStrategy::new(params.clone())?),
        StrategyConfig::Increment(params) => Box::new(IncrementStrategy::new(params.clone())?),
        StrategyConfig::Oracle(params) => Box::new(OracleStrategy::new(params.clone())?),
    };
    tracing::debug!(strategy = strategy.name(), "built strategy");
    Ok(strategy)
}
