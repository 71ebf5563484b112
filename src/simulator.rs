//! Synthetic TTL workload.
//!
//! A fixed population of records is drawn up front, each with its own mean
//! time-to-update and spread. Every request picks a record uniformly and draws
//! its true TTL from a normal distribution around that record's mean.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::config::SimulatorConfig;
use crate::core::{classify, FeedbackOutcome};
use crate::error::{CachaiError, Result};

/// One simulated record.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedRecord {
    pub key: String,
    /// Mean seconds between updates.
    pub mean: u32,
    /// Standard deviation of the time between updates.
    pub variance: u32,
}

/// One simulated request.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub key: String,
    /// Features handed to the strategy; `[y_true]`.
    pub features: Vec<f64>,
    /// Seconds until the record actually changes, rounded to milliseconds.
    pub y_true: f64,
}

pub struct TtlSimulator {
    records: Vec<SimulatedRecord>,
    hit_rate: f64,
    rng: StdRng,
}

impl TtlSimulator {
    /// Draw the record population.
    pub fn new(config: &SimulatorConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let [mean_lo, mean_hi] = config.record_mean_range;
        let [var_lo, var_hi] = config.record_var_range;
        let records = (0..config.records_count)
            .map(|i| {
                let mean = rng.gen_range(mean_lo..mean_hi);
                let variance = rng.gen_range(var_lo..var_hi);
                SimulatedRecord {
                    key: format!("key={}__mean={}__var={}", i, mean, variance),
                    mean,
                    variance,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            records = records.len(),
            seed = ?config.seed,
            "simulator records drawn"
        );

        Ok(Self {
            records,
            hit_rate: config.hit_rate,
            rng,
        })
    }

    pub fn records(&self) -> &[SimulatedRecord] {
        &self.records
    }

    /// Draw the next request.
    pub fn generate(&mut self) -> Result<Sample> {
        let index = self.rng.gen_range(0..self.records.len());
        let record = &self.records[index];

        let normal = Normal::new(f64::from(record.mean), f64::from(record.variance))
            .map_err(|e| CachaiError::numeric(format!("invalid record distribution: {}", e)))?;
        let y_true = (normal.sample(&mut self.rng).abs() * 1000.0).round() / 1000.0;

        Ok(Sample {
            key: record.key.clone(),
            features: vec![y_true],
            y_true,
        })
    }

    /// Classify a prediction against the truth.
    pub fn feedback(&self, y_true: f64, y_pred: f64) -> Result<FeedbackOutcome> {
        classify(y_true, y_pred)
    }

    /// Seconds in `[0, observation_time)` at which a hit arrives.
    pub fn sample_hits(&mut self, observation_time: u64) -> Vec<u64> {
        let hit_rate = self.hit_rate;
        (0..observation_time)
            .filter(|_| self.rng.gen::<f64>() < hit_rate)
            .collect()
    }
}
