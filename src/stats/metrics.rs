//! Loss and cache-effectiveness metrics for experiments.

use serde::{Deserialize, Serialize};

use crate::core::ObservationType;
use crate::error::{CachaiError, Result};

/// Prediction error over a set of (y_true, y_pred) pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LossMetrics {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Mean sign of `y_pred - y_true`: +1 always over, -1 always under.
    pub mbe: f64,
}

/// How the served TTLs would have behaved in a cache.
///
/// Only request outcomes are counted; writes are not requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    /// Fresh reads served from cache.
    pub hit: u64,
    /// Entries that expired exactly at the update.
    pub valid_ttl: u64,
    pub stale: u64,
    pub miss: u64,
    /// HIT + VALID_TTL + STALE + MISS.
    pub total: u64,
    /// Requests answered from cache, fresh or not (HIT + STALE).
    pub serve: u64,
    pub serve_rate: f64,
    /// (HIT + VALID_TTL) / serve.
    pub hit_precision: f64,
    /// (HIT + VALID_TTL) / total.
    pub hit_accuracy: f64,
    /// Share of served requests that were stale.
    pub stale_rate: f64,
    pub miss_rate: f64,
}

/// Round to three decimals.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Loss metrics over paired slices.
///
/// Empty input yields zeros; mismatched lengths are an error.
pub fn evaluate_loss(y_true: &[f64], y_pred: &[f64]) -> Result<LossMetrics> {
    if y_true.len() != y_pred.len() {
        return Err(CachaiError::invalid_observation(format!(
            "y_true has {} values but y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Ok(LossMetrics::default());
    }

    let n = y_true.len() as f64;
    let (squared, absolute, sign) = y_true.iter().zip(y_pred).fold(
        (0.0, 0.0, 0.0),
        |(squared, absolute, sign), (t, p)| {
            let diff = p - t;
            let s = if diff > 0.0 {
                1.0
            } else if diff < 0.0 {
                -1.0
            } else {
                0.0
            };
            (squared + diff * diff, absolute + diff.abs(), sign + s)
        },
    );

    Ok(LossMetrics {
        rmse: round3((squared / n).sqrt()),
        mae: round3(absolute / n),
        mbe: round3(sign / n),
    })
}

/// Cache metrics over a stream of observation types.
///
/// Rates with a zero denominator are 0.
pub fn evaluate_cache<'a>(types: impl IntoIterator<Item = &'a ObservationType>) -> CacheMetrics {
    let mut metrics = CacheMetrics::default();
    for ty in types {
        match ty {
            ObservationType::Hit => metrics.hit += 1,
            ObservationType::ValidTtl => metrics.valid_ttl += 1,
            ObservationType::Stale => metrics.stale += 1,
            ObservationType::Miss => metrics.miss += 1,
            ObservationType::Write | ObservationType::ReadWrite => {}
        }
    }

    let fresh = metrics.hit + metrics.valid_ttl;
    metrics.total = fresh + metrics.stale + metrics.miss;
    metrics.serve = metrics.hit + metrics.stale;
    let ratio = |num: u64, den: u64| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    metrics.serve_rate = ratio(metrics.serve, metrics.total);
    metrics.hit_precision = ratio(fresh, metrics.serve);
    metrics.hit_accuracy = ratio(fresh, metrics.total);
    metrics.stale_rate = ratio(metrics.stale, metrics.serve);
    metrics.miss_rate = ratio(metrics.miss, metrics.total);
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(-0.0004), -0.0);
    }

    #[test]
    fn test_loss_perfect_prediction() {
        let loss = evaluate_loss(&[1.0, 2.0], &[1.0, 2.0]).unwrap();
        assert_eq!(loss, LossMetrics::default());
    }

    #[test]
    fn test_loss_values() {
        // diffs: +2, -2, +1
        let loss = evaluate_loss(&[10.0, 10.0, 10.0], &[12.0, 8.0, 11.0]).unwrap();
        assert_eq!(loss.mae, round3(5.0 / 3.0));
        assert_eq!(loss.rmse, round3(3f64.sqrt()));
        assert_eq!(loss.mbe, round3(1.0 / 3.0));
    }

    #[test]
    fn test_loss_mismatched_lengths() {
        assert!(matches!(
            evaluate_loss(&[1.0], &[]).unwrap_err(),
            CachaiError::InvalidObservation { .. }
        ));
    }

    #[test]
    fn test_loss_empty_is_zero() {
        assert_eq!(evaluate_loss(&[], &[]).unwrap(), LossMetrics::default());
    }

    #[test]
    fn test_cache_metrics() {
        let types = [
            ObservationType::Write,
            ObservationType::Hit,
            ObservationType::ValidTtl,
            ObservationType::Stale,
            ObservationType::Miss,
        ];
        let metrics = evaluate_cache(&types);
        assert_eq!(metrics.hit, 1);
        assert_eq!(metrics.valid_ttl, 1);
        assert_eq!(metrics.stale, 1);
        assert_eq!(metrics.miss, 1);
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.serve, 2);
        assert_eq!(metrics.serve_rate, 0.5);
        assert_eq!(metrics.hit_precision, 1.0);
        assert_eq!(metrics.hit_accuracy, 0.5);
        assert_eq!(metrics.stale_rate, 0.5);
        assert_eq!(metrics.miss_rate, 0.25);
    }

    #[test]
    fn test_cache_metrics_ignore_writes() {
        let reads = [
            ObservationType::Hit,
            ObservationType::Hit,
            ObservationType::Stale,
            ObservationType::Miss,
        ];
        let mut with_writes = vec![ObservationType::Write, ObservationType::ReadWrite];
        with_writes.extend(reads);
        with_writes.push(ObservationType::Write);
        assert_eq!(evaluate_cache(&with_writes), evaluate_cache(&reads));

        let metrics = evaluate_cache(&reads);
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.serve, 3);
        assert_eq!(metrics.hit_precision, 2.0 / 3.0);
        assert_eq!(metrics.stale_rate, 1.0 / 3.0);
    }

    #[test]
    fn test_cache_metrics_empty() {
        let metrics = evaluate_cache(&[]);
        assert_eq!(metrics, CacheMetrics::default());
    }

    #[test]
    fn test_cache_metrics_no_serves() {
        let metrics = evaluate_cache(&[
            ObservationType::Write,
            ObservationType::Miss,
            ObservationType::ValidTtl,
        ]);
        assert_eq!(metrics.serve, 0);
        assert_eq!(metrics.hit_precision, 0.0);
        assert_eq!(metrics.stale_rate, 0.0);
        assert_eq!(metrics.miss_rate, 0.5);
        assert_eq!(metrics.hit_accuracy, 0.5);
    }
}
