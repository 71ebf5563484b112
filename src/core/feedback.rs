//! Classify a served TTL against the true time-to-update.
//!
//! Given the true TTL and the predicted one, decide which feedback event the
//! cache would have seen, when it would have seen it, and how many hits were
//! served before that.

use serde::{Deserialize, Serialize};

use crate::core::state::ObservationType;
use crate::error::{CachaiError, Result};

/// Result of classifying one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    /// Feedback event type: MISS, STALE or VALID_TTL.
    pub observation_type: ObservationType,
    /// Whole seconds after the write at which the event is observed.
    pub observation_time: u64,
    /// Hits served between the write and the event.
    pub hits: u64,
}

/// Classify `y_pred` against `y_true` (both in seconds).
///
/// - `y_pred < y_true`: MISS, observed one tick after `floor(y_pred)`.
/// - `y_pred > y_true`: STALE, observed one tick before `floor(y_true)`.
/// - equal: VALID_TTL at `floor(y_true)`.
///
/// `hits = max(0, t - 1)` is taken before `t` is floored at zero.
pub fn classify(y_true: f64, y_pred: f64) -> Result<FeedbackOutcome> {
    for (name, value) in [("y_true", y_true), ("y_pred", y_pred)] {
        if !value.is_finite() || value < 0.0 {
            return Err(CachaiError::invalid_observation(format!(
                "{} must be a non-negative finite number, got {}",
                name, value
            )));
        }
    }

    let mut time = y_true.min(y_pred).floor() as i64;
    let observation_type = if y_pred < y_true {
        time += 1;
        ObservationType::Miss
    } else if y_pred > y_true {
        time -= 1;
        ObservationType::Stale
    } else {
        ObservationType::ValidTtl
    };

    Ok(FeedbackOutcome {
        observation_type,
        observation_time: time.max(0) as u64,
        hits: (time - 1).max(0) as u64,
    })
}
