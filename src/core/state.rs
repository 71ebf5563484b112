//! Observation and per-key state types.
//!
//! These types describe what the caller reports back to the advisor and what
//! the advisor remembers about each key between a write and its feedback.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CachaiError, Result};

/// Outcome reported for a cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    /// A fresh value was written with a new TTL prediction.
    Write,
    /// A read that fell through to the origin and re-populated the cache.
    ReadWrite,
    /// A read served from cache while the value was still valid.
    Hit,
    /// The TTL expired before the underlying data changed.
    Miss,
    /// The underlying data changed while the cached value was still served.
    Stale,
    /// The TTL expired exactly when the data changed.
    ValidTtl,
}

impl ObservationType {
    /// All observation types, in declaration order.
    pub const ALL: [ObservationType; 6] = [
        ObservationType::Write,
        ObservationType::ReadWrite,
        ObservationType::Hit,
        ObservationType::Miss,
        ObservationType::Stale,
        ObservationType::ValidTtl,
    ];

    /// Whether this observation (re)creates the key state.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// Whether this observation triggers the strategy's recompute step.
    pub fn is_feedback(&self) -> bool {
        matches!(self, Self::Miss | Self::Stale | Self::ValidTtl)
    }

    /// Get the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::ReadWrite => "read_write",
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Stale => "stale",
            Self::ValidTtl => "valid_ttl",
        }
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationType {
    type Err = CachaiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| CachaiError::config(format!("unknown observation type: '{}'", s)))
    }
}

/// Payload attached to an observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationInfo {
    /// TTL that was served with the write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_value: Option<f64>,
    /// Ground-truth TTL, when known (simulation only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_true: Option<f64>,
    /// Feature vector the prediction was made from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<f64>,
}

impl ObservationInfo {
    /// Payload for a WRITE/READ_WRITE observation.
    pub fn write(predicted_value: f64) -> Self {
        Self {
            predicted_value: Some(predicted_value),
            ..Self::default()
        }
    }

    /// Payload with no fields, for HIT and feedback observations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attach the ground truth.
    pub fn with_y_true(mut self, y_true: f64) -> Self {
        self.y_true = Some(y_true);
        self
    }

    /// Attach a feature vector.
    pub fn with_features(mut self, features: Vec<f64>) -> Self {
        self.features = features;
        self
    }

    /// The predicted value, or a missing-field error.
    pub fn require_predicted_value(&self) -> Result<f64> {
        self.predicted_value
            .ok_or(CachaiError::missing_field("predicted_value"))
    }
}

/// What the advisor tracks for a key since its last write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedKeyState {
    /// When the value was written.
    pub stored_time: DateTime<Utc>,
    /// The TTL served with the write.
    pub predicted_value: f64,
    /// Cache hits since the write.
    pub hit_count: u64,
}

impl ObservedKeyState {
    /// Fresh state with no hits.
    pub fn new(stored_time: DateTime<Utc>, predicted_value: f64) -> Self {
        Self {
            stored_time,
            predicted_value,
            hit_count: 0,
        }
    }

    /// Seconds elapsed between the write and `time`, at millisecond resolution.
    pub fn elapsed_seconds(&self, time: DateTime<Utc>) -> f64 {
        (time - self.stored_time).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn origin() -> DateTime<Utc> {
        Utc.timestamp_opt(0, 0).unwrap()
    }

    #[test]
    fn test_observation_type_classes() {
        for ty in ObservationType::ALL {
            let write = matches!(ty, ObservationType::Write | ObservationType::ReadWrite);
            let feedback = matches!(
                ty,
                ObservationType::Miss | ObservationType::Stale | ObservationType::ValidTtl
            );
            assert_eq!(ty.is_write(), write, "{ty}");
            assert_eq!(ty.is_feedback(), feedback, "{ty}");
            assert!(!(ty.is_write() && ty.is_feedback()));
        }
        assert!(!ObservationType::Hit.is_write());
        assert!(!ObservationType::Hit.is_feedback());
    }

    #[test]
    fn test_observation_type_from_str() {
        for ty in ObservationType::ALL {
            assert_eq!(ty.as_str().parse::<ObservationType>().unwrap(), ty);
        }
        let err = "expired".parse::<ObservationType>().unwrap_err();
        assert!(matches!(err, CachaiError::Config { .. }));
    }

    #[test]
    fn test_observation_type_serialization() {
        let json = serde_json::to_string(&ObservationType::ValidTtl).unwrap();
        assert_eq!(json, r#""valid_ttl""#);
        let json = serde_json::to_string(&ObservationType::ReadWrite).unwrap();
        assert_eq!(json, r#""read_write""#);
    }

    #[test]
    fn test_info_write_has_predicted_value() {
        let info = ObservationInfo::write(12.0);
        assert_eq!(info.require_predicted_value().unwrap(), 12.0);
    }

    #[test]
    fn test_info_empty_missing_predicted_value() {
        let err = ObservationInfo::empty()
            .require_predicted_value()
            .unwrap_err();
        assert!(matches!(
            err,
            CachaiError::MissingField {
                field: "predicted_value"
            }
        ));
    }

    #[test]
    fn test_info_builders() {
        let info = ObservationInfo::write(1.0)
            .with_y_true(2.0)
            .with_features(vec![2.0, 3.0]);
        assert_eq!(info.y_true, Some(2.0));
        assert_eq!(info.features, vec![2.0, 3.0]);
    }

    #[test]
    fn test_info_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&ObservationInfo::empty()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_key_state_new_has_no_hits() {
        let state = ObservedKeyState::new(origin(), 10.0);
        assert_eq!(state.hit_count, 0);
        assert_eq!(state.predicted_value, 10.0);
    }

    #[test]
    fn test_elapsed_seconds() {
        let state = ObservedKeyState::new(origin(), 10.0);
        let later = origin() + Duration::milliseconds(12_500);
        assert_eq!(state.elapsed_seconds(later), 12.5);

        let earlier = origin() - Duration::seconds(2);
        assert_eq!(state.elapsed_seconds(earlier), -2.0);
    }
}
