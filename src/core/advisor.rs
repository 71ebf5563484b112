//! Observation state machine in front of a strategy.
//!
//! The advisor tracks what was written for each key, counts hits, turns the
//! elapsed time of a feedback event into `y_feedback` and forwards it to the
//! strategy. Predictions go straight to the strategy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::core::state::{ObservationInfo, ObservationType, ObservedKeyState};
use crate::error::{CachaiError, FailOpen, Result};
use crate::stats::{ObservationLog, ObservationRecord};
use crate::strategies::{build_strategy, Feedback, Strategy, StrategyConfig};

/// Per-key observation tracking around a TTL strategy.
pub struct Advisor<S: Strategy> {
    strategy: S,
    states: HashMap<String, ObservedKeyState>,
    journal: Option<ObservationLog>,
}

impl Advisor<Box<dyn Strategy>> {
    /// Build the configured strategy and wrap it.
    pub fn from_config(config: &StrategyConfig) -> Result<Self> {
        Ok(Self::new(build_strategy(config)?))
    }
}

impl<S: Strategy> Advisor<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            states: HashMap::new(),
            journal: None,
        }
    }

    /// Record every observation to `journal`.
    pub fn with_journal(mut self, journal: ObservationLog) -> Self {
        self.journal = Some(journal);
        self
    }

    /// TTL to serve for `key`.
    pub fn predict(&self, key: &str) -> Result<f64> {
        self.strategy.predict(key, &[])
    }

    /// TTL to serve for `key`, given a feature vector.
    pub fn predict_with_features(&self, key: &str, features: &[f64]) -> Result<f64> {
        self.strategy.predict(key, features)
    }

    /// Process one observation.
    ///
    /// Writes (and the first observation of an unknown key) replace the key's
    /// state. Hits bump the hit count. Feedback types hand the elapsed time
    /// since the write to the strategy.
    pub fn observe(
        &mut self,
        time: DateTime<Utc>,
        observation_type: ObservationType,
        key: &str,
        info: &ObservationInfo,
    ) -> Result<()> {
        let created = if observation_type.is_write() || !self.states.contains_key(key) {
            let predicted_value = info.require_predicted_value()?;
            self.states
                .insert(key.to_string(), ObservedKeyState::new(time, predicted_value));
            true
        } else {
            false
        };

        let Some(state) = self.states.get_mut(key) else {
            return Err(CachaiError::invalid_observation(format!(
                "no state tracked for key '{}'",
                key
            )));
        };

        match observation_type {
            ObservationType::Hit => {
                if !created {
                    state.hit_count += 1;
                }
            }
            ty if ty.is_feedback() => {
                let y_feedback = state.elapsed_seconds(time);
                if y_feedback < 0.0 {
                    return Err(CachaiError::invalid_observation(format!(
                        "{} for '{}' observed {}s before its write",
                        ty, key, -y_feedback
                    )));
                }
                let feedback = Feedback {
                    time,
                    observation_type: ty,
                    key,
                    state,
                    y_feedback,
                    info,
                };
                self.strategy.update(&feedback)?;
            }
            _ => {}
        }

        tracing::trace!(
            key = %key,
            observation_type = ?observation_type,
            strategy = self.strategy.name(),
            "observation processed"
        );

        if let Some(journal) = &self.journal {
            journal
                .append(&ObservationRecord::new(time, observation_type, key))
                .fail_open_default("writing observation journal");
        }

        Ok(())
    }

    /// Tracked state for `key`, if any.
    pub fn state(&self, key: &str) -> Option<&ObservedKeyState> {
        self.states.get(key)
    }

    /// Number of keys with tracked state.
    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn journal(&self) -> Option<&ObservationLog> {
        self.journal.as_ref()
    }
}
