//! Run one strategy against the simulated workload.
//!
//! Every iteration writes a prediction, replays the hits and the feedback the
//! cache would have seen, and journals the outcome. The run is summarised by
//! its loss and cache metrics.

use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{Advisor, ObservationInfo, ObservationType};
use crate::error::{FailOpen, Result};
use crate::simulator::TtlSimulator;
use crate::stats::{
    evaluate_cache, evaluate_loss, CacheMetrics, ExperimentLog, ExperimentRecord, LossMetrics,
    ObservationLog, JOURNAL_SCHEMA_VERSION,
};

/// Observation journal file name.
pub const OBSERVATIONS_FILE: &str = "observations.jsonl";
/// Experiment journal file name.
pub const EXPERIMENT_FILE: &str = "experiment.jsonl";
/// Snapshot of the effective config.
pub const CONFIG_FILE: &str = "config.toml";

/// Result of one experiment run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentSummary {
    pub experiment_name: String,
    pub strategy: String,
    pub iterations: u64,
    /// Where the journals were written.
    pub output_dir: PathBuf,
    pub loss: LossMetrics,
    pub cache: CacheMetrics,
}

/// Run the configured experiment to completion.
pub fn run_experiment(config: &Config) -> Result<ExperimentSummary> {
    config.validate()?;

    let output_dir = config.experiment_dir();
    config.save(&output_dir.join(CONFIG_FILE))?;

    let experiment_log = ExperimentLog::new(output_dir.join(EXPERIMENT_FILE));
    let mut advisor = Advisor::from_config(&config.strategy)?
        .with_journal(ObservationLog::new(output_dir.join(OBSERVATIONS_FILE)));
    let mut simulator = TtlSimulator::new(&config.simulator)?;

    let origin = DateTime::<Utc>::from(UNIX_EPOCH);
    let name = config.experiment.name.as_str();
    let mut y_trues = Vec::new();
    let mut y_preds = Vec::new();
    let mut types = Vec::new();

    tracing::info!(
        experiment = name,
        strategy = config.strategy.name(),
        operations = config.simulator.operations_count,
        "experiment started"
    );

    for iteration in 0..config.simulator.operations_count {
        let sample = simulator.generate()?;
        let y_pred = advisor.predict_with_features(&sample.key, &sample.features)?;

        advisor.observe(
            origin,
            ObservationType::Write,
            &sample.key,
            &ObservationInfo::write(y_pred).with_y_true(sample.y_true),
        )?;
        types.push(ObservationType::Write);

        let outcome = simulator.feedback(sample.y_true, y_pred)?;
        for second in simulator.sample_hits(outcome.observation_time) {
            advisor.observe(
                origin + Duration::seconds(second as i64),
                ObservationType::Hit,
                &sample.key,
                &ObservationInfo::empty(),
            )?;
            types.push(ObservationType::Hit);
        }

        advisor.observe(
            origin + Duration::seconds(outcome.observation_time as i64),
            outcome.observation_type,
            &sample.key,
            &ObservationInfo::empty().with_y_true(sample.y_true),
        )?;
        types.push(outcome.observation_type);

        let loss = evaluate_loss(&[sample.y_true], &[y_pred])?;
        experiment_log
            .append(&ExperimentRecord {
                v: JOURNAL_SCHEMA_VERSION,
                experiment_name: name.to_string(),
                iteration,
                observation_time: outcome.observation_time,
                observation_type: outcome.observation_type,
                key: sample.key,
                hits: outcome.hits,
                y_true: sample.y_true,
                y_pred,
                rmse: loss.rmse,
                mae: loss.mae,
                mbe: loss.mbe,
            })
            .fail_open_default("writing experiment journal");

        y_trues.push(sample.y_true);
        y_preds.push(y_pred);
    }

    let summary = ExperimentSummary {
        experiment_name: name.to_string(),
        strategy: config.strategy.name().to_string(),
        iterations: config.simulator.operations_count,
        output_dir,
        loss: evaluate_loss(&y_trues, &y_preds)?,
        cache: evaluate_cache(&types),
    };

    tracing::info!(
        experiment = name,
        rmse = summary.loss.rmse,
        serve_rate = summary.cache.serve_rate,
        "experiment finished"
    );

    Ok(summary)
}
