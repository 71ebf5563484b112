//! End-to-end flows through the public API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use cachai::{
    classify, run_experiment, Advisor, AggregateFunction, AggregateParams, CachaiError, Config,
    GrowthFunction, IncrementParams, ObservationInfo, ObservationLog, ObservationType,
    StrategyConfig,
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_000, 0).unwrap() + Duration::seconds(secs)
}

/// Replay one write/feedback cycle the way a cache integration would.
fn cycle<S: cachai::Strategy>(advisor: &mut Advisor<S>, start: i64, key: &str, y_true: f64) {
    let y_pred = advisor.predict(key).unwrap();
    advisor
        .observe(at(start), ObservationType::Write, key, &ObservationInfo::write(y_pred))
        .unwrap();
    let outcome = classify(y_true, y_pred).unwrap();
    advisor
        .observe(
            at(start + outcome.observation_time as i64),
            outcome.observation_type,
            key,
            &ObservationInfo::empty(),
        )
        .unwrap();
}

#[test]
fn test_mean_strategy_converges_towards_truth() {
    let config = StrategyConfig::Aggregate(AggregateParams {
        function_type: AggregateFunction::ArithmeticMean,
        max_length: 5,
        initial_value: 10.0,
        ..AggregateParams::default()
    });
    let mut advisor = Advisor::from_config(&config).unwrap();

    for i in 0..10 {
        cycle(&mut advisor, i * 1_000, "user:1", 60.0);
    }

    // Each miss reports one tick past the prediction, so the mean climbs
    let ttl = advisor.predict("user:1").unwrap();
    assert!(ttl > 10.0);
    assert!(ttl <= 61.0);
    // Other keys are untouched
    assert_eq!(advisor.predict("user:2").unwrap(), 10.0);
}

#[test]
fn test_increment_strategy_resets_on_stale() {
    let config = StrategyConfig::Increment(IncrementParams {
        function_type: GrowthFunction::Scalar,
        factor: 0.5,
        initial_value: 10.0,
        ..IncrementParams::default()
    });
    let mut advisor = Advisor::from_config(&config).unwrap();

    cycle(&mut advisor, 0, "k", 100.0);
    assert_eq!(advisor.predict("k").unwrap(), 15.0);

    cycle(&mut advisor, 1_000, "k", 5.0);
    assert_eq!(advisor.predict("k").unwrap(), 10.0);
}

#[test]
fn test_hit_bookkeeping_and_journal() {
    let dir = TempDir::new().unwrap();
    let journal_path = dir.path().join("journal").join("observations.jsonl");
    let mut advisor = Advisor::from_config(&StrategyConfig::default())
        .unwrap()
        .with_journal(ObservationLog::new(&journal_path));

    advisor
        .observe(at(0), ObservationType::Write, "k", &ObservationInfo::write(10.0))
        .unwrap();
    for s in 1..4 {
        advisor
            .observe(at(s), ObservationType::Hit, "k", &ObservationInfo::empty())
            .unwrap();
    }
    assert_eq!(advisor.state("k").unwrap().hit_count, 3);

    advisor
        .observe(at(10), ObservationType::ValidTtl, "k", &ObservationInfo::empty())
        .unwrap();
    // Feedback does not reset the hit count; only a write does
    assert_eq!(advisor.state("k").unwrap().hit_count, 3);

    advisor
        .observe(at(20), ObservationType::Write, "k", &ObservationInfo::write(10.0))
        .unwrap();
    assert_eq!(advisor.state("k").unwrap().hit_count, 0);

    let records = ObservationLog::new(&journal_path).read_all().unwrap();
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.key == "k"));
}

#[test]
fn test_contract_violations_surface() {
    let mut advisor = Advisor::from_config(&StrategyConfig::default()).unwrap();

    let err = advisor
        .observe(at(0), ObservationType::ReadWrite, "k", &ObservationInfo::empty())
        .unwrap_err();
    assert!(matches!(err, CachaiError::MissingField { .. }));

    advisor
        .observe(at(5), ObservationType::Write, "k", &ObservationInfo::write(10.0))
        .unwrap();
    let err = advisor
        .observe(at(4), ObservationType::Stale, "k", &ObservationInfo::empty())
        .unwrap_err();
    assert!(matches!(err, CachaiError::InvalidObservation { .. }));
    assert!(err.is_caller_error());
}

#[test]
fn test_oracle_experiment_from_toml() {
    let dir = TempDir::new().unwrap();
    let toml_content = format!(
        r#"
[experiment]
name = "Oracle Control"
output_dir = "{}"

[strategy]
name = "oracle"

[simulator]
records_count = 3
operations_count = 20
seed = 5
"#,
        dir.path().display().to_string().replace('\\', "/")
    );
    let config: Config = toml::from_str(&toml_content).unwrap();

    let summary = run_experiment(&config).unwrap();

    assert_eq!(summary.strategy, "oracle");
    assert_eq!(summary.loss.rmse, 0.0);
    assert_eq!(summary.cache.stale, 0);
    assert_eq!(summary.cache.miss, 0);
    assert!(dir.path().join("oracle_control").join("experiment.jsonl").exists());
}
