//! cachai - feedback-driven TTL prediction for cached records
//!
//! cachai predicts how long a cached value should live from what happened to
//! earlier predictions: whether the value expired before its source changed
//! (miss), was served after it changed (stale), or expired right on time. It
//! also ships a synthetic workload to compare strategies offline.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod experiment;
pub mod simulator;
pub mod stats;
pub mod storage;
pub mod strategies;

pub use config::{Config, SimulatorConfig};
pub use core::{
    classify, Advisor, FeedbackOutcome, ObservationInfo, ObservationType, ObservedKeyState,
};
pub use error::{CachaiError, Result};
pub use experiment::{run_experiment, ExperimentSummary};
pub use simulator::TtlSimulator;
pub use stats::{
    evaluate_cache, evaluate_loss, CacheMetrics, ExperimentLog, ExperimentRecord, LossMetrics,
    ObservationLog, ObservationRecord, JOURNAL_SCHEMA_VERSION,
};
pub use storage::{KeyedBuffer, KeyedScalarStore};
pub use strategies::{
    build_strategy, AggregateFunction, AggregateParams, AggregateStrategy, GrowthFunction,
    IncrementParams, IncrementStrategy, OracleParams, OracleStrategy, Strategy, StrategyConfig,
};

// CLI commands
pub use cli::{ConfigCommand, FeedbackCommand, RunCommand};
