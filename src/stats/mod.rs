//! Journals and metrics for cachai.
//!
//! Observations and experiment iterations are written to append-only JSONL
//! journals. Metrics summarise an experiment's prediction loss and how the
//! served TTLs would have behaved in a cache.

pub mod journal;
pub mod metrics;

pub use journal::{
    ExperimentLog, ExperimentRecord, JsonlLog, ObservationLog, ObservationRecord,
    JOURNAL_SCHEMA_VERSION,
};
pub use metrics::{evaluate_cache, evaluate_loss, round3, CacheMetrics, LossMetrics};
