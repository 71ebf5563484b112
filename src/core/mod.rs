//! Core types and logic for cachai.
//!
//! This module contains the observation types, the per-key observation state
//! machine and the feedback classifier.

pub mod advisor;
pub mod feedback;
pub mod state;

pub use advisor::Advisor;
pub use feedback::{classify, FeedbackOutcome};
pub use state::{ObservationInfo, ObservationType, ObservedKeyState};
