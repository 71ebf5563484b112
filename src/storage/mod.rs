//! Keyed in-memory storage for strategy state.
//!
//! Both primitives address slots the same way: in per-key mode every key has
//! its own slot and a key is mandatory; in global mode every key maps onto one
//! shared slot.

pub mod buffer;
pub mod scalar;

pub use buffer::KeyedBuffer;
pub use scalar::KeyedScalarStore;

use crate::error::{CachaiError, Result};

/// Slot name used for the shared entry in global mode.
pub const GLOBAL_KEY: &str = "__global__";

/// Resolve the slot a key addresses.
pub(crate) fn resolve_slot(per_key: bool, key: Option<&str>) -> Result<&str> {
    match (per_key, key) {
        (true, Some(key)) => Ok(key),
        (true, None) => Err(CachaiError::config(
            "key is required when per_key mode is enabled",
        )),
        (false, _) => Ok(GLOBAL_KEY),
    }
}
