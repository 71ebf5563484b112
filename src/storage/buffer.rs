//! Bounded most-recent-N feedback history per key (or shared).

use std::collections::{HashMap, VecDeque};

use crate::error::Result;
use crate::storage::resolve_slot;

/// Keyed FIFO buffer of feedback values in seconds.
///
/// Each slot holds at most `max_length` values; appending to a full slot drops
/// the oldest value.
#[derive(Debug, Clone)]
pub struct KeyedBuffer {
    per_key: bool,
    max_length: usize,
    slots: HashMap<String, VecDeque<f64>>,
}

impl KeyedBuffer {
    /// Create an empty buffer.
    pub fn new(per_key: bool, max_length: usize) -> Self {
        Self {
            per_key,
            max_length,
            slots: HashMap::new(),
        }
    }

    /// Push a value onto the key's sequence.
    pub fn append(&mut self, value: f64, key: Option<&str>) -> Result<()> {
        let slot = resolve_slot(self.per_key, key)?;
        let max_length = self.max_length;
        let values = self
            .slots
            .entry(slot.to_string())
            .or_insert_with(|| VecDeque::with_capacity(max_length));
        values.push_back(value);
        while values.len() > max_length {
            values.pop_front();
        }
        Ok(())
    }

    /// Copy of the key's sequence, oldest first.
    pub fn get(&self, key: Option<&str>) -> Result<Vec<f64>> {
        let slot = resolve_slot(self.per_key, key)?;
        Ok(self
            .slots
            .get(slot)
            .map(|values| values.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Number of values held for the key.
    pub fn len_of(&self, key: Option<&str>) -> Result<usize> {
        let slot = resolve_slot(self.per_key, key)?;
        Ok(self.slots.get(slot).map_or(0, VecDeque::len))
    }

    /// Configured bound.
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CachaiError;

    #[test]
    fn test_get_unknown_key_is_empty() {
        let buffer = KeyedBuffer::new(true, 3);
        assert!(buffer.get(Some("a")).unwrap().is_empty());
        assert_eq!(buffer.len_of(Some("a")).unwrap(), 0);
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut buffer = KeyedBuffer::new(true, 5);
        for v in [3.0, 1.0, 2.0] {
            buffer.append(v, Some("a")).unwrap();
        }
        assert_eq!(buffer.get(Some("a")).unwrap(), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut buffer = KeyedBuffer::new(true, 3);
        for v in 1..=5 {
            buffer.append(v as f64, Some("a")).unwrap();
        }
        assert_eq!(buffer.get(Some("a")).unwrap(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_per_key_isolation() {
        let mut buffer = KeyedBuffer::new(true, 3);
        buffer.append(1.0, Some("a")).unwrap();
        buffer.append(2.0, Some("b")).unwrap();
        assert_eq!(buffer.get(Some("a")).unwrap(), vec![1.0]);
        assert_eq!(buffer.get(Some("b")).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_global_mode_shares_sequence() {
        let mut buffer = KeyedBuffer::new(false, 3);
        buffer.append(1.0, Some("a")).unwrap();
        buffer.append(2.0, Some("b")).unwrap();
        buffer.append(3.0, None).unwrap();
        assert_eq!(buffer.get(Some("z")).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_per_key_requires_key() {
        let mut buffer = KeyedBuffer::new(true, 3);
        assert!(matches!(
            buffer.append(1.0, None).unwrap_err(),
            CachaiError::Config { .. }
        ));
        assert!(matches!(
            buffer.get(None).unwrap_err(),
            CachaiError::Config { .. }
        ));
    }

    #[test]
    fn test_get_returns_copy() {
        let mut buffer = KeyedBuffer::new(true, 3);
        buffer.append(1.0, Some("a")).unwrap();
        let mut snapshot = buffer.get(Some("a")).unwrap();
        snapshot.push(99.0);
        assert_eq!(buffer.get(Some("a")).unwrap(), vec![1.0]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Length after each append is min(previous + 1, max_length)
            #[test]
            fn prop_length_is_bounded(
                values in prop::collection::vec(0.0f64..1_000.0, 0..50),
                max_length in 1usize..10,
            ) {
                let mut buffer = KeyedBuffer::new(true, max_length);
                let mut previous = 0usize;
                for v in &values {
                    buffer.append(*v, Some("k")).unwrap();
                    let len = buffer.len_of(Some("k")).unwrap();
                    prop_assert_eq!(len, (previous + 1).min(max_length));
                    previous = len;
                }
            }

            // Retained values are exactly the most recent max_length appended
            #[test]
            fn prop_retains_most_recent(
                values in prop::collection::vec(0.0f64..1_000.0, 0..50),
                max_length in 1usize..10,
            ) {
                let mut buffer = KeyedBuffer::new(false, max_length);
                for v in &values {
                    buffer.append(*v, None).unwrap();
                }
                let start = values.len().saturating_sub(max_length);
                prop_assert_eq!(buffer.get(None).unwrap(), values[start..].to_vec());
            }
        }
    }
}
