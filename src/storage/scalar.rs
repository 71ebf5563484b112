//! One scalar per key (or one shared scalar) with a configured default.

use std::collections::HashMap;

use crate::error::Result;
use crate::storage::resolve_slot;

/// Keyed scalar store holding the current TTL prediction.
///
/// Unknown keys read as `initial_value`; nothing is written until `set`.
#[derive(Debug, Clone)]
pub struct KeyedScalarStore {
    per_key: bool,
    initial_value: f64,
    values: HashMap<String, f64>,
}

impl KeyedScalarStore {
    /// Create an empty store.
    pub fn new(per_key: bool, initial_value: f64) -> Self {
        Self {
            per_key,
            initial_value,
            values: HashMap::new(),
        }
    }

    /// Read the value for `key`, falling back to `initial_value`.
    pub fn get(&self, key: Option<&str>) -> Result<f64> {
        let slot = resolve_slot(self.per_key, key)?;
        Ok(self.values.get(slot).copied().unwrap_or(self.initial_value))
    }

    /// Write the value for `key`.
    pub fn set(&mut self, value: f64, key: Option<&str>) -> Result<()> {
        let slot = resolve_slot(self.per_key, key)?;
        self.values.insert(slot.to_string(), value);
        Ok(())
    }

    /// Number of slots that have been written.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no slot has been written.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CachaiError;

    #[test]
    fn test_unseen_key_returns_initial_value() {
        let store = KeyedScalarStore::new(true, 10.0);
        assert_eq!(store.get(Some("a")).unwrap(), 10.0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_per_key_isolation() {
        let mut store = KeyedScalarStore::new(true, 10.0);
        store.set(42.0, Some("a")).unwrap();

        assert_eq!(store.get(Some("a")).unwrap(), 42.0);
        assert_eq!(store.get(Some("b")).unwrap(), 10.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_per_key_requires_key() {
        let mut store = KeyedScalarStore::new(true, 10.0);
        assert!(matches!(
            store.get(None).unwrap_err(),
            CachaiError::Config { .. }
        ));
        assert!(matches!(
            store.set(1.0, None).unwrap_err(),
            CachaiError::Config { .. }
        ));
    }

    #[test]
    fn test_global_mode_shares_one_slot() {
        let mut store = KeyedScalarStore::new(false, 5.0);
        assert_eq!(store.get(None).unwrap(), 5.0);

        store.set(7.0, Some("a")).unwrap();
        assert_eq!(store.get(Some("b")).unwrap(), 7.0);
        assert_eq!(store.get(None).unwrap(), 7.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_overwrite() {
        let mut store = KeyedScalarStore::new(true, 0.0);
        store.set(1.0, Some("a")).unwrap();
        store.set(2.0, Some("a")).unwrap();
        assert_eq!(store.get(Some("a")).unwrap(), 2.0);
    }
}
