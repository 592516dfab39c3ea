//! In-process key-value store.

use std::cell::RefCell;
use std::collections::HashMap;

use super::KeyValueStore;
use crate::error::StorageError;

/// Volatile [`KeyValueStore`]. Used by tests and by embedders that persist
/// elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerConfig;

    #[test]
    fn load_missing_key_returns_default() {
        let store = MemoryStore::new();
        let cfg: TimerConfig = store.load("nothing").unwrap();
        assert_eq!(cfg, TimerConfig::default());
    }

    #[test]
    fn load_corrupt_value_returns_default() {
        let store = MemoryStore::new();
        store.set_raw("cfg", "{not json").unwrap();
        let cfg: TimerConfig = store.load("cfg").unwrap();
        assert_eq!(cfg, TimerConfig::default());
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let cfg = TimerConfig::new(50, 10, 30, 3).unwrap();
        store.save("cfg", &cfg).unwrap();
        assert_eq!(store.load::<TimerConfig>("cfg").unwrap(), cfg);
        assert_eq!(store.len(), 1);
    }
}
