//! In-memory persistence adapter

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::PersistenceAdapter;
use crate::error::Result;

/// HashMap-backed adapter for tests and ephemeral sessions.
///
/// Values are kept per store in a BTreeMap so `get_all` order is stable
/// across runs.
#[derive(Default)]
pub struct MemoryAdapter {
    stores: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in a store.
    pub fn len(&self, store: &str) -> usize {
        self.stores
            .read()
            .get(store)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, store: &str) -> bool {
        self.len(store) == 0
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn put(&self, store: &str, key: &str, value: Value) -> Result<()> {
        self.stores
            .write()
            .entry(store.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, store: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .stores
            .read()
            .get(store)
            .and_then(|s| s.get(key))
            .cloned())
    }

    fn get_all(&self, store: &str) -> Result<Vec<Value>> {
        Ok(self
            .stores
            .read()
            .get(store)
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default())
    }

    fn delete(&self, store: &str, key: &str) -> Result<bool> {
        Ok(self
            .stores
            .write()
            .get_mut(store)
            .map(|s| s.remove(key).is_some())
            .unwrap_or(false))
    }
}
