//! JSONL file persistence adapter
//!
//! One `<store>.jsonl` file per store under a data directory, one key/value
//! record per line. The full store file is rewritten atomically on every
//! mutation; all reads are served from the in-memory copy loaded at open.
//! Suited to the sizes chunk/checkpoint stores actually reach in a campaign,
//! not to unbounded logs.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::PersistenceAdapter;
use crate::error::Result;
use crate::utils::{atomic_write, cleanup_temp_files};

#[derive(Serialize, Deserialize)]
struct Record {
    key: String,
    value: Value,
}

/// File-backed adapter persisting each store as a JSONL file.
pub struct JsonlAdapter {
    data_dir: PathBuf,
    stores: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl JsonlAdapter {
    /// Open a data directory, creating it if needed and loading every
    /// existing `*.jsonl` store. Corrupt lines are skipped with a warning
    /// rather than failing the whole store.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let cleaned = cleanup_temp_files(&data_dir)?;
        if cleaned > 0 {
            warn!(cleaned, "removed leftover temp files from interrupted writes");
        }

        let mut stores: HashMap<String, BTreeMap<String, Value>> = HashMap::new();
        for entry in fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "jsonl").unwrap_or(false) {
                let Some(store) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                stores.insert(store.to_string(), load_store(&path)?);
            }
        }

        debug!(dir = %data_dir.display(), stores = stores.len(), "opened jsonl data dir");
        Ok(Self {
            data_dir,
            stores: RwLock::new(stores),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn store_path(&self, store: &str) -> PathBuf {
        self.data_dir.join(format!("{store}.jsonl"))
    }

    /// Serialize a store's records and atomically replace its file.
    fn rewrite_store(&self, store: &str, records: &BTreeMap<String, Value>) -> Result<()> {
        let mut content = String::new();
        for (key, value) in records {
            let record = Record {
                key: key.clone(),
                value: value.clone(),
            };
            content.push_str(&serde_json::to_string(&record)?);
            content.push('\n');
        }
        atomic_write(self.store_path(store), &content)?;
        Ok(())
    }
}

fn load_store(path: &Path) -> Result<BTreeMap<String, Value>> {
    let mut records = BTreeMap::new();
    let content = fs::read_to_string(path)?;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(record) => {
                records.insert(record.key, record.value);
            }
            Err(e) => {
                warn!(
                    file = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "skipping corrupt record"
                );
            }
        }
    }
    Ok(records)
}

impl PersistenceAdapter for JsonlAdapter {
    fn put(&self, store: &str, key: &str, value: Value) -> Result<()> {
        let mut stores = self.stores.write();
        let records = stores.entry(store.to_string()).or_default();
        records.insert(key.to_string(), value);
        self.rewrite_store(store, records)
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
        let mut stores = self.stores.write();
        let Some(records) = stores.get_mut(store) else {
            return Ok(false);
        };
        if records.remove(key).is_none() {
            return Ok(false);
        }
        self.rewrite_store(store, records)?;
        Ok(true)
    }
}
