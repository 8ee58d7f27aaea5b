//! Pluggable key-value persistence
//!
//! The chunk manager reads and writes chunks, checkpoints and manifests
//! through [`PersistenceAdapter`], a minimal store/key/value contract.
//! Embedders can implement it over any backing database; this crate ships
//! an in-memory adapter and a JSONL file adapter.

mod jsonl;
mod memory;

pub use jsonl::JsonlAdapter;
pub use memory::MemoryAdapter;

use serde_json::Value;

use crate::error::Result;

/// Key-value storage by store name and key.
///
/// Implementations take `&self`; adapters are shared behind an `Arc` and
/// must handle their own interior locking.
pub trait PersistenceAdapter: Send + Sync {
    /// Insert or overwrite a value.
    fn put(&self, store: &str, key: &str, value: Value) -> Result<()>;

    /// Fetch one value; `None` when the key is absent.
    fn get(&self, store: &str, key: &str) -> Result<Option<Value>>;

    /// All values in a store, in stable key order.
    fn get_all(&self, store: &str) -> Result<Vec<Value>>;

    /// Remove a key; returns whether it was present.
    fn delete(&self, store: &str, key: &str) -> Result<bool>;
}
