//! Durable key-value slot for the accumulated record.

use std::collections::HashMap;

use thiserror::Error;

use crate::accumulator::AccumulatedTime;

/// Key under which the accumulated record is stored.
pub const RECORD_KEY: &str = "accumulatedTimeRecord";

/// Errors from a durable store.
///
/// None of these are fatal to tracking: a failed load starts from an empty
/// mapping and a failed write is retried by the next flush.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be read or written.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The stored record could not be decoded.
    #[error("corrupt record under {key}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A get/set pair over named records.
///
/// Both calls are synchronous from the tracker's point of view. `set` is a
/// full overwrite of the record.
pub trait DurableStore {
    fn get(&self, key: &str) -> Result<Option<AccumulatedTime>, StoreError>;

    fn set(&mut self, key: &str, value: &AccumulatedTime) -> Result<(), StoreError>;
}

/// Process-local store, used for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, AccumulatedTime>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with `value` under [`RECORD_KEY`].
    pub fn with_record(value: AccumulatedTime) -> Self {
        let mut records = HashMap::new();
        records.insert(RECORD_KEY.to_string(), value);
        Self { records }
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<AccumulatedTime>, StoreError> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &AccumulatedTime) -> Result<(), StoreError> {
        self.records.insert(key.to_string(), value.clone());
        Ok(())
    }
}
