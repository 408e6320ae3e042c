//! Durable storage behind the window store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StorageError;

use super::definitions::{Definitions, StoredDefinitions};

/// Keyed storage of per-target definitions.
#[async_trait]
pub trait DefinitionsStorage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<StoredDefinitions>, StorageError>;

    async fn write(&self, key: &str, definitions: &Definitions) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    async fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// In-process storage holding JSON records.
///
/// Reads and writes can be switched to fail, and writes are counted.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw record, bypassing the current shape.
    pub fn insert_raw(&self, key: &str, record: Value) {
        self.lock().insert(key.to_string(), record);
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DefinitionsStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<StoredDefinitions>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed {
                reason: "reads disabled".to_string(),
            });
        }
        match self.lock().get(key) {
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, definitions: &Definitions) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed {
                reason: "writes disabled".to_string(),
            });
        }
        let record = serde_json::to_value(definitions)?;
        self.lock().insert(key.to_string(), record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed {
                reason: "writes disabled".to_string(),
            });
        }
        self.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
