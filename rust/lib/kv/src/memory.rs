use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::KVError;
use crate::traits::KVStore;

/// Process-local KVStore. Nothing is persisted; used by tests and by
/// callers that explicitly opt out of durable sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
