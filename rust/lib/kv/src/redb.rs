use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::KVError;
use crate::traits::KVStore;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("session");

fn storage<E: std::fmt::Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// RedbStore is a KVStore backed by redb — a pure-Rust embedded database.
/// Values written here survive restarts of the console.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(storage)?;
            }
        }
        let db = Database::create(path).map_err(storage)?;

        // Ensure the table exists so reads on a fresh file don't fail.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        debug!("RedbStore: opened {:?}", path);
        Ok(Self { db: Arc::new(db) })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;
        let value = table.get(key).map_err(storage)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.insert(key, value).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.remove(key).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            store.set_string("auth_token", "tok-1").unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get_string("auth_token").unwrap().as_deref(), Some("tok-1"));

        store.delete("auth_token").unwrap();
        assert!(store.get("auth_token").unwrap().is_none());
    }

    #[test]
    fn delete_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("s.redb")).unwrap();
        store.delete("nope").unwrap();
    }
}
