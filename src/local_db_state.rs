//! Persisted key-value entries.
//!
//! The catalog and the redirect broadcaster only ever see the
//! [`KeyValueStore`] trait: string keys, string values, last write wins.
//! [`LmdbStore`] keeps the entries in an LMDB environment on disk and
//! [`MemoryStore`] keeps them in a map for hosts with no writable
//! filesystem.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lmdb::{Database, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app_response::AppResponse;

/// 10 MiB is far more than a marketing catalog ever needs.
const MAP_SIZE: usize = 10 * 1024 * 1024;

pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse>;

    /// Returns `true` when an entry was present and removed.
    fn remove_item(&self, key: &str) -> Result<bool, AppResponse>;
}

/// LMDB-backed store living in `<name>.lmdb`.
pub struct LmdbStore {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl LmdbStore {
    /// Opens (creating if needed) the environment directory `<name>.lmdb`.
    pub fn init(name: &str) -> Result<Self, AppResponse> {
        if name.trim().is_empty() {
            return Err(AppResponse::ValidationError(
                "Store name cannot be empty".to_string(),
            ));
        }

        let path = PathBuf::from(format!("{name}.lmdb"));
        std::fs::create_dir_all(&path)?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(MAP_SIZE)
            .open(&path)?;
        let db = env.open_db(None)?;

        info!("Opened local store at {}", path.display());
        Ok(Self { env, db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes every entry, leaving the environment usable.
    pub fn clear_all(&self) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.clear_db(self.db)?;
        txn.commit()?;
        info!("Cleared all entries in {}", self.path.display());
        Ok(())
    }

    /// Closes the environment and deletes its directory.
    pub fn destroy(self) -> Result<(), AppResponse> {
        let path = self.path.clone();
        drop(self);
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }
        info!("Destroyed local store at {}", path.display());
        Ok(())
    }
}

impl KeyValueStore for LmdbStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(AppResponse::from(e)),
        };
        txn.abort();
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Wrote {} bytes to '{}'", value.len(), key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool, AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &key, None) {
            Ok(()) => {
                txn.commit()?;
                Ok(true)
            }
            Err(lmdb::Error::NotFound) => {
                txn.abort();
                Ok(false)
            }
            Err(e) => Err(AppResponse::from(e)),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool, AppResponse> {
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }
}

/// Reads a JSON entry, treating a missing, unreadable or malformed entry
/// as absent.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Could not read '{}': {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring malformed entry '{}': {}", key, e);
            None
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), AppResponse> {
    let json = serde_json::to_string(value)?;
    store.set_item(key, &json)
}
