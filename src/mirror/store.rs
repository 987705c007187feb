//! Last-value store.
//!
//! One [`Record`] per logical key, last write wins. A store opened on a file
//! rewrites that file after every mutation (write to a sibling temp file,
//! then rename) so a restarted mirror answers queries with what it had.

use crate::error::{PaasError, Result};
use crate::protocol::Record;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct Store {
    records: BTreeMap<String, Record>,
    path: Option<PathBuf>,
}

impl Store {
    /// Creates a store that lives only as long as the process
    pub fn in_memory() -> Self {
        Store::default()
    }

    /// Opens a durable store, creating it empty when the file does not exist
    ///
    /// # Arguments
    /// * `path` - JSON file holding `key -> record`
    ///
    /// # Returns
    /// * `Result<Store>` - The loaded store, or a storage error when the file is unreadable
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text).map_err(|e| {
                    PaasError::Storage(format!("{} is not a valid store: {}", path.display(), e))
                })?
            }
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            BTreeMap::new()
        };

        info!("Opened store {} with {} records", path.display(), records.len());
        Ok(Store {
            records,
            path: Some(path),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    /// Inserts or replaces the record for `key`
    pub fn set(&mut self, key: impl Into<String>, record: Record) -> Result<()> {
        let key = key.into();
        debug!("Storing {} = {:?}", key, record);
        self.records.insert(key, record);
        self.persist()
    }

    /// Removes `key`; deleting an absent key is a no-op
    ///
    /// # Returns
    /// * `Result<bool>` - Whether a record was removed
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        if self.records.remove(key).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Records in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the whole table to disk; no-op for in-memory stores
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let text = serde_json::to_string(&self.records)?;
        fs::write(&tmp, text)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|e| PaasError::Storage(format!("cannot write {}: {}", path.display(), e)))
    }
}
