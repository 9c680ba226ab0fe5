//! Bulb record store
//!
//! The bridge consumes bulb records through the [`BulbStore`] trait and only
//! ever calls [`read_all`]; the CRUD operations exist for the admin tooling
//! that manages the fleet. The bundled implementation keeps the records in a
//! single JSON object keyed by canonical MAC.
//!
//! [`read_all`]: BulbStore::read_all

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use wizflow_core::BulbRecord;

use crate::error::{ControlError, Result};

/// Keyed bulb record store.
pub trait BulbStore: Send + Sync {
    /// All records. The bridge calls this on every reload tick.
    fn read_all(&self) -> Result<Vec<BulbRecord>>;

    /// One record by canonical MAC.
    fn read(&self, mac: &str) -> Result<Option<BulbRecord>>;

    /// Add a new record. Fails if the MAC already exists.
    fn create(&self, record: BulbRecord) -> Result<()>;

    /// Replace an existing record. Fails if the MAC is unknown.
    fn update(&self, record: BulbRecord) -> Result<()>;

    /// Delete a record. Returns whether it existed.
    fn remove(&self, mac: &str) -> Result<bool>;
}

/// [`BulbStore`] backed by one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use (and create on first write) the store file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, BulbRecord>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // A store that was never written to is simply empty.
                debug!("bulb store {:?} not found, treating as empty", self.path);
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    fn save(&self, records: &BTreeMap<String, BulbRecord>) -> Result<()> {
        let raw = serde_json::to_vec_pretty(records)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl BulbStore for JsonFileStore {
    fn read_all(&self) -> Result<Vec<BulbRecord>> {
        Ok(self.load()?.into_values().collect())
    }

    fn read(&self, mac: &str) -> Result<Option<BulbRecord>> {
        Ok(self.load()?.remove(mac))
    }

    fn create(&self, mut record: BulbRecord) -> Result<()> {
        record.validate()?;
        let mut records = self.load()?;
        if records.contains_key(&record.mac) {
            return Err(ControlError::StoreError(format!(
                "bulb {} already exists",
                record.mac
            )));
        }
        records.insert(record.mac.clone(), record);
        self.save(&records)
    }

    fn update(&self, mut record: BulbRecord) -> Result<()> {
        record.validate()?;
        let mut records = self.load()?;
        if !records.contains_key(&record.mac) {
            return Err(ControlError::StoreError(format!(
                "bulb {} not found",
                record.mac
            )));
        }
        records.insert(record.mac.clone(), record);
        self.save(&records)
    }

    fn remove(&self, mac: &str) -> Result<bool> {
        let mut records = self.load()?;
        let existed = records.remove(mac).is_some();
        if existed {
            self.save(&records)?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn record(mac: &str, channel: u16) -> BulbRecord {
        BulbRecord {
            mac: mac.into(),
            ip: Ipv4Addr::new(192, 168, 1, 20),
            name: "test bulb".into(),
            kind: "SHRGBC".into(),
            channel,
        }
    }

    fn temp_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("bulbs.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_create_read_roundtrip() {
        let (_dir, store) = temp_store();
        store.create(record("AABBCCDDEE01", 1)).unwrap();

        // Keys are canonicalized on create.
        let found = store.read("aa:bb:cc:dd:ee:01").unwrap().unwrap();
        assert_eq!(found.channel, 1);
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_create_rejects_duplicate() {
        let (_dir, store) = temp_store();
        store.create(record("aa:bb:cc:dd:ee:01", 1)).unwrap();
        let err = store.create(record("aa:bb:cc:dd:ee:01", 7)).unwrap_err();
        assert!(matches!(err, ControlError::StoreError(_)));
    }

    #[test]
    fn test_update_requires_existing() {
        let (_dir, store) = temp_store();
        let err = store.update(record("aa:bb:cc:dd:ee:01", 1)).unwrap_err();
        assert!(matches!(err, ControlError::StoreError(_)));

        store.create(record("aa:bb:cc:dd:ee:01", 1)).unwrap();
        store.update(record("aa:bb:cc:dd:ee:01", 13)).unwrap();
        let found = store.read("aa:bb:cc:dd:ee:01").unwrap().unwrap();
        assert_eq!(found.channel, 13);
    }

    #[test]
    fn test_remove() {
        let (_dir, store) = temp_store();
        store.create(record("aa:bb:cc:dd:ee:01", 1)).unwrap();
        assert!(store.remove("aa:bb:cc:dd:ee:01").unwrap());
        assert!(!store.remove("aa:bb:cc:dd:ee:01").unwrap());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path.clone(), b"{ not json").unwrap();
        assert!(store.read_all().is_err());
    }
}
