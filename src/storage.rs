use crate::config::write_atomic;
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::{fs, path::PathBuf};

pub(crate) const KEY_CURRENCY: &str = "currency";
pub(crate) const KEY_INVENTORY: &str = "inventory";
pub(crate) const KEY_PET_NAME: &str = "pet-name";
pub(crate) const KEY_NOTES: &str = "notes";

/// String-keyed store that outlives the process.
pub(crate) trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// All keys live in one JSON object on disk, rewritten on every change.
pub(crate) struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub(crate) fn open(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                log::warn!("store {} is unreadable, starting empty: {e}", path.display());
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    fn flush(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.entries)?;
        write_atomic(&self.path, &data)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[derive(Default, Debug)]
pub(crate) struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = FileStore::open(path.clone());
        store.set(KEY_CURRENCY, "42").unwrap();
        store.set(KEY_PET_NAME, "Biscuit").unwrap();
        store.remove(KEY_PET_NAME).unwrap();

        let reopened = FileStore::open(path);
        assert_eq!(reopened.get(KEY_CURRENCY).as_deref(), Some("42"));
        assert_eq!(reopened.get(KEY_PET_NAME), None);
    }

    #[test]
    fn corrupt_store_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2").unwrap();

        let mut store = FileStore::open(path.clone());
        assert_eq!(store.get(KEY_CURRENCY), None);

        store.set(KEY_CURRENCY, "3").unwrap();
        assert_eq!(FileStore::open(path).get(KEY_CURRENCY).as_deref(), Some("3"));
    }

    #[test]
    fn removing_missing_key_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("store.json"));
        store.remove(KEY_NOTES).unwrap();
        assert!(!dir.path().join("store.json").exists());
    }
}
