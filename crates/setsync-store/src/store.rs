//! Named dictionaries of persisted values.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Dictionary
// ============================================================================

/// One named group of persisted values, keyed by entry name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dictionary {
    entries: BTreeMap<String, Value>,
}

impl Dictionary {
    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn put(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    /// Remove the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Whether anything is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stored keys, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// ============================================================================
// Persistent Store
// ============================================================================

/// Every dictionary, optionally backed by a JSON file.
///
/// Changes stay in memory until [`PersistentStore::save`] is called.
#[derive(Debug, Clone, Default)]
pub struct PersistentStore {
    path: Option<PathBuf>,
    dictionaries: BTreeMap<String, Dictionary>,
}

impl PersistentStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store file at `path`. A missing file gives an empty store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let dictionaries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("store file {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(PersistentStore {
            path: Some(path),
            dictionaries,
        })
    }

    /// File backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write every dictionary to the backing file. No-op for in-memory
    /// stores.
    pub fn save(&self) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.dictionaries)?;
        std::fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }

    /// Dictionary called `name`, if it exists.
    pub fn dictionary(&self, name: &str) -> Option<&Dictionary> {
        self.dictionaries.get(name)
    }

    /// Dictionary called `name`, created empty if missing.
    pub fn dictionary_mut(&mut self, name: &str) -> &mut Dictionary {
        self.dictionaries.entry(name.to_string()).or_default()
    }

    /// Whether nothing has been stored under `name` yet.
    pub fn is_new(&self, name: &str) -> bool {
        self.dictionaries.get(name).map_or(true, Dictionary::is_empty)
    }

    /// Remove the dictionary called `name`.
    pub fn remove_dictionary(&mut self, name: &str) -> Option<Dictionary> {
        self.dictionaries.remove(name)
    }

    /// Names of every dictionary, in order.
    pub fn dictionary_names(&self) -> impl Iterator<Item = &str> {
        self.dictionaries.keys().map(String::as_str)
    }
}

/// Dictionary name holding data a device reported about itself.
pub fn device_dictionary(device_uid: &str, component: &str) -> String {
    format!("device/{}/{}", device_uid, component)
}

/// Dictionary name holding user presets for a device.
pub fn preset_dictionary(device_uid: &str, component: &str) -> String {
    format!("preset/{}/{}", device_uid, component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_new_until_written() {
        let mut store = PersistentStore::in_memory();
        assert!(store.is_new("preset/a/thermal"));
        store.dictionary_mut("preset/a/thermal");
        assert!(store.is_new("preset/a/thermal"));
        store.dictionary_mut("preset/a/thermal").put("mode", json!("standard"));
        assert!(!store.is_new("preset/a/thermal"));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("setsync-store-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut store = PersistentStore::open(&path).expect("open missing file");
        assert!(store.dictionary_names().next().is_none());
        store
            .dictionary_mut(&device_dictionary("dev1", "thermal"))
            .put("capabilities", json!(6));
        store.save().expect("save");

        let reopened = PersistentStore::open(&path).expect("reopen");
        let dict = reopened
            .dictionary("device/dev1/thermal")
            .expect("dictionary present");
        assert_eq!(dict.get("capabilities"), Some(&json!(6)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("setsync-store-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").expect("write");
        let result = PersistentStore::open(&path);
        assert!(matches!(result, Err(StoreError::Format(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_clear_dictionary() {
        let mut store = PersistentStore::in_memory();
        let dict = store.dictionary_mut("x");
        dict.put("a", json!(1));
        dict.put("b", json!(2));
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        dict.clear();
        assert!(store.is_new("x"));
    }
}
