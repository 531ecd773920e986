//! Typed access to a single persisted value.

use crate::store::Dictionary;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// A typed key inside a [`Dictionary`].
///
/// Dictionaries are optional because offline persistence can be disabled,
/// in which case loads give nothing and saves are dropped.
#[derive(Debug)]
pub struct StorageEntry<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StorageEntry<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StorageEntry<T> {}

impl<T: Serialize + DeserializeOwned> StorageEntry<T> {
    /// Entry stored under `key`.
    pub const fn new(key: &'static str) -> Self {
        StorageEntry {
            key,
            _marker: PhantomData,
        }
    }

    /// Key of the entry.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Load the value. A value that does not decode as `T` is treated as
    /// absent.
    pub fn load(&self, dictionary: Option<&Dictionary>) -> Option<T> {
        let raw = dictionary?.get(self.key)?;
        match serde_json::from_value(raw.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring persisted '{}': {}", self.key, e);
                None
            }
        }
    }

    /// Save `value`.
    pub fn save(&self, dictionary: Option<&mut Dictionary>, value: &T) {
        let Some(dictionary) = dictionary else {
            return;
        };
        match serde_json::to_value(value) {
            Ok(raw) => dictionary.put(self.key, raw),
            Err(e) => log::warn!("cannot persist '{}': {}", self.key, e),
        }
    }

    /// Remove the value.
    pub fn clear(&self, dictionary: Option<&mut Dictionary>) {
        if let Some(dictionary) = dictionary {
            dictionary.remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LEVEL: StorageEntry<u32> = StorageEntry::new("level");

    #[test]
    fn test_load_missing_dictionary() {
        assert_eq!(LEVEL.load(None), None);
        LEVEL.save(None, &3);
    }

    #[test]
    fn test_save_then_load() {
        let mut dict = Dictionary::default();
        LEVEL.save(Some(&mut dict), &42);
        assert_eq!(LEVEL.load(Some(&dict)), Some(42));
        LEVEL.clear(Some(&mut dict));
        assert_eq!(LEVEL.load(Some(&dict)), None);
    }

    #[test]
    fn test_wrong_type_is_absent() {
        let mut dict = Dictionary::default();
        dict.put("level", json!("high"));
        assert_eq!(LEVEL.load(Some(&dict)), None);
    }
}
