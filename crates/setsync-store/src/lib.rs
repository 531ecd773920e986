//! Offline persistence for mirrored settings.
//!
//! Values survive between device sessions in named dictionaries of JSON
//! values. The engine never writes here itself: peripheral controllers save
//! presets when the user edits a setting, and device data (capabilities,
//! ranges) when the device reports it.
//!
//! # Example
//!
//! ```rust
//! use setsync_store::{PersistentStore, StorageEntry};
//!
//! const MODE: StorageEntry<String> = StorageEntry::new("mode");
//!
//! let mut store = PersistentStore::in_memory();
//! MODE.save(Some(store.dictionary_mut("presets/thermal")), &"standard".to_string());
//! assert_eq!(MODE.load(store.dictionary("presets/thermal")).as_deref(), Some("standard"));
//! ```

mod entry;
mod error;
mod store;

pub use entry::*;
pub use error::*;
pub use store::*;
