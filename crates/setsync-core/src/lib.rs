//! Setting synchronization engine.
//!
//! This crate mirrors the configurable parameters of a remote device and keeps
//! them in step with what the device reports, while letting the user change
//! them optimistically. It contains no I/O: outbound commands go through a
//! caller-supplied send closure, inbound reports are fed in by the owner.
//!
//! # Building blocks
//!
//! - [`ValueSetting`] - one remote-controlled value with its confirmation state
//! - [`RangedSetting`] - a numeric setting clamped to [`Bounds`]
//! - [`EnumSetting`] / [`BitfieldEnumSetting`] - enum settings restricted to a
//!   device-advertised subset, optionally bit-packed on the wire
//! - [`IncrementalListAssembler`] - builds a collection from marker-framed
//!   partial messages and swaps it in atomically
//! - [`ListUploader`] - frames a local collection for upload, skipping lists
//!   the device already holds
//! - [`ReconciliationPolicy`] - what happens to all of the above when the
//!   link comes up or goes away
//!
//! # Example
//!
//! ```rust
//! use setsync_core::{UpdateState, ValueSetting};
//!
//! let mut sent = Vec::new();
//! let mut setting = ValueSetting::new(10u32);
//! setting.on_reconnect(10, |v| sent.push(*v));
//!
//! assert!(setting.set_value(20, |v| sent.push(*v)));
//! assert_eq!(*setting.value(), 20);
//! assert_eq!(setting.state(), UpdateState::Updating);
//!
//! setting.on_remote_value_reported(20);
//! assert_eq!(setting.state(), UpdateState::UpToDate);
//! assert_eq!(sent, vec![20]);
//! ```
//!
//! The engine is single-threaded: every call for a given device
//! session must come from the same control thread.

mod enumeration;
mod list;
mod ranged;
mod reconcile;
mod setting;
mod upload;

pub use enumeration::*;
pub use list::*;
pub use ranged::*;
pub use reconcile::*;
pub use setting::*;
pub use upload::*;
