//! Device command and event vocabulary.
//!
//! This crate defines what the controller says to a remote device and what the
//! device says back, already decoded. The byte-level wire format is out of
//! scope: a [`Command`] is an encoded intent handed to a [`CommandSender`], an
//! [`Event`] is what the decoding layer delivers.
//!
//! # Messages
//!
//! - **Commands** (host → device): settings changes, one-shot actions, and
//!   list uploads framed with [`ListFlags`]
//! - **Events** (device → host): current values, capability bitfields, and
//!   partial list items framed with [`ListFlags`]
//!
//! # Example
//!
//! ```rust
//! use setsync_protocol::{Command, CommandSender, ThermalMode};
//!
//! let mut outbox: Vec<Command> = Vec::new();
//! outbox.send(Command::SetThermalMode { mode: ThermalMode::Standard });
//! assert_eq!(outbox.len(), 1);
//! ```

mod commands;
mod constants;
mod error;
mod events;
mod flags;
mod sender;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use events::*;
pub use flags::*;
pub use sender::*;
pub use types::*;
