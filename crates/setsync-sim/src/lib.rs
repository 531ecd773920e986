//! Simulated remote device and scenario runner.
//!
//! Wires a [`DeviceController`](setsync_peripheral::DeviceController) to a
//! [`SimulatedDevice`] through a seeded [`LossyLink`], and replays YAML
//! [`Scenario`]s against the pair. Used by the `setsync-sim` binary and by
//! the end-to-end tests.
//!
//! # Example
//!
//! ```rust
//! use setsync_sim::{Scenario, ScenarioRunner};
//! use setsync_store::PersistentStore;
//!
//! let scenario = Scenario::from_yaml(r#"
//! name: doc
//! steps:
//!   - connect
//!   - user: { action: thermal_mode, mode: standard }
//!   - expect: { component: thermal_control, path: mode.state, equals: up_to_date }
//! "#).unwrap();
//!
//! let mut runner = ScenarioRunner::from_scenario(&scenario, PersistentStore::in_memory()).unwrap();
//! let report = runner.run(&scenario).unwrap();
//! assert_eq!(report.commands_dropped, 0);
//! ```

mod device;
mod error;
mod link;
mod runner;
mod scenario;

pub use device::*;
pub use error::*;
pub use link::*;
pub use runner::*;
pub use scenario::*;
