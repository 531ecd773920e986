//! Device peripherals built on the setting synchronization engine.
//!
//! A [`DeviceController`] owns the session of one remote device. It routes
//! decoded [`Event`](setsync_protocol::Event)s and connectivity changes to its
//! peripheral controllers, which mirror device features as [`Component`]s
//! published in a [`ComponentStore`].
//!
//! # Peripherals
//!
//! - [`ThermalControlController`] - thermal camera settings, durable across
//!   sessions through presets
//! - [`WifiAccessPointController`] - access point configuration, published
//!   while connected
//! - [`WifiScannerController`] - wifi environment sweeps
//!
//! # Example
//!
//! ```rust
//! use setsync_peripheral::{ComponentEvent, DeviceConfig, DeviceController};
//! use setsync_protocol::Command;
//! use setsync_store::PersistentStore;
//!
//! let (tx, commands) = crossbeam_channel::unbounded::<Command>();
//! let mut device = DeviceController::new(DeviceConfig::new("anafi-01"), tx, PersistentStore::in_memory());
//! let events = device.subscribe();
//!
//! device.on_connected();
//! assert!(matches!(events.try_recv(), Ok(ComponentEvent::Published(_))));
//! assert!(commands.try_recv().is_err());
//! ```

mod component;
mod config;
mod device;
mod error;
mod host;
mod notifier;
mod peripheral;
mod thermal;
mod wifi_access_point;
mod wifi_scanner;

pub use component::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use host::*;
pub use notifier::*;
pub use peripheral::*;
pub use thermal::*;
pub use wifi_access_point::*;
pub use wifi_scanner::*;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::component::{ComponentEvent, ComponentStore};
    use crate::host::{PeripheralContext, SettingHost};
    use crossbeam_channel::Receiver;
    use setsync_protocol::Command;
    use setsync_store::PersistentStore;

    /// One device worth of services, with recording channels.
    pub struct Rig {
        pub host: SettingHost,
        pub components: ComponentStore,
        pub store: PersistentStore,
        commands: Receiver<Command>,
        events: Receiver<ComponentEvent>,
    }

    impl Rig {
        pub fn new() -> Self {
            let (tx, commands) = crossbeam_channel::unbounded();
            let mut components = ComponentStore::new("test");
            let events = components.subscribe();
            Self {
                host: SettingHost::new("test", Box::new(tx), true),
                components,
                store: PersistentStore::in_memory(),
                commands,
                events,
            }
        }

        pub fn ctx(&mut self) -> PeripheralContext<'_> {
            PeripheralContext::new(&mut self.host, &mut self.components, &mut self.store)
        }

        pub fn drain_commands(&self) -> Vec<Command> {
            self.commands.try_iter().collect()
        }

        pub fn drain_events(&self) -> Vec<ComponentEvent> {
            self.events.try_iter().collect()
        }
    }
}
