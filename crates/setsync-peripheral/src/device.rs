//! Session of one remote device.

use crate::component::{Component, ComponentEvent, ComponentId, ComponentStore};
use crate::config::DeviceConfig;
use crate::host::{PeripheralContext, SettingHost};
use crate::peripheral::PeripheralController;
use crate::thermal::{ThermalControlController, ThermalControlHandle};
use crate::wifi_access_point::{WifiAccessPointController, WifiAccessPointHandle};
use crate::wifi_scanner::{WifiScannerController, WifiScannerHandle};
use crossbeam_channel::Receiver;
use setsync_protocol::{parse_country_code, CommandSender, Event};
use setsync_store::{PersistentStore, StoreResult};
use tracing::{debug, info, warn};

/// Owns the peripherals of one device and drives them from the decoded event
/// feed and the connectivity signal.
///
/// Everything runs on the caller's thread. Each callback ends with at most
/// one [`ComponentEvent`] per peripheral.
#[derive(Debug)]
pub struct DeviceController {
    config: DeviceConfig,
    host: SettingHost,
    store: PersistentStore,
    components: ComponentStore,
    thermal: ThermalControlController,
    access_point: WifiAccessPointController,
    scanner: WifiScannerController,
}

impl DeviceController {
    /// Controller for the device described by `config`, sending through
    /// `sender`. Durable components with persisted data in `store` are
    /// published right away.
    pub fn new(config: DeviceConfig, sender: impl CommandSender + 'static, store: PersistentStore) -> Self {
        let mut host = SettingHost::new(config.uid.clone(), Box::new(sender), config.offline_settings);
        let mut components = ComponentStore::new(config.uid.clone());
        let mut store = store;

        let mut ctx = PeripheralContext::new(&mut host, &mut components, &mut store);
        let mut thermal = ThermalControlController::new(&ctx);
        thermal.flush(&mut ctx);

        let forced_country = config.forced_country().and_then(|code| match parse_country_code(code) {
            Ok(code) => Some(code),
            Err(err) => {
                warn!("DeviceController[{}]: ignoring detected country: {}", config.uid, err);
                None
            }
        });
        let access_point = WifiAccessPointController::new(forced_country);
        Self {
            config,
            host,
            store,
            components,
            thermal,
            access_point,
            scanner: WifiScannerController::new(),
        }
    }

    /// Device configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Device uid.
    pub fn uid(&self) -> &str {
        &self.config.uid
    }

    /// Whether the device link is up.
    pub fn is_connected(&self) -> bool {
        self.host.is_connected()
    }

    /// Number of commands sent so far.
    pub fn commands_sent(&self) -> u64 {
        self.host.commands_sent()
    }

    /// Subscribe to component notifications.
    pub fn subscribe(&mut self) -> Receiver<ComponentEvent> {
        self.components.subscribe()
    }

    /// The published snapshot of `id`.
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    /// Every published component.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.published()
    }

    /// Offline persistence.
    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// Write the persistent store to disk.
    pub fn save_store(&self) -> StoreResult<()> {
        self.store.save()
    }

    fn split(&mut self) -> (PeripheralContext<'_>, [&mut dyn PeripheralController; 3]) {
        let Self {
            host,
            store,
            components,
            thermal,
            access_point,
            scanner,
            ..
        } = self;
        (
            PeripheralContext::new(host, components, store),
            [
                thermal as &mut dyn PeripheralController,
                access_point,
                scanner,
            ],
        )
    }

    /// The device link came up.
    pub fn on_connected(&mut self) {
        if self.host.is_connected() {
            debug!("DeviceController[{}]: already connected", self.config.uid);
            return;
        }
        info!("DeviceController[{}]: connected", self.config.uid);
        self.host.set_connected(true);
        let (mut ctx, peripherals) = self.split();
        for peripheral in peripherals {
            peripheral.on_connected(&mut ctx);
            peripheral.flush(&mut ctx);
        }
    }

    /// The device link went away. Durable components persist their values
    /// and the store is written back.
    pub fn on_disconnected(&mut self) {
        if !self.host.is_connected() {
            debug!("DeviceController[{}]: already disconnected", self.config.uid);
            return;
        }
        info!("DeviceController[{}]: disconnected", self.config.uid);
        self.host.set_connected(false);
        let (mut ctx, peripherals) = self.split();
        for peripheral in peripherals {
            peripheral.on_disconnected(&mut ctx);
            peripheral.flush(&mut ctx);
        }
        if let Err(err) = self.store.save() {
            warn!("DeviceController[{}]: failed to save store: {}", self.config.uid, err);
        }
    }

    /// A connection attempt was abandoned. Handled as a disconnection if the
    /// link was already up.
    pub fn on_connection_canceled(&mut self) {
        if self.host.is_connected() {
            self.on_disconnected();
        } else {
            debug!("DeviceController[{}]: connection canceled", self.config.uid);
        }
    }

    /// Feed one decoded event. Returns whether a peripheral handled it.
    pub fn on_event(&mut self, event: &Event) -> bool {
        if !self.host.is_connected() {
            warn!(
                "DeviceController[{}]: dropping {} while disconnected",
                self.config.uid,
                event.name()
            );
            return false;
        }
        let (mut ctx, peripherals) = self.split();
        let mut handled_by = None;
        for peripheral in peripherals {
            if peripheral.on_event(&mut ctx, event) {
                peripheral.flush(&mut ctx);
                handled_by = Some(peripheral.id());
                break;
            }
        }
        match handled_by {
            Some(id) => {
                self.host.report_received(id, event);
                true
            }
            None => {
                warn!("DeviceController[{}]: unhandled event {}", self.config.uid, event.name());
                false
            }
        }
    }

    /// Thermal control, if published.
    pub fn thermal_control(&mut self) -> Option<ThermalControlHandle<'_>> {
        if !self.components.is_published(ComponentId::ThermalControl) {
            return None;
        }
        let ctx = PeripheralContext::new(&mut self.host, &mut self.components, &mut self.store);
        Some(ThermalControlHandle::new(&mut self.thermal, ctx))
    }

    /// Wifi access point, if published.
    pub fn wifi_access_point(&mut self) -> Option<WifiAccessPointHandle<'_>> {
        if !self.components.is_published(ComponentId::WifiAccessPoint) {
            return None;
        }
        let ctx = PeripheralContext::new(&mut self.host, &mut self.components, &mut self.store);
        Some(WifiAccessPointHandle::new(&mut self.access_point, ctx))
    }

    /// Wifi scanner, if published.
    pub fn wifi_scanner(&mut self) -> Option<WifiScannerHandle<'_>> {
        if !self.components.is_published(ComponentId::WifiScanner) {
            return None;
        }
        let ctx = PeripheralContext::new(&mut self.host, &mut self.components, &mut self.store);
        Some(WifiScannerHandle::new(&mut self.scanner, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setsync_core::{SettingEnum, UpdateState};
    use setsync_protocol::{Command, ThermalMode};

    fn device() -> (DeviceController, Receiver<Command>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let device = DeviceController::new(DeviceConfig::new("dev"), tx, PersistentStore::in_memory());
        (device, rx)
    }

    fn thermal_capabilities() -> Event {
        Event::ThermalCapabilities {
            modes: ThermalMode::to_bitfield(ThermalMode::VARIANTS),
        }
    }

    #[test]
    fn test_events_dropped_while_disconnected() {
        let (mut device, _rx) = device();
        assert!(!device.on_event(&thermal_capabilities()));
        assert!(device.component(ComponentId::ThermalControl).is_none());
    }

    #[test]
    fn test_transient_components_follow_link() {
        let (mut device, _rx) = device();
        assert!(device.wifi_access_point().is_none());
        device.on_connected();
        assert!(device.wifi_access_point().is_some());
        assert!(device.wifi_scanner().is_some());
        device.on_disconnected();
        assert!(device.wifi_access_point().is_none());
        assert!(device.wifi_scanner().is_none());
    }

    #[test]
    fn test_thermal_survives_disconnect_and_pushes_preset() {
        let (mut device, rx) = device();
        device.on_connected();
        assert!(device.on_event(&thermal_capabilities()));
        assert!(device.on_event(&Event::ThermalMode { mode: ThermalMode::Standard }));
        device.on_disconnected();

        let mut thermal = device.thermal_control().expect("kept while disconnected");
        assert!(thermal.set_mode(ThermalMode::Blended));
        assert_eq!(thermal.mode_state(), UpdateState::UpToDate);
        assert!(rx.try_recv().is_err());

        device.on_connected();
        assert!(device.on_event(&Event::ThermalMode { mode: ThermalMode::Standard }));
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![Command::SetThermalMode { mode: ThermalMode::Blended }]
        );
        let thermal = device.thermal_control().expect("published");
        assert_eq!(thermal.mode(), ThermalMode::Blended);
        assert_eq!(thermal.mode_state(), UpdateState::Updating);
    }

    #[test]
    fn test_persisted_thermal_published_at_startup() {
        let (mut device, _rx) = device();
        device.on_connected();
        device.on_event(&thermal_capabilities());
        device.on_disconnected();
        let store = device.store().clone();

        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut restored = DeviceController::new(DeviceConfig::new("dev"), tx, store);
        let thermal = restored.thermal_control().expect("restored");
        assert_eq!(thermal.state().supported_modes, ThermalMode::VARIANTS.to_vec());
    }

    #[test]
    fn test_connection_cancel() {
        let (mut device, _rx) = device();
        device.on_connection_canceled();
        assert!(!device.is_connected());
        device.on_connected();
        device.on_connection_canceled();
        assert!(!device.is_connected());
        assert!(device.wifi_scanner().is_none());
    }
}
