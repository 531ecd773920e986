//! Command dispatch and shared services for peripheral controllers.

use crate::component::{ComponentId, ComponentStore};
use setsync_metrics::{metric_defs, MetricLabels};
use setsync_protocol::{Command, CommandSender, Event, SettingId};
use setsync_store::{device_dictionary, preset_dictionary, Dictionary, PersistentStore};
use tracing::{debug, trace};

// ============================================================================
// Setting Host
// ============================================================================

/// Owns the outbound command channel of one device and accounts for what
/// goes through it.
pub struct SettingHost {
    device: String,
    sender: Box<dyn CommandSender>,
    connected: bool,
    offline_settings: bool,
    sent: u64,
}

impl std::fmt::Debug for SettingHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingHost")
            .field("device", &self.device)
            .field("connected", &self.connected)
            .field("offline_settings", &self.offline_settings)
            .field("sent", &self.sent)
            .finish_non_exhaustive()
    }
}

impl SettingHost {
    /// Host for `device`, sending through `sender`.
    pub fn new(device: impl Into<String>, sender: Box<dyn CommandSender>, offline_settings: bool) -> Self {
        Self {
            device: device.into(),
            sender,
            connected: false,
            offline_settings,
            sent: 0,
        }
    }

    /// Device uid.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Whether the device link is up.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Whether offline persistence is enabled.
    pub fn offline_settings(&self) -> bool {
        self.offline_settings
    }

    /// Number of commands sent so far.
    pub fn commands_sent(&self) -> u64 {
        self.sent
    }

    /// Send `command` on behalf of `component`. Dropped while disconnected.
    pub fn send(&mut self, component: ComponentId, command: Command) {
        if !self.connected {
            trace!("SettingHost[{}]: not connected, dropping {}", self.device, command);
            return;
        }
        debug!("SettingHost[{}]: {} -> {}", self.device, component, command);
        let labels = self
            .labels(component)
            .with(&[("command", command.name().to_string())]);
        metrics::counter!(metric_defs::COMMANDS_SENT.name, &labels).increment(1);
        self.sent += 1;
        self.sender.send(command);
    }

    /// Account for a report routed to `component`.
    pub fn report_received(&self, component: ComponentId, event: &Event) {
        debug!("SettingHost[{}]: {} <- {:?}", self.device, component, event);
        let labels = self
            .labels(component)
            .with(&[("event", event.name().to_string())]);
        metrics::counter!(metric_defs::REPORTS_RECEIVED.name, &labels).increment(1);
    }

    /// Account for a user request refused locally.
    pub fn request_rejected(&self, component: ComponentId, setting: SettingId, reason: &str) {
        debug!(
            "SettingHost[{}]: {} request rejected: {}",
            self.device, setting, reason
        );
        let labels = self
            .labels(component)
            .with(&[("setting", setting.as_str().to_string())]);
        metrics::counter!(metric_defs::REQUESTS_REJECTED.name, &labels).increment(1);
    }

    /// Account for a list committed by an assembler.
    pub fn list_committed(&self, component: ComponentId, setting: SettingId, len: usize) {
        trace!("SettingHost[{}]: {} committed, {} items", self.device, setting, len);
        let labels = self
            .labels(component)
            .with(&[("setting", setting.as_str().to_string())]);
        metrics::counter!(metric_defs::LISTS_COMMITTED.name, &labels).increment(1);
    }

    fn labels(&self, component: ComponentId) -> MetricLabels {
        MetricLabels::new(self.device.as_str(), component.as_str())
    }
}

// ============================================================================
// Peripheral Context
// ============================================================================

/// Everything a peripheral controller may touch while handling a callback.
#[derive(Debug)]
pub struct PeripheralContext<'a> {
    /// Outbound commands and accounting.
    pub host: &'a mut SettingHost,
    /// Published components.
    pub components: &'a mut ComponentStore,
    /// Offline persistence.
    pub store: &'a mut PersistentStore,
}

impl<'a> PeripheralContext<'a> {
    /// Bundle the services of one device.
    pub fn new(
        host: &'a mut SettingHost,
        components: &'a mut ComponentStore,
        store: &'a mut PersistentStore,
    ) -> Self {
        Self {
            host,
            components,
            store,
        }
    }

    /// Data the device reported about itself, if offline persistence is on.
    pub fn device_data(&self, component: ComponentId) -> Option<&Dictionary> {
        if !self.host.offline_settings() {
            return None;
        }
        self.store
            .dictionary(&device_dictionary(self.host.device(), component.as_str()))
    }

    /// Mutable device data, created on demand.
    pub fn device_data_mut(&mut self, component: ComponentId) -> Option<&mut Dictionary> {
        if !self.host.offline_settings() {
            return None;
        }
        let name = device_dictionary(self.host.device(), component.as_str());
        Some(self.store.dictionary_mut(&name))
    }

    /// User presets, if offline persistence is on.
    pub fn presets(&self, component: ComponentId) -> Option<&Dictionary> {
        if !self.host.offline_settings() {
            return None;
        }
        self.store
            .dictionary(&preset_dictionary(self.host.device(), component.as_str()))
    }

    /// Mutable user presets, created on demand.
    pub fn presets_mut(&mut self, component: ComponentId) -> Option<&mut Dictionary> {
        if !self.host.offline_settings() {
            return None;
        }
        let name = preset_dictionary(self.host.device(), component.as_str());
        Some(self.store.dictionary_mut(&name))
    }

    /// Whether anything was persisted about the device for `component`.
    pub fn has_device_data(&self, component: ComponentId) -> bool {
        self.host.offline_settings()
            && !self
                .store
                .is_new(&device_dictionary(self.host.device(), component.as_str()))
    }

    /// Drop everything persisted for `component`.
    pub fn forget(&mut self, component: ComponentId) {
        let device = self.host.device().to_string();
        self.store
            .remove_dictionary(&device_dictionary(&device, component.as_str()));
        self.store
            .remove_dictionary(&preset_dictionary(&device, component.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Command>>>);

    impl CommandSender for Recorder {
        fn send(&mut self, command: Command) {
            if let Ok(mut commands) = self.0.lock() {
                commands.push(command);
            }
        }
    }

    #[test]
    fn test_send_only_while_connected() {
        let recorder = Recorder::default();
        let mut host = SettingHost::new("dev", Box::new(recorder.clone()), true);
        host.send(ComponentId::ThermalControl, Command::TriggerCalibration);
        host.set_connected(true);
        host.send(ComponentId::ThermalControl, Command::TriggerCalibration);
        assert_eq!(host.commands_sent(), 1);
        assert_eq!(recorder.0.lock().map(|c| c.len()).unwrap_or(0), 1);
    }

    #[test]
    fn test_offline_settings_gate_persistence() {
        let mut host = SettingHost::new("dev", Box::new(Vec::<Command>::new()), false);
        let mut components = ComponentStore::new("dev");
        let mut store = PersistentStore::in_memory();
        let mut ctx = PeripheralContext::new(&mut host, &mut components, &mut store);
        assert!(ctx.presets_mut(ComponentId::ThermalControl).is_none());
        assert!(!ctx.has_device_data(ComponentId::ThermalControl));
    }

    #[test]
    fn test_device_data_keyed_by_device() {
        let mut host = SettingHost::new("dev", Box::new(Vec::<Command>::new()), true);
        let mut components = ComponentStore::new("dev");
        let mut store = PersistentStore::in_memory();
        let mut ctx = PeripheralContext::new(&mut host, &mut components, &mut store);
        if let Some(dict) = ctx.device_data_mut(ComponentId::ThermalControl) {
            dict.put("modes", serde_json::json!(6));
        }
        assert!(ctx.has_device_data(ComponentId::ThermalControl));
        ctx.forget(ComponentId::ThermalControl);
        assert!(!ctx.has_device_data(ComponentId::ThermalControl));
        assert!(store.dictionary("device/dev/thermal").is_none());
    }
}
