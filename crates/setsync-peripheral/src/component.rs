//! Published components and the registry observers subscribe to.

use crate::thermal::ThermalControlState;
use crate::wifi_access_point::WifiAccessPointState;
use crate::wifi_scanner::WifiScannerState;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use setsync_core::UpdateState;
use setsync_metrics::{metric_defs, MetricLabels};
use std::collections::BTreeMap;
use tracing::trace;

// ============================================================================
// Identifiers and Snapshots
// ============================================================================

/// Identifies one peripheral of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentId {
    /// Thermal camera control.
    ThermalControl,
    /// Wifi access point configuration.
    WifiAccessPoint,
    /// Wifi environment scanner.
    WifiScanner,
}

impl ComponentId {
    /// Short name, used in logs, metric labels and store dictionaries.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ComponentId::ThermalControl => "thermal",
            ComponentId::WifiAccessPoint => "wifi_access_point",
            ComponentId::WifiScanner => "wifi_scanner",
        }
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting value as observers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingSnapshot<T> {
    /// Exposed value, the pending request if any.
    pub value: T,
    /// Whether the device has confirmed it.
    pub state: UpdateState,
}

impl<T> SettingSnapshot<T> {
    /// Snapshot of `value` in `state`.
    pub fn new(value: T, state: UpdateState) -> Self {
        Self { value, state }
    }
}

/// Snapshot of a published component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum Component {
    /// Thermal camera control.
    ThermalControl(ThermalControlState),
    /// Wifi access point configuration.
    WifiAccessPoint(WifiAccessPointState),
    /// Wifi environment scanner.
    WifiScanner(WifiScannerState),
}

impl Component {
    /// Which component this is.
    pub fn id(&self) -> ComponentId {
        match self {
            Component::ThermalControl(_) => ComponentId::ThermalControl,
            Component::WifiAccessPoint(_) => ComponentId::WifiAccessPoint,
            Component::WifiScanner(_) => ComponentId::WifiScanner,
        }
    }
}

/// Change notification delivered to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ComponentEvent {
    /// The component became available.
    Published(Component),
    /// A published component changed.
    Updated(Component),
    /// The component went away.
    Unpublished(ComponentId),
}

// ============================================================================
// Component Store
// ============================================================================

/// Registry of the components currently published for one device.
///
/// Every mutation is broadcast to all live subscribers; subscribers whose
/// receiver was dropped are forgotten on the next broadcast.
#[derive(Debug)]
pub struct ComponentStore {
    device: String,
    components: BTreeMap<ComponentId, Component>,
    subscribers: Vec<Sender<ComponentEvent>>,
}

impl ComponentStore {
    /// Empty registry for `device`.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            components: BTreeMap::new(),
            subscribers: Vec::new(),
        }
    }

    /// Subscribe to change notifications.
    ///
    /// Components already published are announced first, so a late
    /// subscriber sees the same sequence as an early one.
    pub fn subscribe(&mut self) -> Receiver<ComponentEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for component in self.components.values() {
            let _ = tx.send(ComponentEvent::Published(component.clone()));
        }
        self.subscribers.push(tx);
        rx
    }

    /// The component `id`, if published.
    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Whether `id` is published.
    pub fn is_published(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    /// All published components.
    pub fn published(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Publish `component`. Publishing an already published component
    /// updates it instead.
    pub fn publish(&mut self, component: Component) {
        let id = component.id();
        if self.components.contains_key(&id) {
            self.update(component);
            return;
        }
        trace!("ComponentStore[{}]: publish {}", self.device, id);
        self.components.insert(id, component.clone());
        self.published_gauge(id, 1.0);
        self.broadcast(ComponentEvent::Published(component));
    }

    /// Replace the snapshot of a published component. Ignored when the
    /// component is not published.
    pub fn update(&mut self, component: Component) {
        let id = component.id();
        match self.components.get_mut(&id) {
            Some(current) => *current = component.clone(),
            None => {
                trace!("ComponentStore[{}]: ignoring update of unpublished {}", self.device, id);
                return;
            }
        }
        self.broadcast(ComponentEvent::Updated(component));
    }

    /// Remove `id`. Returns whether it was published.
    pub fn unpublish(&mut self, id: ComponentId) -> bool {
        if self.components.remove(&id).is_none() {
            return false;
        }
        trace!("ComponentStore[{}]: unpublish {}", self.device, id);
        self.published_gauge(id, 0.0);
        self.broadcast(ComponentEvent::Unpublished(id));
        true
    }

    fn broadcast(&mut self, event: ComponentEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn published_gauge(&self, id: ComponentId, value: f64) {
        let labels = MetricLabels::new(self.device.as_str(), id.as_str());
        metrics::gauge!(metric_defs::COMPONENTS_PUBLISHED.name, &labels.to_labels()).set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi_scanner::WifiScannerState;

    fn scanner(scanning: bool) -> Component {
        Component::WifiScanner(WifiScannerState {
            scanning,
            networks: Vec::new(),
            occupation: Vec::new(),
        })
    }

    #[test]
    fn test_publish_update_unpublish() {
        let mut store = ComponentStore::new("dev");
        let rx = store.subscribe();

        store.publish(scanner(false));
        store.update(scanner(true));
        assert!(store.unpublish(ComponentId::WifiScanner));
        assert!(!store.unpublish(ComponentId::WifiScanner));

        let events: Vec<ComponentEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ComponentEvent::Published(scanner(false)),
                ComponentEvent::Updated(scanner(true)),
                ComponentEvent::Unpublished(ComponentId::WifiScanner),
            ]
        );
    }

    #[test]
    fn test_update_of_unpublished_is_ignored() {
        let mut store = ComponentStore::new("dev");
        let rx = store.subscribe();
        store.update(scanner(true));
        assert!(rx.try_recv().is_err());
        assert!(store.get(ComponentId::WifiScanner).is_none());
    }

    #[test]
    fn test_late_subscriber_sees_published() {
        let mut store = ComponentStore::new("dev");
        store.publish(scanner(false));
        let rx = store.subscribe();
        assert_eq!(rx.try_recv().ok(), Some(ComponentEvent::Published(scanner(false))));
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let mut store = ComponentStore::new("dev");
        drop(store.subscribe());
        store.publish(scanner(false));
        assert!(store.subscribers.is_empty());
    }
}
