//! Wifi environment scanner.

use crate::component::{Component, ComponentId};
use crate::host::PeripheralContext;
use crate::notifier::ChangeNotifier;
use crate::peripheral::PeripheralController;
use serde::{Deserialize, Serialize};
use setsync_core::{ComponentLifetime, IncrementalListAssembler, Marker, ReconciliationPolicy, SettingEnum};
use setsync_protocol::{Band, Channel, Command, Event, ScannedNetwork, SettingId};
use std::collections::BTreeMap;
use tracing::{debug, trace};

const ID: ComponentId = ComponentId::WifiScanner;

/// Number of networks seen on one channel during the last sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOccupation {
    /// The channel.
    pub channel: Channel,
    /// Networks seen on it.
    pub networks: usize,
}

/// Snapshot of the scanner component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiScannerState {
    /// Whether sweeps are running.
    pub scanning: bool,
    /// Networks seen during the last sweep, in report order.
    pub networks: Vec<ScannedNetwork>,
    /// Per-channel network counts of the last sweep.
    pub occupation: Vec<ChannelOccupation>,
}

fn occupation_of(networks: &[ScannedNetwork]) -> Vec<ChannelOccupation> {
    let mut counts: BTreeMap<Channel, usize> = BTreeMap::new();
    for network in networks {
        *counts.entry(network.channel).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(channel, networks)| ChannelOccupation { channel, networks })
        .collect()
}

/// Runs wifi sweeps on the device while the user asks for it.
#[derive(Debug)]
pub struct WifiScannerController {
    notifier: ChangeNotifier,
    policy: ReconciliationPolicy,
    scanning: bool,
    results: IncrementalListAssembler<ScannedNetwork, (String, Channel)>,
    occupation: Vec<ChannelOccupation>,
}

impl Default for WifiScannerController {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiScannerController {
    /// Idle scanner.
    pub fn new() -> Self {
        Self {
            notifier: ChangeNotifier::new(ID),
            policy: ReconciliationPolicy::new(ComponentLifetime::Transient),
            scanning: false,
            results: IncrementalListAssembler::new(|network: &ScannedNetwork| {
                (network.ssid.clone(), network.channel)
            }),
            occupation: Vec::new(),
        }
    }

    /// Current snapshot, as published.
    pub fn state(&self) -> WifiScannerState {
        WifiScannerState {
            scanning: self.scanning,
            networks: self.results.committed().to_vec(),
            occupation: self.occupation.clone(),
        }
    }

    fn request_sweep(&self, ctx: &mut PeripheralContext<'_>) {
        ctx.host.send(
            ID,
            Command::StartScan {
                bands: Band::to_bitfield(Band::VARIANTS),
            },
        );
    }

    /// Stop scanning and clear results. Returns whether anything changed.
    fn stop(&mut self) -> bool {
        let was_scanning = std::mem::take(&mut self.scanning);
        let had_results = self.results.reset();
        self.occupation.clear();
        was_scanning || had_results
    }
}

impl PeripheralController for WifiScannerController {
    fn id(&self) -> ComponentId {
        ID
    }

    fn snapshot(&self) -> Component {
        Component::WifiScanner(self.state())
    }

    fn notifier(&mut self) -> &mut ChangeNotifier {
        &mut self.notifier
    }

    fn on_connected(&mut self, _ctx: &mut PeripheralContext<'_>) {
        let policy = self.policy;
        policy.connect(&mut [&mut self.results], false);
        self.notifier.publish();
    }

    fn on_disconnected(&mut self, _ctx: &mut PeripheralContext<'_>) {
        let policy = self.policy;
        let (changed, _) = policy.disconnect(&mut [&mut self.results], false);
        // a live scan does not outlive the session
        let stopped = self.stop();
        self.notifier.changed(changed || stopped);
        self.notifier.unpublish();
    }

    fn on_event(&mut self, ctx: &mut PeripheralContext<'_>, event: &Event) -> bool {
        let Event::ScannedItem { network, flags } = event else {
            return false;
        };
        if !self.scanning {
            trace!("WifiScanner[{}]: not scanning, ignoring result", ctx.host.device());
            return true;
        }
        let marker = flags.marker();
        let item = (marker != Marker::Empty).then(|| network.clone());
        let changed = self.results.process(item, marker);
        if changed {
            self.occupation = occupation_of(self.results.committed());
        }
        if changed && marker != Marker::Remove {
            ctx.host.list_committed(
                ID,
                SettingId::WifiScanResults,
                self.results.committed().len(),
            );
            // sweep done, start the next one
            self.request_sweep(ctx);
        }
        self.notifier.changed(changed);
        true
    }
}

/// User access to a published scanner component.
#[derive(Debug)]
pub struct WifiScannerHandle<'a> {
    controller: &'a mut WifiScannerController,
    ctx: PeripheralContext<'a>,
}

impl<'a> WifiScannerHandle<'a> {
    pub(crate) fn new(controller: &'a mut WifiScannerController, ctx: PeripheralContext<'a>) -> Self {
        Self { controller, ctx }
    }

    /// Current snapshot.
    pub fn state(&self) -> WifiScannerState {
        self.controller.state()
    }

    /// Whether sweeps are running.
    pub fn is_scanning(&self) -> bool {
        self.controller.scanning
    }

    /// Networks seen during the last sweep.
    pub fn networks(&self) -> &[ScannedNetwork] {
        self.controller.results.committed()
    }

    /// Number of networks seen on `channel` during the last sweep.
    pub fn occupation(&self, channel: Channel) -> usize {
        self.controller
            .occupation
            .iter()
            .find(|occupation| occupation.channel == channel)
            .map_or(0, |occupation| occupation.networks)
    }

    /// Start sweeping. Only possible while connected.
    pub fn start_scan(&mut self) -> bool {
        if self.controller.scanning || !self.ctx.host.is_connected() {
            return false;
        }
        debug!("WifiScanner[{}]: starting scan", self.ctx.host.device());
        self.controller.scanning = true;
        self.controller.request_sweep(&mut self.ctx);
        self.finish(true)
    }

    /// Stop sweeping and clear results.
    pub fn stop_scan(&mut self) -> bool {
        let changed = self.controller.stop();
        if changed {
            debug!("WifiScanner[{}]: scan stopped", self.ctx.host.device());
        }
        self.finish(changed)
    }

    fn finish(&mut self, changed: bool) -> bool {
        self.controller.notifier.changed(changed);
        self.controller.flush(&mut self.ctx);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentEvent;
    use crate::test_support::Rig;
    use setsync_protocol::ListFlags;

    fn network(ssid: &str, id: u8) -> ScannedNetwork {
        ScannedNetwork {
            ssid: ssid.to_string(),
            rssi: -60,
            channel: Channel::new(Band::Band2_4Ghz, id).expect("valid channel"),
        }
    }

    fn connected(rig: &mut Rig) -> WifiScannerController {
        let mut scanner = WifiScannerController::new();
        rig.host.set_connected(true);
        let mut ctx = rig.ctx();
        scanner.on_connected(&mut ctx);
        scanner.flush(&mut ctx);
        scanner
    }

    fn feed(rig: &mut Rig, scanner: &mut WifiScannerController, network: ScannedNetwork, flags: ListFlags) {
        let mut ctx = rig.ctx();
        assert!(scanner.on_event(&mut ctx, &Event::ScannedItem { network, flags }));
        scanner.flush(&mut ctx);
    }

    #[test]
    fn test_results_ignored_when_idle() {
        let mut rig = Rig::new();
        let mut scanner = connected(&mut rig);
        feed(&mut rig, &mut scanner, network("a", 1), ListFlags::FIRST | ListFlags::LAST);
        assert!(scanner.state().networks.is_empty());
        assert!(rig.drain_commands().is_empty());
    }

    #[test]
    fn test_sweep_counts_and_restarts() {
        let mut rig = Rig::new();
        let mut scanner = connected(&mut rig);
        let mut handle = WifiScannerHandle::new(&mut scanner, rig.ctx());
        assert!(handle.start_scan());
        let bands = Band::to_bitfield(Band::VARIANTS);
        assert_eq!(rig.drain_commands(), vec![Command::StartScan { bands }]);
        let _ = rig.drain_events();

        feed(&mut rig, &mut scanner, network("a", 6), ListFlags::FIRST);
        feed(&mut rig, &mut scanner, network("b", 6), ListFlags::NONE);
        feed(&mut rig, &mut scanner, network("c", 11), ListFlags::LAST);

        let events = rig.drain_events();
        assert_eq!(events.len(), 1);
        let ComponentEvent::Updated(Component::WifiScanner(state)) = &events[0] else {
            panic!("unexpected {:?}", events[0]);
        };
        let ssids: Vec<&str> = state.networks.iter().map(|n| n.ssid.as_str()).collect();
        assert_eq!(ssids, vec!["a", "b", "c"]);

        let handle = WifiScannerHandle::new(&mut scanner, rig.ctx());
        assert_eq!(handle.occupation(network("", 6).channel), 2);
        assert_eq!(handle.occupation(network("", 11).channel), 1);
        assert_eq!(handle.occupation(network("", 1).channel), 0);
        assert_eq!(rig.drain_commands(), vec![Command::StartScan { bands }]);
    }

    #[test]
    fn test_stop_clears_results() {
        let mut rig = Rig::new();
        let mut scanner = connected(&mut rig);
        assert!(WifiScannerHandle::new(&mut scanner, rig.ctx()).start_scan());
        feed(&mut rig, &mut scanner, network("a", 6), ListFlags::FIRST | ListFlags::LAST);

        let mut handle = WifiScannerHandle::new(&mut scanner, rig.ctx());
        assert!(handle.stop_scan());
        assert!(!handle.is_scanning());
        assert!(handle.networks().is_empty());
        assert!(!handle.stop_scan());
    }

    #[test]
    fn test_disconnect_unpublishes() {
        let mut rig = Rig::new();
        let mut scanner = connected(&mut rig);
        assert!(rig.components.is_published(ID));
        rig.host.set_connected(false);
        let mut ctx = rig.ctx();
        scanner.on_disconnected(&mut ctx);
        scanner.flush(&mut ctx);
        assert!(!rig.components.is_published(ID));
    }

    #[test]
    fn test_disconnect_mid_sweep_records_change() {
        let mut rig = Rig::new();
        let mut scanner = connected(&mut rig);
        assert!(WifiScannerHandle::new(&mut scanner, rig.ctx()).start_scan());
        feed(&mut rig, &mut scanner, network("a", 6), ListFlags::FIRST);
        assert!(!scanner.notifier().is_dirty());

        rig.host.set_connected(false);
        scanner.on_disconnected(&mut rig.ctx());
        assert!(scanner.notifier().is_dirty());
        assert!(scanner.state().networks.is_empty());
    }
}
