//! Drives a controller against a simulated device.

use crate::device::{DeviceProfile, SimulatedDevice};
use crate::error::{SimError, SimResult};
use crate::link::LossyLink;
use crate::scenario::{lookup, Expectation, Scenario, Step, UserAction};
use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use serde::Serialize;
use setsync_peripheral::{Component, ComponentEvent, ComponentId, DeviceConfig, DeviceController};
use setsync_protocol::{Command, Event};
use setsync_store::PersistentStore;
use tracing::{debug, info, warn};

/// Upper bound on command/report exchanges per step.
const MAX_PUMP_ROUNDS: usize = 64;

/// Summary of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: usize,
    pub commands_sent: u64,
    pub commands_delivered: u64,
    pub commands_dropped: u64,
    pub notifications: usize,
    /// Components published at the end of the run.
    pub components: Vec<Component>,
}

impl std::fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "scenario: {} (seed {})", self.name, self.seed)?;
        writeln!(f, "  steps:         {}", self.steps)?;
        writeln!(
            f,
            "  commands:      {} sent, {} delivered, {} dropped",
            self.commands_sent, self.commands_delivered, self.commands_dropped
        )?;
        writeln!(f, "  notifications: {}", self.notifications)?;
        let ids: Vec<String> = self.components.iter().map(|c| c.id().to_string()).collect();
        writeln!(f, "  published:     [{}]", ids.join(", "))?;
        write!(
            f,
            "  duration:      {} ms",
            (self.finished_at - self.started_at).num_milliseconds()
        )
    }
}

/// One controller wired to one simulated device through a lossy link.
///
/// Every step pumps the command queue until the device has nothing left to
/// answer.
#[derive(Debug)]
pub struct ScenarioRunner {
    controller: DeviceController,
    device: SimulatedDevice,
    link: LossyLink,
    connected: bool,
    commands: Receiver<Command>,
    notifications: Receiver<ComponentEvent>,
    log: Vec<ComponentEvent>,
}

impl ScenarioRunner {
    /// Wire a controller for `config` to a device in the state `profile`.
    pub fn new(config: DeviceConfig, profile: DeviceProfile, link: LossyLink, store: PersistentStore) -> Self {
        let (tx, commands) = crossbeam_channel::unbounded();
        let mut controller = DeviceController::new(config, tx, store);
        let notifications = controller.subscribe();
        Self {
            controller,
            device: SimulatedDevice::new(profile),
            link,
            connected: false,
            commands,
            notifications,
            log: Vec::new(),
        }
    }

    /// Runner for `scenario`, with the link seeded from it.
    pub fn from_scenario(scenario: &Scenario, store: PersistentStore) -> SimResult<Self> {
        let link = LossyLink::new(scenario.seed, scenario.drop_rate)?;
        Ok(Self::new(
            scenario.device.clone(),
            scenario.profile.clone(),
            link,
            store,
        ))
    }

    /// The controller under test.
    pub fn controller(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    /// The simulated device.
    pub fn device(&self) -> &SimulatedDevice {
        &self.device
    }

    /// The link between them.
    pub fn link(&self) -> &LossyLink {
        &self.link
    }

    /// Every component notification observed so far.
    pub fn notifications(&mut self) -> &[ComponentEvent] {
        self.collect_notifications();
        &self.log
    }

    /// The published snapshot of `id`.
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.controller.component(id)
    }

    /// Hand back the persistent store.
    pub fn store(&self) -> &PersistentStore {
        self.controller.store()
    }

    /// Bring the link up and let the device dump its state.
    pub fn connect(&mut self) {
        self.connected = true;
        self.controller.on_connected();
        let dump = self.device.state_dump();
        self.feed(&dump);
        self.pump();
    }

    /// Take the link down. Queued commands are lost.
    pub fn disconnect(&mut self) {
        self.controller.on_disconnected();
        self.connected = false;
        self.discard_in_flight();
    }

    /// Abandon the connection.
    pub fn cancel_connection(&mut self) {
        self.controller.on_connection_canceled();
        self.connected = false;
        self.discard_in_flight();
    }

    /// Deliver the results of a pending scan request.
    pub fn sweep(&mut self) {
        let events = self.device.take_sweep();
        self.feed(&events);
        self.pump();
    }

    /// Change the device on its own. The device reports the change if the
    /// link is up.
    pub fn device_change(&mut self, event: Event) {
        if !self.device.apply(&event) {
            warn!("ScenarioRunner: device cannot apply {}", event.name());
            return;
        }
        self.feed(std::slice::from_ref(&event));
        self.pump();
    }

    /// Perform a user call. Returns what the call returned.
    pub fn perform(&mut self, step: usize, action: &UserAction) -> SimResult<bool> {
        let not_published = || SimError::NotPublished {
            step,
            component: action.component().to_string(),
        };
        let result = match action.component() {
            ComponentId::ThermalControl => {
                let mut thermal = self.controller.thermal_control().ok_or_else(not_published)?;
                match action {
                    UserAction::ThermalMode { mode } => thermal.set_mode(*mode),
                    UserAction::ThermalSensitivity { sensitivity } => thermal.set_sensitivity(*sensitivity),
                    UserAction::CalibrationMode { mode } => thermal.set_calibration_mode(*mode),
                    UserAction::Calibrate => thermal.calibrate(),
                    UserAction::Emissivity { value } => thermal.set_emissivity(*value),
                    UserAction::BackgroundTemperature { kelvin } => thermal.set_background_temperature(*kelvin),
                    UserAction::Palette { colors } => thermal.send_palette(colors.clone()),
                    UserAction::PaletteSettings { settings } => thermal.set_palette_settings(*settings),
                    UserAction::Rendering { rendering } => thermal.set_rendering(*rendering),
                    UserAction::ForgetThermal => {
                        thermal.forget();
                        true
                    }
                    _ => false,
                }
            }
            ComponentId::WifiAccessPoint => {
                let mut access_point = self.controller.wifi_access_point().ok_or_else(not_published)?;
                match action {
                    UserAction::Environment { environment } => access_point.set_environment(*environment),
                    UserAction::Country { code } => access_point.set_country(code),
                    UserAction::Ssid { ssid } => access_point.set_ssid(ssid),
                    UserAction::OpenSecurity => access_point.set_open(),
                    UserAction::Wpa2 { password } => access_point.secure_with_wpa2(password),
                    UserAction::Channel { channel } => access_point.select_channel(*channel),
                    UserAction::AutoChannel { band } => access_point.auto_select_channel(*band),
                    _ => false,
                }
            }
            ComponentId::WifiScanner => {
                let mut scanner = self.controller.wifi_scanner().ok_or_else(not_published)?;
                match action {
                    UserAction::StartScan => scanner.start_scan(),
                    UserAction::StopScan => scanner.stop_scan(),
                    _ => false,
                }
            }
        };
        debug!("ScenarioRunner: step {} {:?} -> {}", step, action, result);
        self.pump();
        Ok(result)
    }

    /// Check an expectation against the published state.
    pub fn check(&self, step: usize, expectation: &Expectation) -> SimResult<()> {
        let fail = |message: String| SimError::Expectation { step, message };
        let component = self.controller.component(expectation.component);
        let component = match (component, expectation.published) {
            (None, false) => return Ok(()),
            (Some(_), false) => {
                return Err(fail(format!("{} is published", expectation.component)));
            }
            (None, true) => {
                return Err(fail(format!("{} is not published", expectation.component)));
            }
            (Some(component), true) => component,
        };
        let (Some(path), Some(expected)) = (&expectation.path, &expectation.equals) else {
            return Ok(());
        };
        let snapshot = serde_json::to_value(component)?;
        match lookup(&snapshot, path) {
            Some(actual) if json_eq(actual, expected) => Ok(()),
            Some(actual) => Err(fail(format!(
                "{}.{}: expected {}, found {}",
                expectation.component, path, expected, actual
            ))),
            None => Err(fail(format!("{}.{}: no such field", expectation.component, path))),
        }
    }

    /// Run one step.
    pub fn step(&mut self, index: usize, step: &Step) -> SimResult<()> {
        match step {
            Step::Connect => self.connect(),
            Step::Disconnect => self.disconnect(),
            Step::CancelConnection => self.cancel_connection(),
            Step::Sweep => self.sweep(),
            Step::User(action) => {
                self.perform(index, action)?;
            }
            Step::DeviceChange(event) => self.device_change(event.clone()),
            Step::Expect(expectation) => self.check(index, expectation)?,
        }
        Ok(())
    }

    /// Run every step of `scenario`, stopping at the first failure.
    pub fn run(&mut self, scenario: &Scenario) -> SimResult<ScenarioReport> {
        let started_at = Utc::now();
        info!("ScenarioRunner: running '{}' ({} steps)", scenario.name, scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            self.step(index, step)?;
        }
        self.collect_notifications();
        Ok(ScenarioReport {
            name: scenario.name.clone(),
            seed: scenario.seed,
            started_at,
            finished_at: Utc::now(),
            steps: scenario.steps.len(),
            commands_sent: self.controller.commands_sent(),
            commands_delivered: self.link.delivered(),
            commands_dropped: self.link.dropped(),
            notifications: self.log.len(),
            components: self.controller.components().cloned().collect(),
        })
    }

    fn feed(&mut self, events: &[Event]) {
        if !self.connected {
            return;
        }
        for event in events {
            self.controller.on_event(event);
        }
    }

    /// Exchange commands and reports until the device goes quiet.
    fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let batch: Vec<Command> = self.commands.try_iter().collect();
            if batch.is_empty() {
                self.collect_notifications();
                return;
            }
            for command in batch {
                if !self.connected || !self.link.transmit() {
                    continue;
                }
                let events = self.device.handle(&command);
                self.feed(&events);
            }
        }
        warn!("ScenarioRunner: device still busy after {} rounds", MAX_PUMP_ROUNDS);
        self.collect_notifications();
    }

    fn discard_in_flight(&mut self) {
        let lost = self.commands.try_iter().count();
        if lost > 0 {
            debug!("ScenarioRunner: {} commands lost with the link", lost);
        }
        self.collect_notifications();
    }

    fn collect_notifications(&mut self) {
        self.log.extend(self.notifications.try_iter());
    }
}

/// JSON equality, with numbers compared as `f64` so that `0.5` written in a
/// scenario matches an `f32` snapshot field.
fn json_eq(actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() < 1e-6,
        _ => actual == expected,
    }
}
