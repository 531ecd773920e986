//! Scenario files.
//!
//! A scenario describes a device, the controller configuration, and a
//! sequence of steps driving both sides:
//!
//! ```yaml
//! name: thermal preset survives reconnect
//! seed: 7
//! device:
//!   uid: anafi-01
//! profile:
//!   thermal_mode: standard
//! steps:
//!   - connect
//!   - disconnect
//!   - user: { action: thermal_mode, mode: blended }
//!   - connect
//!   - expect: { component: thermal_control, path: mode.value, equals: blended }
//! ```

use crate::device::DeviceProfile;
use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use setsync_peripheral::{ComponentId, DeviceConfig};
use setsync_protocol::{
    Band, CalibrationMode, Channel, Environment, Event, PaletteColor, PaletteSettings, Rendering,
    ThermalMode, ThermalSensitivity,
};
use std::path::Path;

/// A scripted session between a controller and a simulated device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Human readable name.
    pub name: String,
    /// Seed of the lossy link.
    #[serde(default)]
    pub seed: u64,
    /// Probability of losing each command.
    #[serde(default)]
    pub drop_rate: f64,
    /// Controller side configuration.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Simulated device state and capabilities.
    #[serde(default)]
    pub profile: DeviceProfile,
    /// What happens, in order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a YAML scenario.
    pub fn from_yaml(text: &str) -> SimResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a YAML scenario file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}

/// One scenario step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Bring the link up. The device dumps its state.
    Connect,
    /// Take the link down. Commands in flight are lost.
    Disconnect,
    /// Abandon the connection.
    CancelConnection,
    /// Let the device answer a pending scan request.
    Sweep,
    /// A user call on a controller component.
    User(UserAction),
    /// The device changes a value on its own and reports it.
    DeviceChange(Event),
    /// Check the published state.
    Expect(Expectation),
}

/// User calls available to scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UserAction {
    ThermalMode { mode: ThermalMode },
    ThermalSensitivity { sensitivity: ThermalSensitivity },
    CalibrationMode { mode: CalibrationMode },
    Calibrate,
    Emissivity { value: f32 },
    BackgroundTemperature { kelvin: f32 },
    Palette { colors: Vec<PaletteColor> },
    PaletteSettings { settings: PaletteSettings },
    Rendering { rendering: Rendering },
    ForgetThermal,
    Environment { environment: Environment },
    Country { code: String },
    Ssid { ssid: String },
    OpenSecurity,
    Wpa2 { password: String },
    Channel { channel: Channel },
    AutoChannel {
        #[serde(default)]
        band: Option<Band>,
    },
    StartScan,
    StopScan,
}

impl UserAction {
    /// The component the action is performed on.
    pub fn component(&self) -> ComponentId {
        match self {
            UserAction::ThermalMode { .. }
            | UserAction::ThermalSensitivity { .. }
            | UserAction::CalibrationMode { .. }
            | UserAction::Calibrate
            | UserAction::Emissivity { .. }
            | UserAction::BackgroundTemperature { .. }
            | UserAction::Palette { .. }
            | UserAction::PaletteSettings { .. }
            | UserAction::Rendering { .. }
            | UserAction::ForgetThermal => ComponentId::ThermalControl,
            UserAction::Environment { .. }
            | UserAction::Country { .. }
            | UserAction::Ssid { .. }
            | UserAction::OpenSecurity
            | UserAction::Wpa2 { .. }
            | UserAction::Channel { .. }
            | UserAction::AutoChannel { .. } => ComponentId::WifiAccessPoint,
            UserAction::StartScan | UserAction::StopScan => ComponentId::WifiScanner,
        }
    }
}

fn published_by_default() -> bool {
    true
}

/// Assertion on a published component.
///
/// With `published: false` the component must be absent. Otherwise the
/// snapshot is serialized to JSON and the value at the dotted `path`
/// compared with `equals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub component: ComponentId,
    #[serde(default = "published_by_default")]
    pub published: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub equals: Option<serde_json::Value>,
}

/// Look up a dotted path (`mode.value`, `palette.0.position`) in a JSON
/// value.
pub fn lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(segment),
        })
}
