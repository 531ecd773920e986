//! Simulated remote device.

use serde::{Deserialize, Serialize};
use setsync_core::{IncrementalListAssembler, ListUploader, Marker, SettingEnum};
use setsync_protocol::{
    AuthorizedChannel, Band, CalibrationMode, Channel, ChannelSelection, Command, Environment,
    Event, ListFlags, PaletteColor, PaletteSettings, Rendering, ScannedNetwork, SecurityMode, SettingId, ThermalMode,
    ThermalSensitivity, CHANNEL_2_4_GHZ_MIN, COUNTRY_CODE_SEPARATOR, EMISSIVITY_MAX,
    EMISSIVITY_MIN,
};
use std::fmt::Debug;
use tracing::{debug, trace};

// ============================================================================
// Device Profile
// ============================================================================

/// State and capabilities of a simulated device.
///
/// Loaded from the `profile` section of a scenario; missing fields take the
/// defaults of a typical drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Supported thermal modes. Empty for a device without a thermal camera.
    pub thermal_modes: Vec<ThermalMode>,
    pub thermal_mode: ThermalMode,
    pub sensitivity: ThermalSensitivity,
    /// `None` for firmware that does not report a calibration mode.
    pub calibration_mode: Option<CalibrationMode>,
    pub emissivity: f32,
    /// Kelvin.
    pub background_temperature: f32,
    pub palette: Vec<PaletteColor>,
    pub palette_settings: PaletteSettings,
    /// Last rendering requested; never reported back.
    pub rendering: Option<Rendering>,
    pub environment: Environment,
    pub countries: Vec<String>,
    pub country: String,
    pub automatic_country: bool,
    pub security_modes: Vec<SecurityMode>,
    pub security: SecurityMode,
    pub ssid: String,
    pub channel: ChannelSelection,
    pub authorized_channels: Vec<AuthorizedChannel>,
    /// Networks a scan sweep reports.
    pub networks: Vec<ScannedNetwork>,
    /// Settings whose commands are answered with the unchanged value.
    pub locked: Vec<SettingId>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        let both = Environment::to_bitfield(Environment::VARIANTS);
        let authorized_channels = [
            (Band::Band2_4Ghz, 1, both),
            (Band::Band2_4Ghz, 6, both),
            (Band::Band2_4Ghz, 11, both),
            (Band::Band5Ghz, 36, Environment::Indoor.bit()),
            (Band::Band5Ghz, 149, both),
        ]
        .into_iter()
        .filter_map(|(band, id, environments)| {
            Channel::new(band, id)
                .ok()
                .map(|channel| AuthorizedChannel { channel, environments })
        })
        .collect();

        Self {
            thermal_modes: ThermalMode::VARIANTS.to_vec(),
            thermal_mode: ThermalMode::Disabled,
            sensitivity: ThermalSensitivity::HighRange,
            calibration_mode: Some(CalibrationMode::Automatic),
            emissivity: 0.95,
            background_temperature: 293.15,
            palette: Vec::new(),
            palette_settings: PaletteSettings::default(),
            rendering: None,
            environment: Environment::Indoor,
            countries: vec!["DE".to_string(), "FR".to_string(), "US".to_string()],
            country: "FR".to_string(),
            automatic_country: false,
            security_modes: SecurityMode::VARIANTS.to_vec(),
            security: SecurityMode::Wpa2Secured,
            ssid: "setsync-sim".to_string(),
            channel: ChannelSelection::Auto(None),
            authorized_channels,
            networks: Vec::new(),
            locked: Vec::new(),
        }
    }
}

// ============================================================================
// Simulated Device
// ============================================================================

/// Answers commands the way a real device does: each accepted command
/// changes the device state and is acknowledged by a report of the new
/// value.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    state: DeviceProfile,
    password: String,
    palette_upload: IncrementalListAssembler<PaletteColor, u32>,
    sweep_requested: bool,
    commands_handled: u64,
}

/// Frame `items` as a list transmission, one event per message.
fn framed<T, F>(items: &[T], mut wrap: F) -> Vec<Event>
where
    T: Clone + PartialEq + Debug,
    F: FnMut(Option<&T>, ListFlags) -> Option<Event>,
{
    let mut events = Vec::new();
    ListUploader::new().push(items, |item, marker| {
        events.extend(wrap(item, ListFlags::from(marker)));
    });
    events
}

/// Any valid channel, to fill `EMPTY` messages.
fn placeholder_channel() -> Option<Channel> {
    Channel::new(Band::Band2_4Ghz, CHANNEL_2_4_GHZ_MIN).ok()
}

impl SimulatedDevice {
    /// Device starting in the state described by `profile`.
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            state: profile,
            password: String::new(),
            palette_upload: IncrementalListAssembler::sorted(
                |color: &PaletteColor| color.position.to_bits(),
                PaletteColor::cmp,
            ),
            sweep_requested: false,
            commands_handled: 0,
        }
    }

    /// Current device state.
    pub fn state(&self) -> &DeviceProfile {
        &self.state
    }

    /// Passphrase last accepted for WPA2.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Number of commands received.
    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }

    /// Everything the device reports right after connecting.
    pub fn state_dump(&self) -> Vec<Event> {
        let state = &self.state;
        let mut events = Vec::new();
        if !state.thermal_modes.is_empty() {
            events.push(Event::ThermalCapabilities {
                modes: ThermalMode::to_bitfield(&state.thermal_modes),
            });
            events.push(Event::ThermalMode { mode: state.thermal_mode });
            events.push(Event::ThermalSensitivity { sensitivity: state.sensitivity });
            if let Some(mode) = state.calibration_mode {
                events.push(Event::CalibrationMode { mode });
            }
            events.push(Event::Emissivity { value: state.emissivity });
            events.push(Event::BackgroundTemperature { kelvin: state.background_temperature });
            events.extend(self.palette_report());
            events.push(Event::PaletteSettings { settings: state.palette_settings });
        }
        events.push(Event::SupportedCountries {
            codes: state.countries.join(&COUNTRY_CODE_SEPARATOR.to_string()),
        });
        events.push(self.country_report());
        events.push(Event::Environment { environment: state.environment });
        events.push(Event::SupportedSecurityModes {
            modes: SecurityMode::to_bitfield(&state.security_modes),
        });
        events.push(Event::Security { mode: state.security });
        events.push(Event::Ssid { ssid: state.ssid.clone() });
        events.push(Event::ApChannel { selection: state.channel });
        events
    }

    /// Handle one command, returning the reports it triggers.
    pub fn handle(&mut self, command: &Command) -> Vec<Event> {
        self.commands_handled += 1;
        if let Some(setting) = command.setting_id() {
            if self.state.locked.contains(&setting) {
                debug!("SimulatedDevice: {} locked, ignoring {}", setting, command);
                return self.report(setting);
            }
        }
        trace!("SimulatedDevice: handling {}", command);

        let state = &mut self.state;
        match command {
            Command::SetThermalMode { mode } => {
                if state.thermal_modes.contains(mode) {
                    state.thermal_mode = *mode;
                }
                self.report(SettingId::ThermalMode)
            }
            Command::SetThermalSensitivity { sensitivity } => {
                state.sensitivity = *sensitivity;
                self.report(SettingId::ThermalSensitivity)
            }
            Command::SetCalibrationMode { mode } => {
                state.calibration_mode = Some(*mode);
                self.report(SettingId::ThermalCalibrationMode)
            }
            Command::TriggerCalibration => Vec::new(),
            Command::SetEmissivity { value } => {
                state.emissivity = (*value).clamp(EMISSIVITY_MIN, EMISSIVITY_MAX);
                self.report(SettingId::ThermalEmissivity)
            }
            Command::SetBackgroundTemperature { kelvin } => {
                state.background_temperature = *kelvin;
                self.report(SettingId::ThermalBackgroundTemperature)
            }
            Command::SetPalettePart { color, flags } => {
                let marker = flags.marker();
                let item = (marker != Marker::Empty).then_some(*color);
                if self.palette_upload.process(item, marker) && !self.palette_upload.is_capturing() {
                    self.state.palette = self.palette_upload.committed().to_vec();
                    return self.report(SettingId::ThermalPalette);
                }
                Vec::new()
            }
            Command::SetPaletteSettings { settings } => {
                state.palette_settings = *settings;
                self.report(SettingId::ThermalPaletteSettings)
            }
            Command::SetRendering { rendering } => {
                state.rendering = Some(*rendering);
                Vec::new()
            }
            Command::SetEnvironment { environment } => {
                state.environment = *environment;
                self.report(SettingId::WifiEnvironment)
            }
            Command::SetCountry { code } => {
                if state.countries.contains(code) {
                    state.country = code.clone();
                    state.automatic_country = false;
                }
                self.report(SettingId::WifiCountry)
            }
            Command::SetSsid { ssid } => {
                state.ssid = ssid.clone();
                self.report(SettingId::WifiSsid)
            }
            Command::SetApChannel { selection } => {
                state.channel = *selection;
                self.report(SettingId::WifiChannel)
            }
            Command::SetSecurity { mode, password } => {
                if state.security_modes.contains(mode) {
                    state.security = *mode;
                    self.password = password.clone();
                }
                self.report(SettingId::WifiSecurity)
            }
            Command::UpdateAuthorizedChannels => self.report(SettingId::WifiAuthorizedChannels),
            Command::StartScan { .. } => {
                self.sweep_requested = true;
                Vec::new()
            }
        }
    }

    /// Results of the requested scan sweep, if one was requested since the
    /// last call.
    pub fn take_sweep(&mut self) -> Vec<Event> {
        if !std::mem::take(&mut self.sweep_requested) {
            return Vec::new();
        }
        self.report(SettingId::WifiScanResults)
    }

    /// Change the device state on its own, as a user on the device side or
    /// the firmware would. Returns whether the event describes a change the
    /// device can make; the event is then what it reports.
    pub fn apply(&mut self, event: &Event) -> bool {
        let state = &mut self.state;
        match event {
            Event::ThermalMode { mode } => state.thermal_mode = *mode,
            Event::ThermalSensitivity { sensitivity } => state.sensitivity = *sensitivity,
            Event::CalibrationMode { mode } => state.calibration_mode = Some(*mode),
            Event::Emissivity { value } => state.emissivity = *value,
            Event::BackgroundTemperature { kelvin } => state.background_temperature = *kelvin,
            Event::PaletteSettings { settings } => state.palette_settings = *settings,
            Event::Environment { environment } => state.environment = *environment,
            Event::Country { code, automatic } => {
                state.country = code.clone();
                state.automatic_country = *automatic;
            }
            Event::Security { mode } => state.security = *mode,
            Event::Ssid { ssid } => state.ssid = ssid.clone(),
            Event::ApChannel { selection } => state.channel = *selection,
            _ => return false,
        }
        true
    }

    /// Report the current value of `setting`.
    fn report(&self, setting: SettingId) -> Vec<Event> {
        let state = &self.state;
        match setting {
            SettingId::ThermalMode => vec![Event::ThermalMode { mode: state.thermal_mode }],
            SettingId::ThermalSensitivity => {
                vec![Event::ThermalSensitivity { sensitivity: state.sensitivity }]
            }
            SettingId::ThermalCalibrationMode => state
                .calibration_mode
                .map(|mode| Event::CalibrationMode { mode })
                .into_iter()
                .collect(),
            SettingId::ThermalEmissivity => vec![Event::Emissivity { value: state.emissivity }],
            SettingId::ThermalBackgroundTemperature => {
                vec![Event::BackgroundTemperature { kelvin: state.background_temperature }]
            }
            SettingId::ThermalPalette => self.palette_report(),
            SettingId::ThermalPaletteSettings => {
                vec![Event::PaletteSettings { settings: state.palette_settings }]
            }
            SettingId::ThermalRendering => Vec::new(),
            SettingId::WifiEnvironment => vec![Event::Environment { environment: state.environment }],
            SettingId::WifiCountry => vec![self.country_report()],
            SettingId::WifiSsid => vec![Event::Ssid { ssid: state.ssid.clone() }],
            SettingId::WifiSecurity => vec![Event::Security { mode: state.security }],
            SettingId::WifiChannel => vec![Event::ApChannel { selection: state.channel }],
            SettingId::WifiAuthorizedChannels => framed(&state.authorized_channels, |item, flags| {
                let channel = match item {
                    Some(channel) => *channel,
                    None => AuthorizedChannel {
                        channel: placeholder_channel()?,
                        environments: 0,
                    },
                };
                Some(Event::AuthorizedChannel { channel, flags })
            }),
            SettingId::WifiScanResults => framed(&state.networks, |item, flags| {
                let network = match item {
                    Some(network) => network.clone(),
                    None => ScannedNetwork {
                        ssid: String::new(),
                        rssi: 0,
                        channel: placeholder_channel()?,
                    },
                };
                Some(Event::ScannedItem { network, flags })
            }),
        }
    }

    fn palette_report(&self) -> Vec<Event> {
        framed(&self.state.palette, |item, flags| {
            let color = item.copied().unwrap_or(PaletteColor::new(0.0, 0.0, 0.0, 0.0));
            Some(Event::PalettePart { color, flags })
        })
    }

    fn country_report(&self) -> Event {
        Event::Country {
            code: self.state.country.clone(),
            automatic: self.state.automatic_country,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_command_is_acknowledged() {
        let mut device = SimulatedDevice::new(DeviceProfile::default());
        let events = device.handle(&Command::SetThermalMode { mode: ThermalMode::Blended });
        assert_eq!(events, vec![Event::ThermalMode { mode: ThermalMode::Blended }]);
        assert_eq!(device.state().thermal_mode, ThermalMode::Blended);
    }

    #[test]
    fn test_locked_setting_reports_unchanged_value() {
        let profile = DeviceProfile {
            locked: vec![SettingId::ThermalMode],
            ..DeviceProfile::default()
        };
        let mut device = SimulatedDevice::new(profile);
        let events = device.handle(&Command::SetThermalMode { mode: ThermalMode::Standard });
        assert_eq!(events, vec![Event::ThermalMode { mode: ThermalMode::Disabled }]);
    }

    #[test]
    fn test_palette_upload_reported_back_once_complete() {
        let mut device = SimulatedDevice::new(DeviceProfile::default());
        let a = PaletteColor::new(1.0, 0.0, 0.0, 1.0);
        let b = PaletteColor::new(0.0, 0.0, 1.0, 0.0);
        assert!(device
            .handle(&Command::SetPalettePart { color: a, flags: ListFlags::FIRST })
            .is_empty());
        let events = device.handle(&Command::SetPalettePart { color: b, flags: ListFlags::LAST });
        assert_eq!(
            events,
            vec![
                Event::PalettePart { color: b, flags: ListFlags::FIRST },
                Event::PalettePart { color: a, flags: ListFlags::LAST },
            ]
        );
    }

    #[test]
    fn test_rendering_is_not_acknowledged() {
        let mut device = SimulatedDevice::new(DeviceProfile::default());
        let settings = PaletteSettings::relative(280.0, 320.0, true);
        let events = device.handle(&Command::SetPaletteSettings { settings });
        assert_eq!(events, vec![Event::PaletteSettings { settings }]);

        let rendering = Rendering::new(setsync_protocol::RenderingMode::Thermal, 0.0);
        assert!(device.handle(&Command::SetRendering { rendering }).is_empty());
        assert_eq!(device.state().rendering, Some(rendering));
    }

    #[test]
    fn test_empty_scan_reports_empty_marker() {
        let mut device = SimulatedDevice::new(DeviceProfile::default());
        assert!(device.take_sweep().is_empty());
        device.handle(&Command::StartScan { bands: 0b11 });
        let events = device.take_sweep();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].list_flags(), Some(ListFlags::EMPTY));
    }

    #[test]
    fn test_state_dump_lists_countries_before_country() {
        let device = SimulatedDevice::new(DeviceProfile::default());
        let events = device.state_dump();
        let position = |name: &str| events.iter().position(|e| e.name() == name);
        assert!(position("supported_countries") < position("country"));
        assert_eq!(position("thermal_capabilities"), Some(0));
    }
}
