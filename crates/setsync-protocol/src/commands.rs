//! Commands that can be sent to the device.

use crate::flags::ListFlags;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Commands that can be sent to the device.
///
/// Every command is fire-and-forget: the device answers, if at all, through
/// the event feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Set the thermal camera mode.
    SetThermalMode {
        /// Requested mode.
        mode: ThermalMode,
    },

    /// Set the thermal camera sensitivity range.
    SetThermalSensitivity {
        /// Requested range.
        sensitivity: ThermalSensitivity,
    },

    /// Set the shutter calibration mode.
    SetCalibrationMode {
        /// Requested mode.
        mode: CalibrationMode,
    },

    /// Trigger a shutter calibration now.
    TriggerCalibration,

    /// Set the emissivity.
    SetEmissivity {
        /// Emissivity in `0.0..=1.0`.
        value: f32,
    },

    /// Set the background temperature.
    SetBackgroundTemperature {
        /// Temperature in Kelvin.
        kelvin: f32,
    },

    /// Upload one color stop of the palette.
    SetPalettePart {
        /// Color stop. Zeroed when `flags` carries `EMPTY`.
        color: PaletteColor,
        /// List framing.
        flags: ListFlags,
    },

    /// Set how the palette maps onto temperatures.
    SetPaletteSettings {
        /// Requested mapping.
        settings: PaletteSettings,
    },

    /// Set the thermal stream rendering.
    SetRendering {
        /// Requested rendering.
        rendering: Rendering,
    },

    /// Set the access point environment.
    SetEnvironment {
        /// Requested environment.
        environment: Environment,
    },

    /// Set the access point country.
    SetCountry {
        /// ISO 3166-1 alpha-2 code.
        code: String,
    },

    /// Set the access point SSID.
    SetSsid {
        /// Network name.
        ssid: String,
    },

    /// Set how the access point channel is chosen.
    SetApChannel {
        /// Requested selection.
        selection: ChannelSelection,
    },

    /// Set the access point security.
    SetSecurity {
        /// Requested mode.
        mode: SecurityMode,
        /// Passphrase, empty for [`SecurityMode::Open`].
        password: String,
    },

    /// Ask the device to report its authorized channels again.
    UpdateAuthorizedChannels,

    /// Run one wifi scan sweep.
    StartScan {
        /// Bitfield of [`Band`] values to scan.
        bands: u64,
    },
}

impl Command {
    /// Short command name, used in logs and metric labels.
    pub const fn name(&self) -> &'static str {
        match self {
            Command::SetThermalMode { .. } => "set_thermal_mode",
            Command::SetThermalSensitivity { .. } => "set_thermal_sensitivity",
            Command::SetCalibrationMode { .. } => "set_calibration_mode",
            Command::TriggerCalibration => "trigger_calibration",
            Command::SetEmissivity { .. } => "set_emissivity",
            Command::SetBackgroundTemperature { .. } => "set_background_temperature",
            Command::SetPalettePart { .. } => "set_palette_part",
            Command::SetPaletteSettings { .. } => "set_palette_settings",
            Command::SetRendering { .. } => "set_rendering",
            Command::SetEnvironment { .. } => "set_environment",
            Command::SetCountry { .. } => "set_country",
            Command::SetSsid { .. } => "set_ssid",
            Command::SetApChannel { .. } => "set_ap_channel",
            Command::SetSecurity { .. } => "set_security",
            Command::UpdateAuthorizedChannels => "update_authorized_channels",
            Command::StartScan { .. } => "start_scan",
        }
    }

    /// The setting this command changes, if any.
    pub const fn setting_id(&self) -> Option<SettingId> {
        match self {
            Command::SetThermalMode { .. } => Some(SettingId::ThermalMode),
            Command::SetThermalSensitivity { .. } => Some(SettingId::ThermalSensitivity),
            Command::SetCalibrationMode { .. } => Some(SettingId::ThermalCalibrationMode),
            Command::SetEmissivity { .. } => Some(SettingId::ThermalEmissivity),
            Command::SetBackgroundTemperature { .. } => Some(SettingId::ThermalBackgroundTemperature),
            Command::SetPalettePart { .. } => Some(SettingId::ThermalPalette),
            Command::SetPaletteSettings { .. } => Some(SettingId::ThermalPaletteSettings),
            Command::SetRendering { .. } => Some(SettingId::ThermalRendering),
            Command::SetEnvironment { .. } => Some(SettingId::WifiEnvironment),
            Command::SetCountry { .. } => Some(SettingId::WifiCountry),
            Command::SetSsid { .. } => Some(SettingId::WifiSsid),
            Command::SetApChannel { .. } => Some(SettingId::WifiChannel),
            Command::SetSecurity { .. } => Some(SettingId::WifiSecurity),
            Command::TriggerCalibration | Command::UpdateAuthorizedChannels | Command::StartScan { .. } => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::SetThermalMode { mode } => write!(f, "set_thermal_mode({:?})", mode),
            Command::SetThermalSensitivity { sensitivity } => {
                write!(f, "set_thermal_sensitivity({:?})", sensitivity)
            }
            Command::SetCalibrationMode { mode } => write!(f, "set_calibration_mode({:?})", mode),
            Command::SetEmissivity { value } => write!(f, "set_emissivity({})", value),
            Command::SetBackgroundTemperature { kelvin } => {
                write!(f, "set_background_temperature({}K)", kelvin)
            }
            Command::SetPalettePart { color, flags } => {
                write!(f, "set_palette_part(pos={}, {})", color.position, flags)
            }
            Command::SetPaletteSettings { settings } => {
                write!(f, "set_palette_settings({:?})", settings.mode)
            }
            Command::SetRendering { rendering } => {
                write!(f, "set_rendering({:?}, {})", rendering.mode, rendering.blending_rate)
            }
            Command::SetEnvironment { environment } => write!(f, "set_environment({:?})", environment),
            Command::SetCountry { code } => write!(f, "set_country({})", code),
            Command::SetSsid { ssid } => write!(f, "set_ssid({})", ssid),
            Command::SetApChannel { selection } => write!(f, "set_ap_channel({:?})", selection),
            // never log the passphrase
            Command::SetSecurity { mode, .. } => write!(f, "set_security({:?})", mode),
            Command::StartScan { bands } => write!(f, "start_scan(bands=0x{:02X})", bands),
            other => f.write_str(other.name()),
        }
    }
}
