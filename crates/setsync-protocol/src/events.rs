//! Decoded events reported by the device.

use crate::flags::ListFlags;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// State reports decoded from the device.
///
/// Devices send these spontaneously, in answer to commands, and as a full
/// state dump right after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Thermal modes the device supports.
    ThermalCapabilities {
        /// Bitfield of [`ThermalMode`] values.
        modes: u64,
    },

    /// Current thermal mode.
    ThermalMode {
        /// The mode.
        mode: ThermalMode,
    },

    /// Current thermal sensitivity range.
    ThermalSensitivity {
        /// The range.
        sensitivity: ThermalSensitivity,
    },

    /// Current shutter calibration mode.
    CalibrationMode {
        /// The mode.
        mode: CalibrationMode,
    },

    /// Current emissivity.
    Emissivity {
        /// Emissivity in `0.0..=1.0`.
        value: f32,
    },

    /// Current background temperature.
    BackgroundTemperature {
        /// Temperature in Kelvin.
        kelvin: f32,
    },

    /// One color stop of the current palette.
    PalettePart {
        /// Color stop, meaningless when `flags` carries `EMPTY`.
        color: PaletteColor,
        /// List framing.
        flags: ListFlags,
    },

    /// Current palette mapping.
    PaletteSettings {
        /// The mapping.
        settings: PaletteSettings,
    },

    /// Current access point environment.
    Environment {
        /// The environment.
        environment: Environment,
    },

    /// Current access point country.
    Country {
        /// ISO 3166-1 alpha-2 code.
        code: String,
        /// Whether the device picked the country itself.
        automatic: bool,
    },

    /// Country codes the device accepts, `;`-separated.
    SupportedCountries {
        /// Raw list.
        codes: String,
    },

    /// Security modes the device supports.
    SupportedSecurityModes {
        /// Bitfield of [`SecurityMode`] values.
        modes: u64,
    },

    /// Current access point security.
    Security {
        /// The mode.
        mode: SecurityMode,
    },

    /// Current access point SSID.
    Ssid {
        /// Network name.
        ssid: String,
    },

    /// Current access point channel selection.
    ApChannel {
        /// The selection.
        selection: ChannelSelection,
    },

    /// One authorized channel.
    AuthorizedChannel {
        /// The channel and its environments.
        channel: AuthorizedChannel,
        /// List framing.
        flags: ListFlags,
    },

    /// One scan result.
    ScannedItem {
        /// The network seen.
        network: ScannedNetwork,
        /// List framing.
        flags: ListFlags,
    },
}

impl Event {
    /// Short event name, used in logs and metric labels.
    pub const fn name(&self) -> &'static str {
        match self {
            Event::ThermalCapabilities { .. } => "thermal_capabilities",
            Event::ThermalMode { .. } => "thermal_mode",
            Event::ThermalSensitivity { .. } => "thermal_sensitivity",
            Event::CalibrationMode { .. } => "calibration_mode",
            Event::Emissivity { .. } => "emissivity",
            Event::BackgroundTemperature { .. } => "background_temperature",
            Event::PalettePart { .. } => "palette_part",
            Event::PaletteSettings { .. } => "palette_settings",
            Event::Environment { .. } => "environment",
            Event::Country { .. } => "country",
            Event::SupportedCountries { .. } => "supported_countries",
            Event::SupportedSecurityModes { .. } => "supported_security_modes",
            Event::Security { .. } => "security",
            Event::Ssid { .. } => "ssid",
            Event::ApChannel { .. } => "ap_channel",
            Event::AuthorizedChannel { .. } => "authorized_channel",
            Event::ScannedItem { .. } => "scanned_item",
        }
    }

    /// The setting or list this event reports on, if any.
    pub const fn setting_id(&self) -> Option<SettingId> {
        match self {
            Event::ThermalMode { .. } => Some(SettingId::ThermalMode),
            Event::ThermalSensitivity { .. } => Some(SettingId::ThermalSensitivity),
            Event::CalibrationMode { .. } => Some(SettingId::ThermalCalibrationMode),
            Event::Emissivity { .. } => Some(SettingId::ThermalEmissivity),
            Event::BackgroundTemperature { .. } => Some(SettingId::ThermalBackgroundTemperature),
            Event::PalettePart { .. } => Some(SettingId::ThermalPalette),
            Event::PaletteSettings { .. } => Some(SettingId::ThermalPaletteSettings),
            Event::Environment { .. } => Some(SettingId::WifiEnvironment),
            Event::Country { .. } => Some(SettingId::WifiCountry),
            Event::Security { .. } => Some(SettingId::WifiSecurity),
            Event::Ssid { .. } => Some(SettingId::WifiSsid),
            Event::ApChannel { .. } => Some(SettingId::WifiChannel),
            Event::AuthorizedChannel { .. } => Some(SettingId::WifiAuthorizedChannels),
            Event::ScannedItem { .. } => Some(SettingId::WifiScanResults),
            Event::ThermalCapabilities { .. }
            | Event::SupportedCountries { .. }
            | Event::SupportedSecurityModes { .. } => None,
        }
    }

    /// List framing, for list item events.
    pub const fn list_flags(&self) -> Option<ListFlags> {
        match self {
            Event::PalettePart { flags, .. }
            | Event::AuthorizedChannel { flags, .. }
            | Event::ScannedItem { flags, .. } => Some(*flags),
            _ => None,
        }
    }
}
