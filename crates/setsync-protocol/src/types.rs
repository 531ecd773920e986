//! Common types used in the protocol.

use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use setsync_core::SettingEnum;
use std::cmp::Ordering;
use std::collections::BTreeSet;

// ============================================================================
// Setting Identifiers
// ============================================================================

/// Identifies one remote-controlled setting or list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingId {
    /// Thermal camera mode.
    ThermalMode,
    /// Thermal camera sensitivity range.
    ThermalSensitivity,
    /// Thermal camera shutter calibration mode.
    ThermalCalibrationMode,
    /// Emissivity used for temperature computation.
    ThermalEmissivity,
    /// Background temperature used for temperature computation.
    ThermalBackgroundTemperature,
    /// Thermal palette colors.
    ThermalPalette,
    /// How the thermal palette maps onto temperatures.
    ThermalPaletteSettings,
    /// Thermal stream rendering.
    ThermalRendering,
    /// Access point environment.
    WifiEnvironment,
    /// Access point country.
    WifiCountry,
    /// Access point SSID.
    WifiSsid,
    /// Access point security.
    WifiSecurity,
    /// Access point channel selection.
    WifiChannel,
    /// Channels authorized by the device.
    WifiAuthorizedChannels,
    /// Wifi scan results.
    WifiScanResults,
}

impl SettingId {
    /// Dotted name, used in logs and metric labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SettingId::ThermalMode => "thermal.mode",
            SettingId::ThermalSensitivity => "thermal.sensitivity",
            SettingId::ThermalCalibrationMode => "thermal.calibration_mode",
            SettingId::ThermalEmissivity => "thermal.emissivity",
            SettingId::ThermalBackgroundTemperature => "thermal.background_temperature",
            SettingId::ThermalPalette => "thermal.palette",
            SettingId::ThermalPaletteSettings => "thermal.palette_settings",
            SettingId::ThermalRendering => "thermal.rendering",
            SettingId::WifiEnvironment => "wifi.environment",
            SettingId::WifiCountry => "wifi.country",
            SettingId::WifiSsid => "wifi.ssid",
            SettingId::WifiSecurity => "wifi.security",
            SettingId::WifiChannel => "wifi.channel",
            SettingId::WifiAuthorizedChannels => "wifi.authorized_channels",
            SettingId::WifiScanResults => "wifi.scan_results",
        }
    }
}

impl std::fmt::Display for SettingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Thermal Types
// ============================================================================

/// Thermal camera mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalMode {
    /// Thermal imaging off.
    Disabled,
    /// Thermal imaging on.
    Standard,
    /// Thermal imaging blended with the visible stream.
    Blended,
}

impl SettingEnum for ThermalMode {
    const VARIANTS: &'static [Self] = &[ThermalMode::Disabled, ThermalMode::Standard, ThermalMode::Blended];
}

/// Thermal camera sensitivity range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalSensitivity {
    /// Up to 400 °C.
    HighRange,
    /// Up to 160 °C, finer resolution.
    LowRange,
}

impl SettingEnum for ThermalSensitivity {
    const VARIANTS: &'static [Self] = &[ThermalSensitivity::HighRange, ThermalSensitivity::LowRange];
}

/// Thermal camera shutter calibration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// The camera calibrates when it sees fit.
    Automatic,
    /// Calibration only on explicit request.
    Manual,
}

impl SettingEnum for CalibrationMode {
    const VARIANTS: &'static [Self] = &[CalibrationMode::Automatic, CalibrationMode::Manual];
}

/// One color stop of a thermal palette.
///
/// Components and position are in `0.0..=1.0`. Equality is bitwise on the
/// float fields so colors can be compared and de-duplicated exactly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaletteColor {
    /// Red component.
    pub red: f32,
    /// Green component.
    pub green: f32,
    /// Blue component.
    pub blue: f32,
    /// Position of the stop along the palette.
    pub position: f32,
}

impl PaletteColor {
    /// Create a color stop.
    pub fn new(red: f32, green: f32, blue: f32, position: f32) -> Self {
        PaletteColor {
            red,
            green,
            blue,
            position,
        }
    }

    fn bits(&self) -> [u32; 4] {
        [
            self.position.to_bits(),
            self.red.to_bits(),
            self.green.to_bits(),
            self.blue.to_bits(),
        ]
    }
}

impl PartialEq for PaletteColor {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for PaletteColor {}

impl std::hash::Hash for PaletteColor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl PartialOrd for PaletteColor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PaletteColor {
    /// Orders by position first, as palettes are rendered.
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .total_cmp(&other.position)
            .then(self.red.total_cmp(&other.red))
            .then(self.green.total_cmp(&other.green))
            .then(self.blue.total_cmp(&other.blue))
    }
}

/// How the palette is stretched over the scene temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteMode {
    /// Fixed temperature bounds.
    Absolute,
    /// Bounds follow the scene.
    Relative,
    /// Only temperatures past a threshold are colored.
    Spot,
}

/// Colorization outside the absolute palette bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorizationMode {
    /// Out-of-range temperatures are left uncolored.
    Limited,
    /// Out-of-range temperatures take the nearest bound color.
    Extended,
}

/// Which side of the threshold a spot palette colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotType {
    /// Temperatures below the threshold.
    Cold,
    /// Temperatures above the threshold.
    Hot,
}

/// Palette mapping parameters, as exchanged with the device.
///
/// Only the fields relevant to `mode` are meaningful; the others are carried
/// with their defaults. Temperatures are in Kelvin, the spot threshold in
/// `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteSettings {
    /// Mapping mode.
    pub mode: PaletteMode,
    /// Temperature of the lowest palette color.
    pub lowest_temperature: f32,
    /// Temperature of the highest palette color.
    pub highest_temperature: f32,
    /// Colorization for absolute mode.
    pub colorization: ColorizationMode,
    /// Whether relative bounds stop following the scene.
    pub relative_locked: bool,
    /// Colored side for spot mode.
    pub spot_type: SpotType,
    /// Threshold for spot mode.
    pub spot_threshold: f32,
}

impl Default for PaletteSettings {
    fn default() -> Self {
        PaletteSettings {
            mode: PaletteMode::Absolute,
            lowest_temperature: 0.0,
            highest_temperature: 0.0,
            colorization: ColorizationMode::Extended,
            relative_locked: false,
            spot_type: SpotType::Hot,
            spot_threshold: 0.0,
        }
    }
}

impl PaletteSettings {
    /// Absolute mapping between two fixed temperatures.
    pub fn absolute(lowest: f32, highest: f32, colorization: ColorizationMode) -> Self {
        PaletteSettings {
            mode: PaletteMode::Absolute,
            lowest_temperature: lowest,
            highest_temperature: highest,
            colorization,
            ..Default::default()
        }
    }

    /// Relative mapping, optionally locked on the current bounds.
    pub fn relative(lowest: f32, highest: f32, locked: bool) -> Self {
        PaletteSettings {
            mode: PaletteMode::Relative,
            lowest_temperature: lowest,
            highest_temperature: highest,
            relative_locked: locked,
            ..Default::default()
        }
    }

    /// Spot mapping past a threshold.
    pub fn spot(spot_type: SpotType, threshold: f32) -> Self {
        PaletteSettings {
            mode: PaletteMode::Spot,
            spot_type,
            spot_threshold: threshold,
            ..Default::default()
        }
    }

    /// Whether every float field is finite.
    pub fn is_finite(&self) -> bool {
        self.lowest_temperature.is_finite() && self.highest_temperature.is_finite() && self.spot_threshold.is_finite()
    }
}

/// Which stream the thermal camera renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingMode {
    /// Visible stream only.
    Visible,
    /// Thermal stream only.
    Thermal,
    /// Thermal blended over visible.
    Blended,
    /// Thermal in grayscale.
    Monochrome,
}

/// Thermal stream rendering request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rendering {
    /// Rendered stream.
    pub mode: RenderingMode,
    /// Share of the thermal stream when blended, in `0.0..=1.0`.
    pub blending_rate: f32,
}

impl Rendering {
    /// Create a rendering request.
    pub fn new(mode: RenderingMode, blending_rate: f32) -> Self {
        Rendering { mode, blending_rate }
    }
}

// ============================================================================
// Wifi Types
// ============================================================================

/// Access point environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Indoor regulations apply.
    Indoor,
    /// Outdoor regulations apply.
    Outdoor,
}

impl SettingEnum for Environment {
    const VARIANTS: &'static [Self] = &[Environment::Indoor, Environment::Outdoor];
}

/// Access point security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// No password.
    Open,
    /// WPA2 with a passphrase.
    Wpa2Secured,
}

impl SettingEnum for SecurityMode {
    const VARIANTS: &'static [Self] = &[SecurityMode::Open, SecurityMode::Wpa2Secured];
}

/// Wifi frequency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Band {
    /// 2.4 GHz band.
    #[serde(rename = "2.4ghz")]
    Band2_4Ghz,
    /// 5 GHz band.
    #[serde(rename = "5ghz")]
    Band5Ghz,
}

impl SettingEnum for Band {
    const VARIANTS: &'static [Self] = &[Band::Band2_4Ghz, Band::Band5Ghz];
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Band::Band2_4Ghz => write!(f, "2.4GHz"),
            Band::Band5Ghz => write!(f, "5GHz"),
        }
    }
}

/// A wifi channel on a given band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Channel {
    band: Band,
    id: u8,
}

impl Channel {
    /// Create a channel, checking the number is valid for the band.
    pub fn new(band: Band, id: u8) -> ProtocolResult<Self> {
        let valid = match band {
            Band::Band2_4Ghz => (CHANNEL_2_4_GHZ_MIN..=CHANNEL_2_4_GHZ_MAX).contains(&id),
            Band::Band5Ghz => (CHANNEL_5_GHZ_MIN..=CHANNEL_5_GHZ_MAX).contains(&id),
        };
        if valid {
            Ok(Channel { band, id })
        } else {
            Err(ProtocolError::InvalidChannel { band, id })
        }
    }

    /// The band.
    pub fn band(&self) -> Band {
        self.band
    }

    /// The channel number.
    pub fn id(&self) -> u8 {
        self.id
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.id, self.band)
    }
}

/// How the access point channel is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelection {
    /// A fixed channel.
    Manual(Channel),
    /// The device picks, optionally restricted to one band.
    Auto(Option<Band>),
}

impl Default for ChannelSelection {
    fn default() -> Self {
        ChannelSelection::Auto(None)
    }
}

/// A channel the device may use, with the environments it is authorized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorizedChannel {
    /// The channel.
    pub channel: Channel,
    /// Bitfield of [`Environment`] values.
    pub environments: u64,
}

impl AuthorizedChannel {
    /// Whether the channel may be used in `environment`.
    pub fn allows(&self, environment: Environment) -> bool {
        environment.in_bitfield(self.environments)
    }
}

/// One access point seen during a wifi scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScannedNetwork {
    /// Network name.
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i16,
    /// Channel the network was seen on.
    pub channel: Channel,
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Normalize and validate one country code.
pub fn parse_country_code(code: &str) -> ProtocolResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == COUNTRY_CODE_LEN && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(ProtocolError::InvalidCountryCode(code))
    }
}

/// Parse the `;`-separated country code list reported by the device.
///
/// Invalid entries are skipped with a warning.
pub fn parse_country_codes(codes: &str) -> BTreeSet<String> {
    codes
        .split(COUNTRY_CODE_SEPARATOR)
        .filter(|code| !code.trim().is_empty())
        .filter_map(|code| match parse_country_code(code) {
            Ok(code) => Some(code),
            Err(err) => {
                log::warn!("skipping supported country: {}", err);
                None
            }
        })
        .collect()
}

/// Validate an SSID.
pub fn validate_ssid(ssid: &str) -> ProtocolResult<()> {
    if ssid.is_empty() || ssid.len() > MAX_SSID_LEN {
        Err(ProtocolError::InvalidSsid(ssid.len()))
    } else {
        Ok(())
    }
}

/// Validate a WPA2 passphrase.
pub fn validate_wpa2_password(password: &str) -> ProtocolResult<()> {
    let len = password.chars().count();
    if (MIN_WPA2_PASSWORD_LEN..=MAX_WPA2_PASSWORD_LEN).contains(&len) && password.is_ascii() {
        Ok(())
    } else {
        Err(ProtocolError::InvalidPassword(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_validation() {
        assert!(Channel::new(Band::Band2_4Ghz, 6).is_ok());
        assert_eq!(
            Channel::new(Band::Band2_4Ghz, 36),
            Err(ProtocolError::InvalidChannel {
                band: Band::Band2_4Ghz,
                id: 36
            })
        );
        assert!(Channel::new(Band::Band5Ghz, 36).is_ok());
        assert!(Channel::new(Band::Band5Ghz, 6).is_err());
    }

    #[test]
    fn test_country_codes_parsing() {
        let codes = parse_country_codes(" fr;US;;xyz;D1;de ");
        let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
        assert_eq!(codes, vec!["DE", "FR", "US"]);
    }

    #[test]
    fn test_palette_color_ordering() {
        let mut colors = vec![
            PaletteColor::new(1.0, 0.0, 0.0, 0.8),
            PaletteColor::new(0.0, 0.0, 1.0, 0.1),
            PaletteColor::new(0.0, 1.0, 0.0, 0.5),
        ];
        colors.sort();
        let positions: Vec<f32> = colors.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0.1, 0.5, 0.8]);
    }

    #[test]
    fn test_authorized_channel_environments() {
        let channel = AuthorizedChannel {
            channel: Channel::new(Band::Band5Ghz, 36).expect("valid channel"),
            environments: Environment::Indoor.bit(),
        };
        assert!(channel.allows(Environment::Indoor));
        assert!(!channel.allows(Environment::Outdoor));
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_wpa2_password("short").is_err());
        assert!(validate_wpa2_password("long enough").is_ok());
        assert!(validate_ssid("").is_err());
        assert!(validate_ssid("drone-1234").is_ok());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ThermalMode::Blended).expect("serialize");
        assert_eq!(json, "\"blended\"");
        let json = serde_json::to_string(&SettingId::WifiCountry).expect("serialize");
        assert_eq!(json, "\"wifi_country\"");
    }
}
