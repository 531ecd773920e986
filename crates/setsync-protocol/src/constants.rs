//! Protocol constants.

// ============================================================================
// List Flags
// ============================================================================

/// First item of a list sequence.
pub const LIST_FLAG_FIRST: u8 = 1 << 0;
/// Last item of a list sequence.
pub const LIST_FLAG_LAST: u8 = 1 << 1;
/// The list is empty; any item in the message is meaningless.
pub const LIST_FLAG_EMPTY: u8 = 1 << 2;
/// Remove the item from the list.
pub const LIST_FLAG_REMOVE: u8 = 1 << 3;

// ============================================================================
// Wifi
// ============================================================================

/// Lowest valid 2.4 GHz channel.
pub const CHANNEL_2_4_GHZ_MIN: u8 = 1;
/// Highest valid 2.4 GHz channel.
pub const CHANNEL_2_4_GHZ_MAX: u8 = 14;
/// Lowest valid 5 GHz channel.
pub const CHANNEL_5_GHZ_MIN: u8 = 32;
/// Highest valid 5 GHz channel.
pub const CHANNEL_5_GHZ_MAX: u8 = 177;

/// Separator in the supported country codes report.
pub const COUNTRY_CODE_SEPARATOR: char = ';';
/// Length of an ISO 3166-1 alpha-2 country code.
pub const COUNTRY_CODE_LEN: usize = 2;

/// Maximum SSID length in bytes.
pub const MAX_SSID_LEN: usize = 32;
/// Minimum WPA2 passphrase length.
pub const MIN_WPA2_PASSWORD_LEN: usize = 8;
/// Maximum WPA2 passphrase length.
pub const MAX_WPA2_PASSWORD_LEN: usize = 63;

// ============================================================================
// Thermal
// ============================================================================

/// Valid emissivity range.
pub const EMISSIVITY_MIN: f32 = 0.0;
/// Valid emissivity range.
pub const EMISSIVITY_MAX: f32 = 1.0;
/// Highest accepted background temperature, in Kelvin.
pub const BACKGROUND_TEMPERATURE_MAX: f32 = 1000.0;
/// Valid blending rate range.
pub const BLENDING_RATE_MIN: f32 = 0.0;
/// Valid blending rate range.
pub const BLENDING_RATE_MAX: f32 = 1.0;
