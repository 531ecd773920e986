//! Protocol error types.

use crate::types::Band;
use thiserror::Error;

/// Errors raised while building protocol values from raw fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Channel number is not valid for the band.
    #[error("invalid channel {id} for band {band}")]
    InvalidChannel {
        /// Band the channel was reported on.
        band: Band,
        /// Channel number.
        id: u8,
    },

    /// Country code is not two ASCII letters.
    #[error("invalid country code: {0:?}")]
    InvalidCountryCode(String),

    /// SSID is empty or too long.
    #[error("invalid SSID length: {0} bytes")]
    InvalidSsid(usize),

    /// WPA2 passphrase length out of range.
    #[error("invalid WPA2 password length: {0} characters")]
    InvalidPassword(usize),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
