//! Per-device configuration.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use setsync_protocol::parse_country_code;
use std::path::Path;

/// Configuration of one controlled device.
///
/// ```yaml
/// uid: anafi-01
/// offline_settings: true
/// auto_select_country: true
/// detected_country: FR
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device unique identifier, used to key persisted data and metrics.
    pub uid: String,
    /// Persist presets and device capabilities so durable components stay
    /// usable while the device is away.
    pub offline_settings: bool,
    /// Force the access point country to [`DeviceConfig::detected_country`]
    /// and restrict the environment to outdoor.
    pub auto_select_country: bool,
    /// Country the controller believes it is in.
    pub detected_country: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            uid: "device".to_string(),
            offline_settings: true,
            auto_select_country: false,
            detected_country: None,
        }
    }
}

impl DeviceConfig {
    /// Config for the device `uid` with default settings.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Parse a YAML config, normalizing the detected country.
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let mut config: DeviceConfig = serde_yaml::from_str(text)?;
        if let Some(code) = &config.detected_country {
            config.detected_country = Some(parse_country_code(code)?);
        }
        Ok(config)
    }

    /// Load a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Country to force on the access point, if auto-selection is enabled and
    /// a country was detected.
    pub fn forced_country(&self) -> Option<&str> {
        if self.auto_select_country {
            self.detected_country.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = DeviceConfig::from_yaml("uid: anafi-01\n").expect("parse");
        assert_eq!(config.uid, "anafi-01");
        assert!(config.offline_settings);
        assert_eq!(config.forced_country(), None);
    }

    #[test]
    fn test_detected_country_normalized() {
        let yaml = "uid: a\nauto_select_country: true\ndetected_country: fr\n";
        let config = DeviceConfig::from_yaml(yaml).expect("parse");
        assert_eq!(config.forced_country(), Some("FR"));
    }

    #[test]
    fn test_bad_country_rejected() {
        let yaml = "uid: a\ndetected_country: France\n";
        assert!(matches!(
            DeviceConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }
}
