//! TOML-based device configuration.
//!
//! A configuration file declares the timer devices to build, keyed by
//! device key:
//!
//! ```toml
//! [devices.conference]
//! type = "countdown"
//! countdown_time = 300
//! warning_time = 60
//! extend_time = 120
//!
//! [devices.usage]
//! type = "countup"
//! auto_stop_on_start_release = true
//! ```
//!
//! Loaded from `~/.config/roomtimer/config.toml` by default. The loader
//! validates before any device is constructed; a bad entry rejects the
//! whole file so a misconfigured device never half-starts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_pulse_ms() -> u64 {
    500
}

/// Countdown device properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownProperties {
    /// Nominal countdown length in seconds. Must be greater than zero.
    pub countdown_time: u64,
    /// Threshold at which the one-shot warning fires, in seconds remaining.
    #[serde(default)]
    pub warning_time: Option<u64>,
    /// Length substituted on an extend command. Falls back to
    /// `countdown_time` when absent.
    #[serde(default)]
    pub extend_time: Option<u64>,
    /// Width of the expired/warning feedback pulses in milliseconds.
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u64,
}

impl CountdownProperties {
    pub fn new(countdown_time: u64) -> Self {
        Self {
            countdown_time,
            warning_time: None,
            extend_time: None,
            pulse_ms: default_pulse_ms(),
        }
    }

    pub fn pulse_width(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

/// Count-up device properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountupProperties {
    /// Stop when the momentary start control releases instead of waiting
    /// for an explicit stop command.
    #[serde(default)]
    pub auto_stop_on_start_release: bool,
    /// Reset clears the elapsed count instead of only realigning the tick
    /// cadence.
    #[serde(default)]
    pub reset_clears_elapsed: bool,
}

/// One configured device, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceConfig {
    Countdown(CountdownProperties),
    Countup(CountupProperties),
}

impl DeviceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceConfig::Countdown(_) => "countdown",
            DeviceConfig::Countup(_) => "countup",
        }
    }
}

/// Device configuration, serialized to/from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceConfig>,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let config: Self =
            toml::from_str(&raw).map_err(|err| ConfigError::ParseFailed(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The per-user configuration location, `~/.config/roomtimer/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("roomtimer").join("config.toml"))
    }

    /// Reject entries a device cannot be constructed from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, device) in &self.devices {
            match device {
                DeviceConfig::Countdown(props) => {
                    if props.countdown_time == 0 {
                        return Err(ConfigError::InvalidValue {
                            key: format!("devices.{key}.countdown_time"),
                            message: "must be greater than zero".into(),
                        });
                    }
                    if let Some(warning) = props.warning_time {
                        if warning > props.countdown_time {
                            return Err(ConfigError::InvalidValue {
                                key: format!("devices.{key}.warning_time"),
                                message: format!(
                                    "must not exceed countdown_time ({})",
                                    props.countdown_time
                                ),
                            });
                        }
                    }
                    if props.pulse_ms == 0 {
                        return Err(ConfigError::InvalidValue {
                            key: format!("devices.{key}.pulse_ms"),
                            message: "must be greater than zero".into(),
                        });
                    }
                }
                DeviceConfig::Countup(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        [devices.conference]
        type = "countdown"
        countdown_time = 300
        warning_time = 60
        extend_time = 120

        [devices.usage]
        type = "countup"
        auto_stop_on_start_release = true
    "#};

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.devices.len(), 2);

        match &config.devices["conference"] {
            DeviceConfig::Countdown(props) => {
                assert_eq!(props.countdown_time, 300);
                assert_eq!(props.warning_time, Some(60));
                assert_eq!(props.extend_time, Some(120));
                assert_eq!(props.pulse_ms, 500);
            }
            other => panic!("expected countdown, got {other:?}"),
        }
        match &config.devices["usage"] {
            DeviceConfig::Countup(props) => {
                assert!(props.auto_stop_on_start_release);
                assert!(!props.reset_clears_elapsed);
            }
            other => panic!("expected countup, got {other:?}"),
        }
    }

    #[test]
    fn optional_fields_default() {
        let config: Config = toml::from_str(indoc! {r#"
            [devices.simple]
            type = "countdown"
            countdown_time = 10
        "#})
        .unwrap();
        match &config.devices["simple"] {
            DeviceConfig::Countdown(props) => {
                assert_eq!(props.warning_time, None);
                assert_eq!(props.extend_time, None);
                assert_eq!(props.pulse_width(), Duration::from_millis(500));
            }
            other => panic!("expected countdown, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_countdown() {
        let config: Config = toml::from_str(indoc! {r#"
            [devices.broken]
            type = "countdown"
            countdown_time = 0
        "#})
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "devices.broken.countdown_time"
        ));
    }

    #[test]
    fn rejects_warning_beyond_countdown() {
        let config: Config = toml::from_str(indoc! {r#"
            [devices.broken]
            type = "countdown"
            countdown_time = 30
            warning_time = 31
        "#})
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "devices.broken.warning_time"
        ));
    }

    #[test]
    fn load_reads_and_validates_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn load_missing_file_is_load_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed { .. }));
    }

    #[test]
    fn load_garbage_is_parse_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "devices = 12").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }
}
