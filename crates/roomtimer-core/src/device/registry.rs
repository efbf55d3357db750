//! Builds live devices from validated configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::info;

use super::{CountdownDevice, CountupDevice, DEFAULT_PULSE_WIDTH};
use crate::config::{Config, DeviceConfig};
use crate::error::CoreError;
use crate::events::TimerEvent;

/// A constructed device, keyed like its configuration entry.
#[derive(Debug)]
pub enum Device {
    Countdown(CountdownDevice),
    Countup(CountupDevice),
}

impl Device {
    pub fn key(&self) -> &str {
        match self {
            Device::Countdown(device) => device.key(),
            Device::Countup(device) => device.key(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Device::Countdown(_) => "countdown",
            Device::Countup(_) => "countup",
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        match self {
            Device::Countdown(device) => device.subscribe(),
            Device::Countup(device) => device.subscribe(),
        }
    }

    pub fn pulse_width(&self) -> Duration {
        match self {
            Device::Countdown(device) => device.pulse_width(),
            Device::Countup(_) => DEFAULT_PULSE_WIDTH,
        }
    }

    pub fn start(&self) {
        match self {
            Device::Countdown(device) => device.start(),
            Device::Countup(device) => device.start(),
        }
    }

    pub fn shutdown(&self) {
        match self {
            Device::Countdown(device) => device.shutdown(),
            Device::Countup(device) => device.shutdown(),
        }
    }
}

/// All devices built from one configuration file.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, Device>,
}

impl DeviceRegistry {
    /// Validate the configuration and build every declared device.
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        config.validate()?;
        let mut devices = BTreeMap::new();
        for (key, device_config) in &config.devices {
            let device = match device_config {
                DeviceConfig::Countdown(props) => {
                    Device::Countdown(CountdownDevice::new(key, props.clone())?)
                }
                DeviceConfig::Countup(props) => {
                    Device::Countup(CountupDevice::new(key, props.clone()))
                }
            };
            info!(key = %key, kind = device.kind(), "registered timer device");
            devices.insert(key.clone(), device);
        }
        Ok(Self { devices })
    }

    pub fn get(&self, key: &str) -> Option<&Device> {
        self.devices.get(key)
    }

    pub fn countdown(&self, key: &str) -> Option<&CountdownDevice> {
        match self.devices.get(key) {
            Some(Device::Countdown(device)) => Some(device),
            _ => None,
        }
    }

    pub fn countup(&self, key: &str) -> Option<&CountupDevice> {
        match self.devices.get(key) {
            Some(Device::Countup(device)) => Some(device),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Device)> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Deterministic release on process shutdown: every running engine is
    /// stopped with its terminal notification and its tick task dropped.
    pub fn shutdown_all(&self) {
        for device in self.devices.values() {
            device.shutdown();
        }
        info!("all timer devices shut down");
    }
}
