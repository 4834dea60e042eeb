use std::path::PathBuf;

use crate::led::{LedProbe, LEDS_DIR};
use crate::locator::{DeviceLocator, KeyboardCapability, DEVICES_FILE, INPUT_DIR};

/// Where to find the keyboard and how to recognize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The device enumeration file.
    pub devices_file: PathBuf,
    /// The directory the `event*` handlers live in.
    pub device_dir: PathBuf,
    /// Use this event device instead of searching for one.
    pub device: Option<PathBuf>,
    pub capability: KeyboardCapability,
    /// The LED class directory used to seed caps lock; `None` skips the probe.
    pub leds_dir: Option<PathBuf>,
}

impl Config {
    pub fn locator(&self) -> DeviceLocator {
        DeviceLocator::new(&self.devices_file)
            .with_device_dir(&self.device_dir)
            .with_capability(self.capability.clone())
    }

    pub fn led_probe(&self) -> Option<LedProbe> {
        self.leds_dir.as_ref().map(LedProbe::new)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            devices_file: PathBuf::from(DEVICES_FILE),
            device_dir: PathBuf::from(INPUT_DIR),
            device: None,
            capability: KeyboardCapability::default(),
            leds_dir: Some(PathBuf::from(LEDS_DIR)),
        }
    }
}
