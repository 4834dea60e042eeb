//! Point-in-time caps-lock query through the LED class in sysfs.
//!
//! Each keyboard LED is exposed as a directory such as `/sys/class/leds/input3::capslock`
//! containing a `brightness` file; a nonzero brightness means the LED is lit.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::KbdlogError;
use crate::KbdlogResult;

/// The default LED class directory.
pub const LEDS_DIR: &str = "/sys/class/leds";

const CAPS_LOCK_SUFFIX: &str = "capslock";

/// Reads the caps-lock LED from an LED class directory.
#[derive(Debug, Clone)]
pub struct LedProbe {
    dir: PathBuf,
}

impl LedProbe {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Find the first LED entry whose name ends in `capslock`.
    pub fn find_caps_lock(&self) -> KbdlogResult<PathBuf> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            KbdlogError::LedStateUnavailable(format!("cannot list {}: {e}", self.dir.display()))
        })?;

        entries
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_name().to_string_lossy().ends_with(CAPS_LOCK_SUFFIX))
            .map(|entry| entry.path())
            .ok_or_else(|| {
                KbdlogError::LedStateUnavailable(format!(
                    "no {CAPS_LOCK_SUFFIX} LED in {}",
                    self.dir.display()
                ))
            })
    }

    /// Whether caps lock is currently on.
    ///
    /// This only reflects the moment of the call; query again for a fresh value.
    pub fn caps_lock(&self) -> KbdlogResult<bool> {
        let brightness = self.find_caps_lock()?.join("brightness");

        let contents = fs::read_to_string(&brightness).map_err(|e| {
            KbdlogError::LedStateUnavailable(format!("cannot read {}: {e}", brightness.display()))
        })?;

        let value = contents.trim().parse::<i64>().map_err(|e| {
            KbdlogError::LedStateUnavailable(format!(
                "invalid brightness in {}: {e}",
                brightness.display()
            ))
        })?;

        Ok(value != 0)
    }
}

impl Default for LedProbe {
    fn default() -> Self {
        Self::new(LEDS_DIR)
    }
}
