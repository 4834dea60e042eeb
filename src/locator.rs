//! Keyboard discovery through `/proc/bus/input/devices`.
//!
//! The file lists one block per input device, separated by blank lines:
//!
//! ```text
//! I: Bus=0011 Vendor=0001 Product=0001 Version=ab41
//! N: Name="AT Translated Set 2 keyboard"
//! H: Handlers=sysrq kbd event3 leds
//! B: EV=120013
//! ```
//!
//! A block belongs to a keyboard when its `B: EV=` bitmap satisfies the configured
//! [`KeyboardCapability`] and its handlers line names an `event*` device.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::KbdlogError;
use crate::keyboard::event_codes::KEYBOARD_EV_BITS;
use crate::KbdlogResult;

/// The default device enumeration file.
pub const DEVICES_FILE: &str = "/proc/bus/input/devices";
/// The directory holding the event device files.
pub const INPUT_DIR: &str = "/dev/input";
/// The bitmap token reported by a typical keyboard (SYN, KEY, MSC, LED, REP).
pub const KEYBOARD_EV_TOKEN: &str = "EV=120013";

const HANDLERS_MARKER: &str = "H:";
const BITMAP_MARKER: &str = "B:";
const HANDLERS_KEY: &str = "Handlers=";
const EVENT_HANDLER_PREFIX: &str = "event";
const EV_KEY_PREFIX: &str = "EV=";

/// How a `B: EV=` token is judged to belong to a keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardCapability {
    /// The token must equal this string exactly.
    Exact(String),
    /// The hex bitmap must contain every bit of the mask. Extra bits are allowed.
    RequiredBits(u64),
}

impl KeyboardCapability {
    /// Exact match against `EV=120013`.
    pub fn exact() -> Self {
        Self::Exact(KEYBOARD_EV_TOKEN.to_owned())
    }

    /// Require at least SYN, KEY, MSC, LED and REP.
    pub fn required_bits() -> Self {
        Self::RequiredBits(KEYBOARD_EV_BITS)
    }

    pub fn matches(&self, token: &str) -> bool {
        match self {
            Self::Exact(expected) => token == expected,
            Self::RequiredBits(mask) => token
                .strip_prefix(EV_KEY_PREFIX)
                .and_then(|bits| u64::from_str_radix(bits, 16).ok())
                .is_some_and(|bits| bits & mask == *mask),
        }
    }
}

impl Default for KeyboardCapability {
    fn default() -> Self {
        Self::exact()
    }
}

/// The fields of the device block currently being scanned.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Event device paths named on the handlers line, in order.
    pub handler_paths: Vec<PathBuf>,
    /// The `B:` bitmap satisfied the keyboard capability.
    pub matched: bool,
}

impl DeviceRecord {
    /// The device path the block would resolve to: the last `event*` handler.
    pub fn candidate(&self) -> Option<&Path> {
        self.handler_paths.last().map(PathBuf::as_path)
    }

    /// The keyboard path, once the block has both a matching bitmap and an event handler.
    pub fn keyboard(&self) -> Option<&Path> {
        self.candidate().filter(|_| self.matched)
    }

    fn reset(&mut self) {
        self.handler_paths.clear();
        self.matched = false;
    }
}

/// Finds the keyboard event device.
#[derive(Debug, Clone)]
pub struct DeviceLocator {
    devices_file: PathBuf,
    device_dir: PathBuf,
    capability: KeyboardCapability,
}

impl DeviceLocator {
    pub fn new(devices_file: impl Into<PathBuf>) -> Self {
        Self {
            devices_file: devices_file.into(),
            device_dir: PathBuf::from(INPUT_DIR),
            capability: KeyboardCapability::default(),
        }
    }

    /// Use `dir` instead of `/dev/input` when forming device paths.
    pub fn with_device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.device_dir = dir.into();
        self
    }

    pub fn with_capability(mut self, capability: KeyboardCapability) -> Self {
        self.capability = capability;
        self
    }

    pub fn devices_file(&self) -> &Path {
        &self.devices_file
    }

    /// Open the enumeration file and return the first keyboard device path.
    pub fn locate(&self) -> KbdlogResult<PathBuf> {
        let file = File::open(&self.devices_file).map_err(|source| {
            KbdlogError::DeviceEnumeration {
                path: self.devices_file.clone(),
                source,
            }
        })?;

        self.scan(BufReader::new(file))
    }

    /// Scan an enumeration listing line by line.
    ///
    /// A path is returned as soon as the current block has both a matching bitmap and an event
    /// handler, in whichever order the two lines appear.
    pub fn scan(&self, reader: impl BufRead) -> KbdlogResult<PathBuf> {
        let mut record = DeviceRecord::default();

        // Device names are copied verbatim from the hardware and need not be UTF-8
        for line in reader.split(b'\n') {
            let line = line.map_err(|source| KbdlogError::DeviceEnumeration {
                path: self.devices_file.clone(),
                source,
            })?;

            // Only an empty line separates device blocks
            if line.is_empty() {
                record.reset();
                continue;
            }

            let line = String::from_utf8_lossy(&line);
            let mut tokens = line.split_whitespace();

            match tokens.next() {
                Some(HANDLERS_MARKER) => {
                    let handlers = tokens
                        .map(|t| t.strip_prefix(HANDLERS_KEY).unwrap_or(t))
                        .filter(|t| t.starts_with(EVENT_HANDLER_PREFIX))
                        .map(|t| self.device_dir.join(t));
                    record.handler_paths.extend(handlers);
                }
                Some(BITMAP_MARKER) => {
                    if let Some(token) = tokens.next() {
                        if token.starts_with(EV_KEY_PREFIX) {
                            debug!("device capabilities: {token}");
                        }
                        record.matched |= self.capability.matches(token);
                    }
                }
                _ => {}
            }

            if let Some(path) = record.keyboard() {
                return Ok(path.to_path_buf());
            }
        }

        Err(KbdlogError::KeyboardNotFound {
            path: self.devices_file.clone(),
        })
    }
}

impl Default for DeviceLocator {
    fn default() -> Self {
        Self::new(DEVICES_FILE)
    }
}
