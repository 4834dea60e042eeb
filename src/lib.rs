//! This crate finds the keyboard among the Linux input devices and turns its raw events into
//! key symbol names.
//!
//! The keyboard is located by scanning `/proc/bus/input/devices` with a [`DeviceLocator`]. Its
//! event device is then read by an [`EventDecoder`], a [`Stream`](futures::Stream) of
//! [`ResolvedKeyPress`]es, which tracks shift and caps lock with a [`ModifierTracker`] and
//! resolves codes through a [`KeyCodeTable`]. The [`Keylogger`] wires these together and feeds a
//! [`KeyPressSink`].
//!
//! # Example
//!
//! Print every key press to stdout. Note the keylogger needs to run with root privileges.
//!
//! ```no_run
//! use kbdlog::{Config, KbdlogError, Keylogger, LineSink};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), KbdlogError> {
//!     let keylogger = Keylogger::new(Config::default());
//!
//!     keylogger.capture(&mut LineSink::stdout()).await
//! }
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("This crate only works on Linux");

mod config;
mod error;
pub mod key_code;
pub mod keyboard;
mod keylogger;
pub mod led;
pub mod locator;
mod modifier;
mod sink;

pub use config::Config;
pub use error::KbdlogError;
pub use key_code::KeyCodeTable;
pub use keyboard::{EventDecoder, EventDevice, EventTime, RawEvent, ResolvedKeyPress};
pub use keylogger::{drain, Keylogger};
pub use led::LedProbe;
pub use locator::{DeviceLocator, DeviceRecord, KeyboardCapability};
pub use modifier::{ModifierState, ModifierTracker};
pub use sink::{KeyPressSink, LineSink};

pub type KbdlogResult<T> = Result<T, KbdlogError>;
