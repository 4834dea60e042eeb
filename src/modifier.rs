use log::debug;

use crate::key_code::{KEY_CAPSLOCK, KEY_LEFTSHIFT, KEY_RIGHTSHIFT};
use crate::keyboard::event_codes::{EV_KEY_AUTOREPEAT, EV_KEY_PRESS, EV_KEY_RELEASE};

/// A snapshot of the modifier keys that influence symbol resolution.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierState {
    /// A shift key is held down.
    pub shift: bool,
    /// Caps lock is engaged.
    pub caps_lock: bool,
}

/// Tracks shift and caps-lock from a stream of `EV_KEY` (code, value) pairs.
///
/// Shift follows the press/release of either shift key. Caps lock starts from a seed (usually
/// the LED state probed at startup, see [`crate::led`]) and toggles on every caps-lock press.
#[derive(Debug, Default)]
pub struct ModifierTracker {
    state: ModifierState,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker whose caps-lock state starts at `caps_lock`.
    pub fn with_caps_lock(caps_lock: bool) -> Self {
        Self {
            state: ModifierState {
                shift: false,
                caps_lock,
            },
        }
    }

    /// Feed one key event into the tracker.
    pub fn observe(&mut self, code: u16, value: i32) {
        match code {
            KEY_LEFTSHIFT | KEY_RIGHTSHIFT => match value {
                EV_KEY_PRESS | EV_KEY_AUTOREPEAT => self.state.shift = true,
                EV_KEY_RELEASE => self.state.shift = false,
                _ => {}
            },
            KEY_CAPSLOCK if value == EV_KEY_PRESS => {
                self.state.caps_lock = !self.state.caps_lock;
                debug!("caps lock toggled: {}", self.state.caps_lock);
            }
            _ => {}
        }
    }

    pub fn shift_active(&self) -> bool {
        self.state.shift
    }

    pub fn caps_lock_active(&self) -> bool {
        self.state.caps_lock
    }

    pub fn state(&self) -> ModifierState {
        self.state
    }
}
