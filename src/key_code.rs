//! Key code to symbol translation for a fixed US-like layout.
//!
//! Key codes follow [input-event-codes.h].
//!
//! [input-event-codes.h]: https://elixir.bootlin.com/linux/v5.19.17/source/include/uapi/linux/input-event-codes.h#L74

use std::borrow::Cow;
use std::collections::HashMap;

pub const KEY_RESERVED: u16 = 0;
pub const KEY_ESC: u16 = 1;
pub const KEY_1: u16 = 2;
pub const KEY_2: u16 = 3;
pub const KEY_3: u16 = 4;
pub const KEY_4: u16 = 5;
pub const KEY_5: u16 = 6;
pub const KEY_6: u16 = 7;
pub const KEY_7: u16 = 8;
pub const KEY_8: u16 = 9;
pub const KEY_9: u16 = 10;
pub const KEY_0: u16 = 11;
pub const KEY_MINUS: u16 = 12;
pub const KEY_EQUAL: u16 = 13;
pub const KEY_BACKSPACE: u16 = 14;
pub const KEY_TAB: u16 = 15;
pub const KEY_Q: u16 = 16;
pub const KEY_W: u16 = 17;
pub const KEY_E: u16 = 18;
pub const KEY_R: u16 = 19;
pub const KEY_T: u16 = 20;
pub const KEY_Y: u16 = 21;
pub const KEY_U: u16 = 22;
pub const KEY_I: u16 = 23;
pub const KEY_O: u16 = 24;
pub const KEY_P: u16 = 25;
pub const KEY_LEFTBRACE: u16 = 26;
pub const KEY_RIGHTBRACE: u16 = 27;
pub const KEY_ENTER: u16 = 28;
pub const KEY_LEFTCTRL: u16 = 29;
pub const KEY_A: u16 = 30;
pub const KEY_S: u16 = 31;
pub const KEY_D: u16 = 32;
pub const KEY_F: u16 = 33;
pub const KEY_G: u16 = 34;
pub const KEY_H: u16 = 35;
pub const KEY_J: u16 = 36;
pub const KEY_K: u16 = 37;
pub const KEY_L: u16 = 38;
pub const KEY_SEMICOLON: u16 = 39;
pub const KEY_APOSTROPHE: u16 = 40;
pub const KEY_GRAVE: u16 = 41;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_BACKSLASH: u16 = 43;
pub const KEY_Z: u16 = 44;
pub const KEY_X: u16 = 45;
pub const KEY_C: u16 = 46;
pub const KEY_V: u16 = 47;
pub const KEY_B: u16 = 48;
pub const KEY_N: u16 = 49;
pub const KEY_M: u16 = 50;
pub const KEY_COMMA: u16 = 51;
pub const KEY_DOT: u16 = 52;
pub const KEY_SLASH: u16 = 53;
pub const KEY_RIGHTSHIFT: u16 = 54;
pub const KEY_KPASTERISK: u16 = 55;
pub const KEY_LEFTALT: u16 = 56;
pub const KEY_SPACE: u16 = 57;
pub const KEY_CAPSLOCK: u16 = 58;
pub const KEY_F1: u16 = 59;
pub const KEY_F2: u16 = 60;
pub const KEY_F3: u16 = 61;
pub const KEY_F4: u16 = 62;
pub const KEY_F5: u16 = 63;
pub const KEY_F6: u16 = 64;
pub const KEY_F7: u16 = 65;
pub const KEY_F8: u16 = 66;
pub const KEY_F9: u16 = 67;
pub const KEY_F10: u16 = 68;
pub const KEY_NUMLOCK: u16 = 69;
pub const KEY_SCROLLLOCK: u16 = 70;
pub const KEY_KP7: u16 = 71;
pub const KEY_KP8: u16 = 72;
pub const KEY_KP9: u16 = 73;
pub const KEY_KPMINUS: u16 = 74;
pub const KEY_KP4: u16 = 75;
pub const KEY_KP5: u16 = 76;
pub const KEY_KP6: u16 = 77;
pub const KEY_KPPLUS: u16 = 78;
pub const KEY_KP1: u16 = 79;
pub const KEY_KP2: u16 = 80;
pub const KEY_KP3: u16 = 81;
pub const KEY_KP0: u16 = 82;
pub const KEY_KPDOT: u16 = 83;
pub const KEY_HOME: u16 = 102;
pub const KEY_UP: u16 = 103;
pub const KEY_PAGEUP: u16 = 104;
pub const KEY_LEFT: u16 = 105;
pub const KEY_RIGHT: u16 = 106;
pub const KEY_END: u16 = 107;
pub const KEY_DOWN: u16 = 108;
pub const KEY_PAGEDOWN: u16 = 109;
pub const KEY_INSERT: u16 = 110;
pub const KEY_DELETE: u16 = 111;

const BASE_SYMBOLS: &[(u16, &str)] = &[
    (KEY_RESERVED, "RESERVED"),
    (KEY_ESC, "ESC"),
    (KEY_1, "1"),
    (KEY_2, "2"),
    (KEY_3, "3"),
    (KEY_4, "4"),
    (KEY_5, "5"),
    (KEY_6, "6"),
    (KEY_7, "7"),
    (KEY_8, "8"),
    (KEY_9, "9"),
    (KEY_0, "0"),
    (KEY_MINUS, "-"),
    (KEY_EQUAL, "="),
    (KEY_BACKSPACE, "BACKSPACE"),
    (KEY_TAB, "TAB"),
    (KEY_Q, "Q"),
    (KEY_W, "W"),
    (KEY_E, "E"),
    (KEY_R, "R"),
    (KEY_T, "T"),
    (KEY_Y, "Y"),
    (KEY_U, "U"),
    (KEY_I, "I"),
    (KEY_O, "O"),
    (KEY_P, "P"),
    (KEY_LEFTBRACE, "["),
    (KEY_RIGHTBRACE, "]"),
    (KEY_ENTER, "ENTER"),
    (KEY_LEFTCTRL, "LEFTCTRL"),
    (KEY_A, "A"),
    (KEY_S, "S"),
    (KEY_D, "D"),
    (KEY_F, "F"),
    (KEY_G, "G"),
    (KEY_H, "H"),
    (KEY_J, "J"),
    (KEY_K, "K"),
    (KEY_L, "L"),
    (KEY_SEMICOLON, ";"),
    (KEY_APOSTROPHE, "'"),
    (KEY_GRAVE, "`"),
    (KEY_LEFTSHIFT, "LEFTSHIFT"),
    (KEY_BACKSLASH, "\\"),
    (KEY_Z, "Z"),
    (KEY_X, "X"),
    (KEY_C, "C"),
    (KEY_V, "V"),
    (KEY_B, "B"),
    (KEY_N, "N"),
    (KEY_M, "M"),
    (KEY_COMMA, ","),
    (KEY_DOT, "."),
    (KEY_SLASH, "/"),
    (KEY_RIGHTSHIFT, "RIGHTSHIFT"),
    (KEY_KPASTERISK, "KPASTERISK"),
    (KEY_LEFTALT, "LEFTALT"),
    (KEY_SPACE, "SPACE"),
    (KEY_CAPSLOCK, "CAPSLOCK"),
    (KEY_F1, "F1"),
    (KEY_F2, "F2"),
    (KEY_F3, "F3"),
    (KEY_F4, "F4"),
    (KEY_F5, "F5"),
    (KEY_F6, "F6"),
    (KEY_F7, "F7"),
    (KEY_F8, "F8"),
    (KEY_F9, "F9"),
    (KEY_F10, "F10"),
    (KEY_NUMLOCK, "NUMLOCK"),
    (KEY_SCROLLLOCK, "SCROLLLOCK"),
    (KEY_KP7, "KP7"),
    (KEY_KP8, "KP8"),
    (KEY_KP9, "KP9"),
    (KEY_KPMINUS, "KPMINUS"),
    (KEY_KP4, "KP4"),
    (KEY_KP5, "KP5"),
    (KEY_KP6, "KP6"),
    (KEY_KPPLUS, "KPPLUS"),
    (KEY_KP1, "KP1"),
    (KEY_KP2, "KP2"),
    (KEY_KP3, "KP3"),
    (KEY_KP0, "KP0"),
    (KEY_KPDOT, "KPDOT"),
    (KEY_UP, "UP"),
    (KEY_DOWN, "DOWN"),
    (KEY_LEFT, "LEFT"),
    (KEY_RIGHT, "RIGHT"),
    (KEY_PAGEUP, "PAGEUP"),
    (KEY_PAGEDOWN, "PAGEDOWN"),
    (KEY_HOME, "HOME"),
    (KEY_END, "END"),
    (KEY_INSERT, "INSERT"),
    (KEY_DELETE, "DELETE"),
];

// Only keys whose printed symbol changes while shift is held.
const SHIFTED_SYMBOLS: &[(u16, &str)] = &[
    (KEY_1, "!"),
    (KEY_2, "@"),
    (KEY_3, "#"),
    (KEY_4, "$"),
    (KEY_5, "%"),
    (KEY_6, "^"),
    (KEY_7, "&"),
    (KEY_8, "*"),
    (KEY_9, "("),
    (KEY_0, ")"),
    (KEY_MINUS, "_"),
    (KEY_EQUAL, "+"),
    (KEY_LEFTBRACE, "{"),
    (KEY_RIGHTBRACE, "}"),
    (KEY_SEMICOLON, ":"),
    (KEY_APOSTROPHE, "\""),
    (KEY_GRAVE, "~"),
    (KEY_BACKSLASH, "|"),
    (KEY_COMMA, "<"),
    (KEY_DOT, ">"),
    (KEY_SLASH, "?"),
];

/// An immutable mapping from key codes to their base and shifted symbol names.
///
/// The table is never mutated after construction, so a single instance can be shared (e.g. behind
/// an [`Arc`](std::sync::Arc)) by any number of readers.
#[derive(Debug, Clone)]
pub struct KeyCodeTable {
    base: HashMap<u16, &'static str>,
    shifted: HashMap<u16, &'static str>,
}

impl KeyCodeTable {
    /// Build the US-like table.
    pub fn new() -> Self {
        Self {
            base: BASE_SYMBOLS.iter().copied().collect(),
            shifted: SHIFTED_SYMBOLS.iter().copied().collect(),
        }
    }

    /// The symbol of `code` with no modifiers held.
    ///
    /// Codes missing from the table resolve to `UNKNOWN_KEY_<code>`.
    pub fn resolve_base(&self, code: u16) -> Cow<'static, str> {
        match self.base.get(&code) {
            Some(symbol) => Cow::Borrowed(*symbol),
            None => Cow::Owned(format!("UNKNOWN_KEY_{code}")),
        }
    }

    /// The symbol of `code` while shift is held.
    ///
    /// Keys without a distinct shifted symbol fall back to [`KeyCodeTable::resolve_base`].
    pub fn resolve_shifted(&self, code: u16) -> Cow<'static, str> {
        match self.shifted.get(&code) {
            Some(symbol) => Cow::Borrowed(*symbol),
            None => self.resolve_base(code),
        }
    }

    /// Whether `code` has an entry in the base table.
    pub fn contains(&self, code: u16) -> bool {
        self.base.contains_key(&code)
    }
}

impl Default for KeyCodeTable {
    fn default() -> Self {
        Self::new()
    }
}
