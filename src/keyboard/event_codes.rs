// Event types understood by the decoder (see [input-event-codes.h] and the [kernel docs]).
//
// [input-event-codes.h]: https://elixir.bootlin.com/linux/v5.19.17/source/include/uapi/linux/input-event-codes.h#L38)
// [kernel docs]: https://www.kernel.org/doc/html/latest/input/event-codes.html
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_MSC: u16 = 0x04;
pub const EV_LED: u16 = 0x11;
pub const EV_REP: u16 = 0x14;

/// The `value` of an EV_KEY caused by a key being released.
pub const EV_KEY_RELEASE: i32 = 0;
/// The `value` of an EV_KEY caused by a key press.
pub const EV_KEY_PRESS: i32 = 1;
/// The `value` of an EV_KEY generated while a key is held down.
pub const EV_KEY_AUTOREPEAT: i32 = 2;

/// The event-type bitmap of a typical keyboard: SYN, KEY, MSC, LED and REP (`0x120013`).
pub const KEYBOARD_EV_BITS: u64 =
    (1 << EV_SYN) | (1 << EV_KEY) | (1 << EV_MSC) | (1 << EV_LED) | (1 << EV_REP);
