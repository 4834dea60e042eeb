pub(crate) mod device;
pub mod event_codes;

use std::borrow::Cow;
use std::io;
use std::mem;
use std::pin::Pin;
use std::ptr;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Local};
use futures::{ready, Stream};
use log::{debug, trace};
use pin_project::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::KbdlogError;
use crate::key_code::KeyCodeTable;
use crate::modifier::{ModifierState, ModifierTracker};
use crate::KbdlogResult;

pub use device::EventDevice;
use event_codes::{EV_KEY, EV_KEY_PRESS};

/// The size of one `struct input_event` as read from an event device.
pub const RECORD_SIZE: usize = mem::size_of::<libc::input_event>();

/// The kernel timestamp of an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventTime {
    pub sec: i64,
    pub usec: i64,
}

impl EventTime {
    /// The timestamp in local time, if it is representable.
    pub fn to_local(self) -> Option<DateTime<Local>> {
        let nsec = u32::try_from(self.usec.checked_mul(1000)?).ok()?;

        DateTime::from_timestamp(self.sec, nsec).map(|ts| ts.with_timezone(&Local))
    }
}

/// One record read from an event device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub time: EventTime,
    /// The event class (`EV_KEY`, `EV_SYN`, ...).
    pub type_: u16,
    pub code: u16,
    /// 0 = release, 1 = press, 2 = autorepeat for `EV_KEY`.
    pub value: i32,
}

impl RawEvent {
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        // SAFETY: `input_event` is plain old data of exactly RECORD_SIZE bytes, so any byte
        // pattern is a valid value.
        let ev: libc::input_event = unsafe { ptr::read_unaligned(bytes.as_ptr().cast()) };

        Self::from(&ev)
    }

    pub fn is_key(&self) -> bool {
        self.type_ == EV_KEY
    }
}

impl From<&libc::input_event> for RawEvent {
    #[allow(clippy::useless_conversion)]
    fn from(ev: &libc::input_event) -> Self {
        Self {
            time: EventTime {
                sec: ev.time.tv_sec.into(),
                usec: ev.time.tv_usec.into(),
            },
            type_: ev.type_,
            code: ev.code,
            value: ev.value,
        }
    }
}

/// A key press resolved to its symbol name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKeyPress {
    pub symbol: Cow<'static, str>,
    pub code: u16,
    pub time: EventTime,
    /// The modifiers in effect when the key went down.
    pub modifiers: ModifierState,
}

/// Turns raw events into key presses, tracking modifiers on the way.
#[derive(Debug)]
pub struct KeyResolver {
    table: Arc<KeyCodeTable>,
    modifiers: ModifierTracker,
}

impl KeyResolver {
    pub fn new(table: Arc<KeyCodeTable>, modifiers: ModifierTracker) -> Self {
        Self { table, modifiers }
    }

    pub fn modifiers(&self) -> &ModifierTracker {
        &self.modifiers
    }

    /// Decode one record.
    ///
    /// Every `EV_KEY` record updates the modifier state, but only presses (value 1) produce a
    /// [`ResolvedKeyPress`]. Records of other types are ignored.
    pub fn decode(&mut self, ev: &RawEvent) -> Option<ResolvedKeyPress> {
        trace!(
            "event: type={} code={} value={}",
            ev.type_,
            ev.code,
            ev.value
        );

        if !ev.is_key() {
            return None;
        }

        self.modifiers.observe(ev.code, ev.value);

        if ev.value != EV_KEY_PRESS {
            return None;
        }

        let symbol = if self.modifiers.shift_active() {
            self.table.resolve_shifted(ev.code)
        } else {
            self.table.resolve_base(ev.code)
        };

        Some(ResolvedKeyPress {
            symbol,
            code: ev.code,
            time: ev.time,
            modifiers: self.modifiers.state(),
        })
    }
}

/// A [`Stream`] of key presses decoded from an event device (or any [`AsyncRead`] yielding
/// `input_event` records).
///
/// The stream ends when the reader reaches end-of-file. A read error is yielded once as
/// [`KbdlogError::DeviceRead`], after which the stream is finished.
#[pin_project]
pub struct EventDecoder<R> {
    #[pin]
    reader: R,
    resolver: KeyResolver,
    buf: [u8; RECORD_SIZE],
    done: bool,
}

impl<R: AsyncRead> EventDecoder<R> {
    pub fn new(reader: R, table: Arc<KeyCodeTable>, modifiers: ModifierTracker) -> Self {
        Self {
            reader,
            resolver: KeyResolver::new(table, modifiers),
            buf: [0; RECORD_SIZE],
            done: false,
        }
    }

    pub fn modifiers(&self) -> &ModifierTracker {
        self.resolver.modifiers()
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }
}

impl<R: AsyncRead> Stream for EventDecoder<R> {
    type Item = KbdlogResult<ResolvedKeyPress>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        loop {
            let mut buf = ReadBuf::new(&mut this.buf[..]);

            match ready!(this.reader.as_mut().poll_read(cx, &mut buf)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(KbdlogError::DeviceRead(e))));
                }
            }

            let n = buf.filled().len();

            if n == 0 {
                *this.done = true;
                return Poll::Ready(None);
            }

            // Partial records are never interpreted
            if n != RECORD_SIZE {
                debug!("skipping short read of {n} bytes (expected {RECORD_SIZE})");
                continue;
            }

            let event = RawEvent::from_bytes(&*this.buf);

            if let Some(press) = this.resolver.decode(&event) {
                return Poll::Ready(Some(Ok(press)));
            }
        }
    }
}

/// Encode a record the way the kernel lays it out.
#[cfg(test)]
pub(crate) fn encode(type_: u16, code: u16, value: i32) -> Vec<u8> {
    let ev = libc::input_event {
        time: libc::timeval {
            tv_sec: 1_700_000_000,
            tv_usec: 250_000,
        },
        type_,
        code,
        value,
    };

    // SAFETY: reading the bytes of a fully initialized `input_event`.
    let bytes = unsafe {
        std::slice::from_raw_parts((&ev as *const libc::input_event).cast::<u8>(), RECORD_SIZE)
    };

    bytes.to_vec()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::key_code::{KEY_1, KEY_A, KEY_CAPSLOCK, KEY_LEFTSHIFT, KEY_Q, KEY_RIGHTSHIFT};
    use super::event_codes::{EV_KEY_AUTOREPEAT, EV_KEY_RELEASE, EV_LED, EV_MSC, EV_SYN};
    use futures::StreamExt;
    use std::collections::VecDeque;

    /// An [`AsyncRead`] that hands out one scripted chunk (or error) per read.
    pub(crate) struct ScriptedReader(pub(crate) VecDeque<io::Result<Vec<u8>>>);

    impl ScriptedReader {
        pub(crate) fn new(chunks: impl IntoIterator<Item = io::Result<Vec<u8>>>) -> Self {
            Self(chunks.into_iter().collect())
        }
    }

    impl AsyncRead for ScriptedReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.get_mut().0.pop_front() {
                Some(Ok(chunk)) => {
                    buf.put_slice(&chunk);
                    Poll::Ready(Ok(()))
                }
                Some(Err(e)) => Poll::Ready(Err(e)),
                None => Poll::Ready(Ok(())),
            }
        }
    }

    pub(crate) fn key(code: u16, value: i32) -> Vec<u8> {
        encode(EV_KEY, code, value)
    }

    pub(crate) fn syn() -> Vec<u8> {
        encode(EV_SYN, 0, 0)
    }

    pub(crate) fn stream(records: &[Vec<u8>]) -> Vec<u8> {
        records.concat()
    }

    fn decoder<R: AsyncRead>(reader: R) -> EventDecoder<R> {
        EventDecoder::new(reader, Arc::new(KeyCodeTable::new()), ModifierTracker::new())
    }

    async fn symbols<R: AsyncRead + Unpin>(decoder: EventDecoder<R>) -> Vec<String> {
        decoder
            .map(|press| press.unwrap().symbol.into_owned())
            .collect()
            .await
    }

    #[test]
    fn record_layout() {
        let bytes = encode(EV_KEY, KEY_Q, EV_KEY_PRESS);
        let ev = RawEvent::from_bytes(bytes.as_slice().try_into().unwrap());

        assert_eq!(
            ev,
            RawEvent {
                time: EventTime {
                    sec: 1_700_000_000,
                    usec: 250_000,
                },
                type_: EV_KEY,
                code: KEY_Q,
                value: EV_KEY_PRESS,
            }
        );
        assert!(ev.is_key());
    }

    #[test]
    fn event_time() {
        let time = EventTime {
            sec: 1_700_000_000,
            usec: 250_000,
        };
        let local = time.to_local().unwrap();

        assert_eq!(local.timestamp(), 1_700_000_000);
        assert_eq!(local.timestamp_subsec_micros(), 250_000);

        let invalid = EventTime {
            sec: 0,
            usec: -1,
        };
        assert_eq!(invalid.to_local(), None);
    }

    #[test]
    fn release_and_autorepeat_are_not_emitted() {
        let mut resolver = KeyResolver::new(Arc::new(KeyCodeTable::new()), ModifierTracker::new());
        let event = |value| RawEvent {
            time: EventTime::default(),
            type_: EV_KEY,
            code: KEY_A,
            value,
        };

        assert_eq!(resolver.decode(&event(EV_KEY_RELEASE)), None);
        assert_eq!(resolver.decode(&event(EV_KEY_AUTOREPEAT)), None);

        let press = resolver.decode(&event(EV_KEY_PRESS)).unwrap();
        assert_eq!(press.symbol, "A");
        assert_eq!(press.code, KEY_A);
    }

    #[test]
    fn other_event_types_are_ignored() {
        let mut resolver = KeyResolver::new(Arc::new(KeyCodeTable::new()), ModifierTracker::new());

        for type_ in [EV_SYN, EV_MSC, EV_LED] {
            let event = RawEvent {
                time: EventTime::default(),
                type_,
                code: KEY_LEFTSHIFT,
                value: EV_KEY_PRESS,
            };

            assert_eq!(resolver.decode(&event), None);
            assert!(!resolver.modifiers().shift_active());
        }
    }

    #[tokio::test]
    async fn press_release_emits_once() {
        let input = stream(&[key(KEY_Q, EV_KEY_PRESS), syn(), key(KEY_Q, EV_KEY_RELEASE), syn()]);

        assert_eq!(symbols(decoder(input.as_slice())).await, ["Q"]);
    }

    #[tokio::test]
    async fn shifted_press() {
        let input = stream(&[
            key(KEY_LEFTSHIFT, EV_KEY_PRESS),
            key(KEY_Q, EV_KEY_PRESS),
            key(KEY_Q, EV_KEY_RELEASE),
            key(KEY_1, EV_KEY_PRESS),
            key(KEY_1, EV_KEY_RELEASE),
            key(KEY_LEFTSHIFT, EV_KEY_RELEASE),
            key(KEY_1, EV_KEY_PRESS),
        ]);

        // Letters have no distinct shifted symbol
        assert_eq!(
            symbols(decoder(input.as_slice())).await,
            ["LEFTSHIFT", "Q", "!", "1"]
        );
    }

    #[tokio::test]
    async fn shift_survives_autorepeat() {
        let input = stream(&[
            key(KEY_RIGHTSHIFT, EV_KEY_PRESS),
            key(KEY_RIGHTSHIFT, EV_KEY_AUTOREPEAT),
            key(KEY_RIGHTSHIFT, EV_KEY_AUTOREPEAT),
            key(KEY_1, EV_KEY_PRESS),
        ]);

        let presses: Vec<_> = decoder(input.as_slice())
            .map(|press| press.unwrap())
            .collect()
            .await;

        assert_eq!(presses.len(), 2);
        assert_eq!(presses[1].symbol, "!");
        assert!(presses[1].modifiers.shift);
    }

    #[tokio::test]
    async fn caps_lock_is_reported() {
        let input = stream(&[
            key(KEY_CAPSLOCK, EV_KEY_PRESS),
            key(KEY_CAPSLOCK, EV_KEY_RELEASE),
            key(KEY_A, EV_KEY_PRESS),
        ]);

        let presses: Vec<_> = decoder(input.as_slice())
            .map(|press| press.unwrap())
            .collect()
            .await;

        assert_eq!(presses[0].symbol, "CAPSLOCK");
        assert_eq!(presses[1].symbol, "A");
        assert!(presses[1].modifiers.caps_lock);
    }

    #[tokio::test]
    async fn short_reads_are_skipped() {
        let press = key(KEY_A, EV_KEY_PRESS);
        let reader = ScriptedReader::new([
            Ok(press[..RECORD_SIZE / 2].to_vec()),
            Ok(press[RECORD_SIZE / 2..].to_vec()),
            Ok(key(KEY_Q, EV_KEY_PRESS)),
        ]);

        assert_eq!(symbols(decoder(reader)).await, ["Q"]);
    }

    #[tokio::test]
    async fn interrupted_reads_are_retried() {
        let reader = ScriptedReader::new([
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(key(KEY_Q, EV_KEY_PRESS)),
        ]);

        assert_eq!(symbols(decoder(reader)).await, ["Q"]);
    }

    #[tokio::test]
    async fn read_error_ends_the_stream() {
        let reader = ScriptedReader::new([
            Ok(key(KEY_A, EV_KEY_PRESS)),
            Err(io::Error::from_raw_os_error(libc::ENODEV)),
            Ok(key(KEY_Q, EV_KEY_PRESS)),
        ]);
        let mut decoder = decoder(reader);

        assert_eq!(decoder.next().await.unwrap().unwrap().symbol, "A");
        assert!(matches!(
            decoder.next().await,
            Some(Err(KbdlogError::DeviceRead(_)))
        ));
        assert!(decoder.next().await.is_none());
        assert_eq!(decoder.get_ref().0.len(), 1);
    }

    #[tokio::test]
    async fn empty_stream() {
        assert!(symbols(decoder(&[][..])).await.is_empty());
    }
}
