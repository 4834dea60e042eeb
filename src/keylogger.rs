use std::path::PathBuf;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use log::{info, warn};
use tokio::io::AsyncRead;

use crate::config::Config;
use crate::key_code::KeyCodeTable;
use crate::keyboard::device::has_keyboard_flags;
use crate::keyboard::{EventDecoder, EventDevice, ResolvedKeyPress};
use crate::modifier::ModifierTracker;
use crate::sink::KeyPressSink;
use crate::KbdlogResult;

/// Finds the keyboard, decodes its events and hands every key press to a sink.
pub struct Keylogger {
    config: Config,
    table: Arc<KeyCodeTable>,
}

impl Keylogger {
    /// Create a new `Keylogger`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            table: Arc::new(KeyCodeTable::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configured device, or the first keyboard listed in the enumeration file.
    pub fn keyboard_path(&self) -> KbdlogResult<PathBuf> {
        match &self.config.device {
            Some(device) => Ok(device.clone()),
            None => self.config.locator().locate(),
        }
    }

    /// A modifier tracker seeded with the current caps-lock LED, if it can be read.
    pub fn initial_modifiers(&self) -> ModifierTracker {
        let Some(probe) = self.config.led_probe() else {
            return ModifierTracker::new();
        };

        match probe.caps_lock() {
            Ok(caps_lock) => ModifierTracker::with_caps_lock(caps_lock),
            Err(e) => {
                warn!("{e}; assuming caps lock is off");
                ModifierTracker::new()
            }
        }
    }

    /// Decode the records produced by `reader`.
    pub fn decoder<R: AsyncRead>(&self, reader: R) -> EventDecoder<R> {
        EventDecoder::new(reader, Arc::clone(&self.table), self.initial_modifiers())
    }

    /// Capture key presses until the device stream ends or an error occurs.
    ///
    /// The device is closed before this returns, whatever the outcome. Dropping the returned
    /// future closes it as well.
    pub async fn capture(&self, sink: &mut impl KeyPressSink) -> KbdlogResult<()> {
        let path = self.keyboard_path()?;
        let device = EventDevice::open(&path)?;

        let name = device.name().unwrap_or_else(|_| "unknown".to_owned());
        info!("found keyboard device at {} ({name})", path.display());

        if self.config.device.is_some() {
            match device.event_flags() {
                Ok(flags) if !has_keyboard_flags(flags) => {
                    warn!("{} does not look like a keyboard (EV={flags:x})", path.display())
                }
                Ok(_) => {}
                Err(e) => warn!("cannot query the capabilities of {}: {e}", path.display()),
            }
        }

        info!("listening for key presses");

        let count = drain(self.decoder(device), sink).await?;
        info!("device stream ended after {count} key presses");

        Ok(())
    }
}

/// Forward every key press from `presses` to `sink`, returning how many were written.
///
/// Stops at the first decoding or sink error.
pub async fn drain<S>(mut presses: S, sink: &mut impl KeyPressSink) -> KbdlogResult<u64>
where
    S: Stream<Item = KbdlogResult<ResolvedKeyPress>> + Unpin,
{
    let mut count = 0;

    while let Some(press) = presses.next().await {
        sink.emit(&press?)?;
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KbdlogError;
    use crate::key_code::{KEY_1, KEY_LEFTSHIFT, KEY_Q};
    use crate::keyboard::event_codes::{EV_KEY_PRESS, EV_KEY_RELEASE};
    use crate::keyboard::tests::{key, stream, syn, ScriptedReader};
    use crate::locator::KeyboardCapability;
    use crate::sink::LineSink;
    use std::fs;
    use std::io;
    use std::path::Path;

    const DEVICES: &str = "\
I: Bus=0011 Vendor=0002 Product=0013 Version=0006
N: Name=\"VirtualPS/2 VMware VMMouse\"
H: Handlers=mouse0 event2
B: EV=b

I: Bus=0011 Vendor=0001 Product=0001 Version=ab41
N: Name=\"AT Translated Set 2 keyboard\"
H: Handlers=sysrq kbd event3 leds
B: PROP=0
B: EV=120013
B: KEY=402000000 3803078f800d001 feffffdfffefffff fffffffffffffffe
";

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kbdlog-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config(dir: &Path) -> Config {
        Config {
            devices_file: dir.join("devices"),
            device_dir: PathBuf::from("/dev/input"),
            device: None,
            capability: KeyboardCapability::exact(),
            leds_dir: Some(dir.join("leds")),
        }
    }

    #[test]
    fn locates_keyboard_from_enumeration_file() {
        let dir = scratch_dir("locate");
        fs::write(dir.join("devices"), DEVICES).unwrap();

        let keylogger = Keylogger::new(config(&dir));
        assert_eq!(
            keylogger.keyboard_path().unwrap(),
            Path::new("/dev/input/event3")
        );

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn configured_device_skips_discovery() {
        let dir = scratch_dir("configured");
        let config = Config {
            device: Some(PathBuf::from("/dev/input/event9")),
            ..config(&dir)
        };

        // No enumeration file exists in `dir`
        let keylogger = Keylogger::new(config);
        assert_eq!(
            keylogger.keyboard_path().unwrap(),
            Path::new("/dev/input/event9")
        );

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_enumeration_file() {
        let dir = scratch_dir("noenum");

        let err = Keylogger::new(config(&dir)).keyboard_path().unwrap_err();
        assert!(matches!(err, KbdlogError::DeviceEnumeration { .. }));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn caps_lock_seeded_from_led() {
        let dir = scratch_dir("leds");
        let led = dir.join("leds").join("input3::capslock");
        fs::create_dir_all(&led).unwrap();
        fs::write(led.join("brightness"), "1\n").unwrap();

        let keylogger = Keylogger::new(config(&dir));
        assert!(keylogger.initial_modifiers().caps_lock_active());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn unavailable_led_is_not_fatal() {
        let dir = scratch_dir("noleds");

        let keylogger = Keylogger::new(config(&dir));
        assert!(!keylogger.initial_modifiers().caps_lock_active());

        let keylogger = Keylogger::new(Config {
            leds_dir: None,
            ..config(&dir)
        });
        assert!(!keylogger.initial_modifiers().caps_lock_active());

        fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn end_to_end() {
        let dir = scratch_dir("e2e");
        let keylogger = Keylogger::new(config(&dir));

        let input = stream(&[
            key(KEY_Q, EV_KEY_PRESS),
            syn(),
            key(KEY_Q, EV_KEY_RELEASE),
            syn(),
            key(KEY_LEFTSHIFT, EV_KEY_PRESS),
            key(KEY_Q, EV_KEY_PRESS),
            key(KEY_Q, EV_KEY_RELEASE),
            key(KEY_1, EV_KEY_PRESS),
            key(KEY_1, EV_KEY_RELEASE),
            key(KEY_LEFTSHIFT, EV_KEY_RELEASE),
        ]);

        let mut sink = LineSink::new(Vec::new(), "buffer");
        let count = drain(keylogger.decoder(input.as_slice()), &mut sink)
            .await
            .unwrap();
        assert_eq!(count, 4);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let symbols: Vec<_> = out
            .lines()
            .map(|l| l.rsplit(' ').next().unwrap())
            .collect();
        assert_eq!(symbols, ["Q", "LEFTSHIFT", "Q", "!"]);

        fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn read_error_stops_capture() {
        let keylogger = Keylogger::new(Config {
            leds_dir: None,
            ..Config::default()
        });
        let reader = ScriptedReader::new([
            Ok(key(KEY_Q, EV_KEY_PRESS)),
            Err(io::Error::from_raw_os_error(libc::ENODEV)),
            Ok(key(KEY_1, EV_KEY_PRESS)),
        ]);

        let mut sink: Vec<ResolvedKeyPress> = Vec::new();
        let err = drain(keylogger.decoder(reader), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, KbdlogError::DeviceRead(_)));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].symbol, "Q");
    }

    #[tokio::test]
    async fn sink_error_stops_capture() {
        struct Full;

        impl KeyPressSink for Full {
            fn emit(&mut self, _press: &ResolvedKeyPress) -> KbdlogResult<()> {
                Err(KbdlogError::LogWrite {
                    target: "full".to_owned(),
                    source: io::Error::new(io::ErrorKind::Other, "no space left"),
                })
            }
        }

        let keylogger = Keylogger::new(Config {
            leds_dir: None,
            ..Config::default()
        });
        let reader = ScriptedReader::new([Ok(key(KEY_Q, EV_KEY_PRESS)), Ok(key(KEY_1, EV_KEY_PRESS))]);
        let mut decoder = keylogger.decoder(reader);

        let err = drain(&mut decoder, &mut Full).await.unwrap_err();

        assert!(matches!(err, KbdlogError::LogWrite { .. }));
        // The second record was never read
        assert_eq!(decoder.get_ref().0.len(), 1);
    }
}
