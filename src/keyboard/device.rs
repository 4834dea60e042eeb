use std::fs::File;
use std::io::{self, Read};
use std::mem;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::ready;
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::KbdlogError;
use crate::keyboard::event_codes::{EV_KEY, EV_MSC, EV_REP, EV_SYN};
use crate::KbdlogResult;

const IOC_NRBITS: libc::c_ulong = 8;
const IOC_TYPEBITS: libc::c_ulong = 8;
const IOC_SIZEBITS: libc::c_ulong = 14;
const IOC_NRSHIFT: libc::c_ulong = 0;
const IOC_TYPESHIFT: libc::c_ulong = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: libc::c_ulong = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: libc::c_ulong = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_READ: libc::c_ulong = 2;

/// An open event device (e.g. `/dev/input/event3`), read without blocking the runtime.
///
/// The file descriptor is closed when the `EventDevice` is dropped.
#[derive(Debug)]
pub struct EventDevice {
    path: PathBuf,
    async_fd: AsyncFd<File>,
}

impl EventDevice {
    /// Open `path` read-only and register it with the runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(path: &Path) -> KbdlogResult<Self> {
        let open_err = |source| KbdlogError::DeviceOpen {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_err)?;
        set_nonblocking(&file).map_err(open_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            async_fd: AsyncFd::new(file).map_err(open_err)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the name of the device using the `EVIOCGNAME` ioctl.
    pub fn name(&self) -> io::Result<String> {
        read_name(self.async_fd.get_ref())
    }

    /// Read the event types supported by the device using the `EVIOCGBIT` ioctl.
    pub fn event_flags(&self) -> io::Result<libc::c_ulong> {
        read_event_flags(self.async_fd.get_ref())
    }
}

impl AsyncRead for EventDevice {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            let mut guard = ready!(this.async_fd.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();

            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(n)) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                // Spurious readiness
                Err(_would_block) => continue,
            }
        }
    }
}

/// Check whether the specified `flags` indicate the device is a keyboard.
pub(crate) fn has_keyboard_flags(flags: libc::c_ulong) -> bool {
    const KEYBOARD_FLAGS: libc::c_ulong =
        (1 << EV_SYN) | (1 << EV_KEY) | (1 << EV_MSC) | (1 << EV_REP);

    (flags & KEYBOARD_FLAGS) == KEYBOARD_FLAGS
}

/// Set the `O_NONBLOCK` flag for the specified file descriptor.
fn set_nonblocking(f: &File) -> io::Result<()> {
    let res = unsafe { libc::fcntl(f.as_raw_fd(), libc::F_SETFL, libc::O_NONBLOCK) };

    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

fn read_name(f: &File) -> io::Result<String> {
    const DEVICE_NAME_MAX_LEN: usize = 256;

    let mut device_name = [0u8; DEVICE_NAME_MAX_LEN];

    let eviocgname = (IOC_READ << IOC_DIRSHIFT)
        | (('E' as libc::c_ulong) << IOC_TYPESHIFT)
        | (0x06 << IOC_NRSHIFT)
        | ((device_name.len() as libc::c_ulong) << IOC_SIZESHIFT);

    ioctl(
        f.as_raw_fd(),
        eviocgname,
        device_name.as_mut_ptr() as *mut libc::c_ulong,
    )?;

    let len = device_name
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(device_name.len());

    Ok(String::from_utf8_lossy(&device_name[..len]).into())
}

fn read_event_flags(f: &File) -> io::Result<libc::c_ulong> {
    let mut ev_flags: libc::c_ulong = 0;

    let eviocgbit = (IOC_READ << IOC_DIRSHIFT)
        | (('E' as libc::c_ulong) << IOC_TYPESHIFT)
        | (0x20 << IOC_NRSHIFT)
        | ((mem::size_of::<libc::c_ulong>() as libc::c_ulong) << IOC_SIZESHIFT);

    ioctl(
        f.as_raw_fd(),
        eviocgbit,
        (&mut ev_flags) as *mut libc::c_ulong,
    )?;

    Ok(ev_flags)
}

fn ioctl(fd: RawFd, request: libc::c_ulong, buf: *mut libc::c_ulong) -> io::Result<()> {
    let res = unsafe { libc::ioctl(fd, request as _, buf) };

    if res < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::event_codes::EV_LED;

    #[test]
    fn keyboard_flags() {
        assert!(has_keyboard_flags(0x120013));
        assert!(has_keyboard_flags(0x100013));
        // Mouse: SYN, KEY, REL, MSC
        assert!(!has_keyboard_flags(0x17));
        assert!(!has_keyboard_flags(1 << EV_LED));
    }

    #[test]
    fn open_missing_device() {
        let path = std::env::temp_dir().join(format!("kbdlog-{}-no-event0", std::process::id()));
        let err = EventDevice::open(&path).unwrap_err();

        assert!(matches!(err, KbdlogError::DeviceOpen { .. }));
    }
}
