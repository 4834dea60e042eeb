use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KbdlogError {
    #[error("failed to read {}: {source} (are you root?)", path.display())]
    DeviceEnumeration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not find a keyboard device in {}", path.display())]
    KeyboardNotFound { path: PathBuf },
    #[error("cannot open device {}: {source} (are you root?)", path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read from the input device: {0}")]
    DeviceRead(#[source] io::Error),
    #[error("caps lock state unavailable: {0}")]
    LedStateUnavailable(String),
    #[error("failed to write key presses to {target}: {source}")]
    LogWrite {
        target: String,
        #[source]
        source: io::Error,
    },
}
