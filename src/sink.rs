use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::error::KbdlogError;
use crate::keyboard::{EventTime, ResolvedKeyPress};
use crate::KbdlogResult;

/// Receives every resolved key press.
///
/// A failing sink stops the capture: there is no point in reading keys that cannot be recorded.
pub trait KeyPressSink {
    fn emit(&mut self, press: &ResolvedKeyPress) -> KbdlogResult<()>;
}

impl KeyPressSink for Vec<ResolvedKeyPress> {
    fn emit(&mut self, press: &ResolvedKeyPress) -> KbdlogResult<()> {
        self.push(press.clone());
        Ok(())
    }
}

/// Writes one `<timestamp> <symbol>` line per key press, flushing after each line.
#[derive(Debug)]
pub struct LineSink<W> {
    out: W,
    target: String,
}

impl<W: Write> LineSink<W> {
    /// Wrap `out`. `target` names the destination in error messages.
    pub fn new(out: W, target: impl Into<String>) -> Self {
        Self {
            out,
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, press: &ResolvedKeyPress) -> io::Result<()> {
        writeln!(self.out, "{} {}", format_time(press.time), press.symbol)?;
        self.out.flush()
    }
}

impl<W: Write + 'static> LineSink<W> {
    /// Erase the writer type, e.g. to choose between a file and stdout at runtime.
    pub fn boxed(self) -> LineSink<Box<dyn Write>> {
        LineSink::new(Box::new(self.out) as Box<dyn Write>, self.target)
    }
}

impl LineSink<File> {
    /// Open `path` for appending, creating it if needed. Existing contents are never truncated.
    pub fn append(path: &Path) -> KbdlogResult<Self> {
        let target = path.display().to_string();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| KbdlogError::LogWrite {
                target: target.clone(),
                source,
            })?;

        Ok(Self::new(file, target))
    }
}

impl LineSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), "<stdout>")
    }
}

impl<W: Write> KeyPressSink for LineSink<W> {
    fn emit(&mut self, press: &ResolvedKeyPress) -> KbdlogResult<()> {
        self.write_line(press)
            .map_err(|source| KbdlogError::LogWrite {
                target: self.target.clone(),
                source,
            })
    }
}

fn format_time(time: EventTime) -> String {
    match time.to_local() {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        None => format!("{}.{:06}", time.sec, time.usec),
    }
}
