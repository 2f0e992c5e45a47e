//! One keyboard driving one virtual joystick

use crate::error::Result;
use crate::hid::ReportCallback;
use crate::keyboard::{EvdevSource, EventSource, InputEventReader, JoystickState};
use log::{info, trace};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Read-decode-dispatch loop of a single keyboard.
///
/// Owns the device handle and key state exclusively; the only thing it
/// shares is the report callback.
pub struct KeyboardSession<S> {
    reader: InputEventReader<S>,
    joystick: JoystickState,
    callback: ReportCallback,
    reports: u64,
}

impl KeyboardSession<EvdevSource> {
    /// Open the keyboard at `path` for the joystick with `report_id`
    pub fn open(path: &Path, report_id: u8, callback: ReportCallback) -> Result<Self> {
        let source = EvdevSource::open(path)?;
        Ok(Self::new(path, source, report_id, callback))
    }
}

impl<S: EventSource> KeyboardSession<S> {
    pub fn new(
        path: impl Into<PathBuf>,
        source: S,
        report_id: u8,
        callback: ReportCallback,
    ) -> Self {
        Self {
            reader: InputEventReader::new(path, source),
            joystick: JoystickState::new(report_id),
            callback,
            reports: 0,
        }
    }

    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    pub fn report_id(&self) -> u8 {
        self.joystick.report_id()
    }

    pub fn joystick(&self) -> &JoystickState {
        &self.joystick
    }

    /// Reports delivered to the callback so far
    pub fn reports_sent(&self) -> u64 {
        self.reports
    }

    /// Handle one read.
    ///
    /// Returns `true` when a key transition produced a report.
    pub fn process(&mut self) -> Result<bool> {
        let Some(event) = self.reader.next_transition()? else {
            return Ok(false);
        };
        let Some(report) = self.joystick.apply(&event) else {
            return Ok(false);
        };
        trace!(
            "{}: joystick {} -> {:02x?}",
            self.path().display(),
            report.report_id,
            report.to_bytes()
        );
        (self.callback)(report)?;
        self.reports += 1;
        Ok(true)
    }

    /// Run until `cancel` is raised or a read or write fails.
    ///
    /// The flag is only checked between reads, so an idle keyboard keeps the
    /// session blocked until its next event.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<()> {
        info!(
            "{}: driving joystick {}",
            self.path().display(),
            self.report_id()
        );
        while !cancel.load(Ordering::Relaxed) {
            self.process()?;
        }
        info!(
            "{}: session stopped after {} report(s), {} resync(s)",
            self.path().display(),
            self.reports,
            self.reader.resync_count()
        );
        Ok(())
    }
}
