//! Serializes reports from every keyboard session onto the one gadget endpoint

use super::report::{JoystickReport, REPORT_SIZE};
use crate::error::{Error, Result};
use log::trace;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback a keyboard session hands each recomputed report to
pub type ReportCallback = Box<dyn FnMut(JoystickReport) -> Result<()> + Send>;

/// Shared write handle of the HID function.
///
/// The lock covers only the single `write` call, so sessions never hold it
/// while blocked on keyboard input.
pub struct ReportMultiplexer<W> {
    endpoint: Mutex<W>,
    path: PathBuf,
    written: AtomicU64,
}

impl<W: Write> ReportMultiplexer<W> {
    pub fn new(path: impl Into<PathBuf>, endpoint: W) -> Self {
        Self {
            endpoint: Mutex::new(endpoint),
            path: path.into(),
            written: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reports successfully written so far
    pub fn reports_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Write one report as a single 4-byte write
    pub fn write(&self, report: &JoystickReport) -> Result<()> {
        let bytes = report.to_bytes();
        let result = self.endpoint.lock().write(&bytes);

        match result {
            Ok(REPORT_SIZE) => {
                self.written.fetch_add(1, Ordering::Relaxed);
                trace!("{}: report {:02x?}", self.path.display(), bytes);
                Ok(())
            }
            Ok(n) => Err(Error::io(
                &self.path,
                io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {} of {} bytes", n, REPORT_SIZE),
                ),
            )),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }
}

impl<W: Write + Send + 'static> ReportMultiplexer<W> {
    /// Callback bound to this multiplexer, for one keyboard session
    pub fn callback(self: &Arc<Self>) -> ReportCallback {
        let mux = Arc::clone(self);
        Box::new(move |report| mux.write(&report))
    }
}
