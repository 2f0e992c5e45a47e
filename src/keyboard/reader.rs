//! Per-keyboard input event reader

use super::source::{EventSource, ReadMode, ReadStatus};
use super::KeyEvent;
use crate::error::{Error, Result};
use log::{debug, trace};
use std::path::{Path, PathBuf};

/// Turns an [`EventSource`] into a stream of tracked key transitions
pub struct InputEventReader<S> {
    source: S,
    path: PathBuf,
    resyncs: u64,
}

impl<S: EventSource> InputEventReader<S> {
    pub fn new(path: impl Into<PathBuf>, source: S) -> Self {
        Self {
            source,
            path: path.into(),
            resyncs: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of desynchronizations recovered from so far
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    /// Block for the next transition of a tracked key.
    ///
    /// Returns `Ok(None)` when the source would block or a resync was just
    /// drained, so the caller gets a chance to check for cancellation.
    pub fn next_transition(&mut self) -> Result<Option<KeyEvent>> {
        match self.read(ReadMode::Normal)? {
            ReadStatus::Event(event) if event.key.is_tracked() => {
                trace!(
                    "{}: {} {:?}",
                    self.path.display(),
                    event.key,
                    event.event_type
                );
                Ok(Some(event))
            }
            ReadStatus::Event(_) | ReadStatus::WouldBlock => Ok(None),
            ReadStatus::Resync => {
                self.drain()?;
                Ok(None)
            }
        }
    }

    // Discard the dropped frame without emitting anything
    fn drain(&mut self) -> Result<()> {
        self.resyncs += 1;
        let mut discarded = 0usize;
        while self.read(ReadMode::Sync)? == ReadStatus::Resync {
            discarded += 1;
        }
        debug!(
            "{}: resynchronized after dropped events ({} discarded)",
            self.path.display(),
            discarded
        );
        Ok(())
    }

    fn read(&mut self, mode: ReadMode) -> Result<ReadStatus> {
        self.source
            .next_event(mode)
            .map_err(|e| Error::io(&self.path, e))
    }
}
