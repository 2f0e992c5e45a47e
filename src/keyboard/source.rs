//! Kernel input-event source
//!
//! Decodes the evdev event stream of one keyboard into key transitions.
//! A `SYN_DROPPED` from the driver surfaces as [`ReadStatus::Resync`]; the
//! caller then reads in [`ReadMode::Sync`] until the dropped frame is drained.

use super::{KeyCode, KeyEvent, KeyEventType};
use crate::error::{Error, Result};
use evdev::raw_stream::RawDevice;
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::time::SystemTime;

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_MSC: u16 = 0x04;

const SYN_REPORT: u16 = 0;
const SYN_DROPPED: u16 = 3;

const KEY_RELEASE: i32 = 0;
const KEY_PRESS: i32 = 1;

/// How the next event should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Regular decoding
    Normal,
    /// Draining after a desynchronization
    Sync,
}

/// Outcome of one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// A key press or release
    Event(KeyEvent),
    /// The driver dropped events; in `Sync` mode, one more stale event discarded
    Resync,
    /// Nothing to deliver right now (or, in `Sync` mode, the drain is complete)
    WouldBlock,
}

/// Input-event-source capability for one opened device
pub trait EventSource {
    fn next_event(&mut self, mode: ReadMode) -> io::Result<ReadStatus>;
}

/// A raw `input_event` as read from the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
    pub timestamp: SystemTime,
}

impl RawEvent {
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
            timestamp: SystemTime::now(),
        }
    }

    pub fn key(code: KeyCode, value: i32) -> Self {
        Self::new(EV_KEY, code.0, value)
    }

    pub fn syn_report() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    pub fn syn_dropped() -> Self {
        Self::new(EV_SYN, SYN_DROPPED, 0)
    }

    pub fn scancode(value: i32) -> Self {
        Self::new(EV_MSC, 4, value)
    }
}

impl From<evdev::InputEvent> for RawEvent {
    fn from(ev: evdev::InputEvent) -> Self {
        Self {
            event_type: ev.event_type().0,
            code: ev.code(),
            value: ev.value(),
            timestamp: ev.timestamp(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Decoded {
    Key(KeyEvent),
    Dropped,
    FrameEnd,
    Ignored,
}

fn decode(raw: &RawEvent) -> Decoded {
    match (raw.event_type, raw.code) {
        (EV_SYN, SYN_DROPPED) => Decoded::Dropped,
        (EV_SYN, SYN_REPORT) => Decoded::FrameEnd,
        (EV_KEY, code) => {
            // value 2 is autorepeat of a key that is already down
            let event_type = match raw.value {
                KEY_PRESS => KeyEventType::Press,
                KEY_RELEASE => KeyEventType::Release,
                _ => return Decoded::Ignored,
            };
            Decoded::Key(KeyEvent::new(KeyCode(code), event_type, raw.timestamp))
        }
        _ => Decoded::Ignored,
    }
}

/// Something that can block for the next batch of raw events
pub trait RawStream {
    fn fetch(&mut self, into: &mut VecDeque<RawEvent>) -> io::Result<()>;
}

impl RawStream for RawDevice {
    fn fetch(&mut self, into: &mut VecDeque<RawEvent>) -> io::Result<()> {
        into.extend(self.fetch_events()?.map(RawEvent::from));
        Ok(())
    }
}

/// [`EventSource`] over any raw event stream
pub struct StreamSource<R> {
    stream: R,
    pending: VecDeque<RawEvent>,
}

/// Event source reading an evdev character device
pub type EvdevSource = StreamSource<RawDevice>;

impl EvdevSource {
    /// Open a keyboard device for blocking reads
    pub fn open(path: &Path) -> Result<Self> {
        let device = RawDevice::open(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(device))
    }
}

impl<R: RawStream> StreamSource<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            pending: VecDeque::new(),
        }
    }

    fn next_raw(&mut self) -> io::Result<RawEvent> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                return Ok(raw);
            }
            self.stream.fetch(&mut self.pending)?;
        }
    }
}

impl<R: RawStream> EventSource for StreamSource<R> {
    fn next_event(&mut self, mode: ReadMode) -> io::Result<ReadStatus> {
        loop {
            let raw = match self.next_raw() {
                Ok(raw) => raw,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadStatus::WouldBlock)
                }
                Err(e) => return Err(e),
            };

            match (mode, decode(&raw)) {
                // Everything up to and including the next SYN_REPORT is stale
                (ReadMode::Sync, Decoded::FrameEnd) => return Ok(ReadStatus::WouldBlock),
                (ReadMode::Sync, _) => return Ok(ReadStatus::Resync),
                (ReadMode::Normal, Decoded::Key(event)) => return Ok(ReadStatus::Event(event)),
                (ReadMode::Normal, Decoded::Dropped) => return Ok(ReadStatus::Resync),
                (ReadMode::Normal, Decoded::FrameEnd | Decoded::Ignored) => continue,
            }
        }
    }
}
