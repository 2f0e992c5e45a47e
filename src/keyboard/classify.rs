//! Keyboard classification
//!
//! A device counts as a keyboard when it reports key press/release events,
//! supports autorepeat, has every key of the joystick layout and owns a
//! caps-lock LED. The LED requirement filters out the many auxiliary input
//! nodes a single physical keyboard tends to spawn (media keys, power
//! buttons and the like).

use super::keymap::TRACKED_KEYS;
use super::KeyCode;
use crate::error::{Error, Result};
use evdev::{Device, EventType, LedCode as LedType};
use log::{debug, info};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::os::fd::OwnedFd;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

/// Capability set of one input device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Reports `EV_KEY` events
    pub key_events: bool,
    /// Supports `EV_REP` autorepeat
    pub autorepeat: bool,
    /// Has `EV_LED` indicators
    pub leds: bool,
    /// Has `LED_CAPSL`
    pub caps_lock_led: bool,
    /// Supported key codes
    pub keys: HashSet<KeyCode>,
}

impl Capabilities {
    /// Read the capability bitmaps of an opened device
    pub fn from_device(device: &Device) -> Self {
        let events = device.supported_events();
        Self {
            key_events: events.contains(EventType::KEY),
            autorepeat: events.contains(EventType::REPEAT),
            leds: events.contains(EventType::LED),
            caps_lock_led: device
                .supported_leds()
                .map_or(false, |leds| leds.contains(LedType::LED_CAPSL)),
            keys: device
                .supported_keys()
                .map(|keys| keys.iter().map(|k| KeyCode(k.code())).collect())
                .unwrap_or_default(),
        }
    }

    /// Requirements this device does not meet, empty for a keyboard
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.autorepeat {
            missing.push("EV_REP".to_string());
        }
        if !self.key_events {
            missing.push("EV_KEY".to_string());
        }
        for key in TRACKED_KEYS.iter().filter(|k| !self.keys.contains(*k)) {
            missing.push(key.name().to_string());
        }
        if !self.leds {
            missing.push("EV_LED".to_string());
        }
        if !self.caps_lock_led {
            missing.push("LED_CAPSL".to_string());
        }
        missing
    }

    pub fn is_keyboard(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Inspect `path` and decide whether it is a keyboard.
///
/// Absent or unopenable paths are I/O errors; a device that lacks some
/// capability is a normal `Ok(false)`. The device handle is closed before
/// returning on every path.
pub fn classify(path: &Path) -> Result<bool> {
    let caps = read_capabilities(path)?;
    let missing = caps.missing();
    if missing.is_empty() {
        info!("{} is a keyboard", path.display());
        Ok(true)
    } else {
        debug!("{} is not a keyboard, missing {}", path.display(), missing.join(", "));
        Ok(false)
    }
}

/// Read the capabilities of the device at `path`.
///
/// Failing to open the node is `Error::Io`; a node that opens but rejects
/// the evdev ioctls is `Error::Classify`.
pub fn read_capabilities(path: &Path) -> Result<Capabilities> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    let device = Device::from_fd(OwnedFd::from(file)).map_err(|e| Error::Classify {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Capabilities::from_device(&device))
}

/// Find every keyboard among the `event*` character devices in `dir`.
///
/// Results are ordered by event number, which fixes report ID assignment.
pub fn discover_keyboards(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let Some(number) = event_number(&path) else {
            continue;
        };
        let is_char_device = entry
            .file_type()
            .map(|t| t.is_char_device())
            .unwrap_or(false);
        if is_char_device {
            candidates.push((number, path));
        }
    }
    candidates.sort();

    let mut keyboards = Vec::new();
    for (_, path) in candidates {
        if classify(&path)? {
            keyboards.push(path);
        }
    }
    Ok(keyboards)
}

fn event_number(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix("event")?
        .parse()
        .ok()
}
