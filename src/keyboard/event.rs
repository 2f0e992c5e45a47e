//! Keyboard event types

use super::KeyCode;
use std::time::SystemTime;

/// Type of keyboard event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventType {
    /// Key was pressed down
    Press,
    /// Key was released
    Release,
}

/// A single key transition decoded from the kernel event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code
    pub key: KeyCode,
    /// Type of event (press/release)
    pub event_type: KeyEventType,
    /// Kernel timestamp of the event
    pub timestamp: SystemTime,
}

impl KeyEvent {
    pub fn new(key: KeyCode, event_type: KeyEventType, timestamp: SystemTime) -> Self {
        Self {
            key,
            event_type,
            timestamp,
        }
    }

    pub fn press(key: KeyCode) -> Self {
        Self::new(key, KeyEventType::Press, SystemTime::now())
    }

    pub fn release(key: KeyCode) -> Self {
        Self::new(key, KeyEventType::Release, SystemTime::now())
    }

    pub fn is_press(&self) -> bool {
        self.event_type == KeyEventType::Press
    }
}
