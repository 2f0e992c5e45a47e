//! Keyboard input: classification, event decoding and key state

pub mod classify;
mod event;
pub mod keymap;
mod reader;
pub mod source;
mod state;

pub use classify::{classify, discover_keyboards, Capabilities};
pub use event::{KeyEvent, KeyEventType};
pub use keymap::{KeyCode, BUTTON_KEYS, DIRECTION_KEYS, TRACKED_KEYS};
pub use reader::InputEventReader;
pub use source::{EvdevSource, EventSource, RawEvent, RawStream, ReadMode, ReadStatus, StreamSource};
pub use state::{JoystickState, KeyState};
