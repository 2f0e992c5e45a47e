//! keystick - keyboards as USB joysticks
//!
//! Each classified keyboard drives one virtual joystick of a composite USB
//! HID gadget. All joysticks share a single HID function and endpoint and are
//! told apart by report ID.

pub mod config;
pub mod error;
pub mod hid;
pub mod keyboard;
pub mod session;
pub mod shutdown;

pub use config::{Config, ConfigError};
pub use error::{Error, GadgetStep, Result};
pub use hid::{
    CompositeDescriptor, ConfigFsProvider, GadgetHandle, GadgetIdentity, GadgetProvider,
    JoystickReport, ReportMultiplexer,
};
pub use keyboard::{classify, discover_keyboards, JoystickState};
pub use session::KeyboardSession;
pub use shutdown::ShutdownCoordinator;
