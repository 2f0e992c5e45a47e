//! USB HID gadget side: descriptor, reports, gadget lifecycle and endpoint

mod configfs;
mod descriptor;
pub mod gadget;
mod multiplexer;
mod report;

pub use configfs::ConfigFsProvider;
pub use descriptor::{CompositeDescriptor, JOYSTICK_TEMPLATE, REPORT_ID_OFFSET, TEMPLATE_SIZE};
pub use gadget::{GadgetHandle, GadgetIdentity, GadgetProvider, GadgetState, HidFunctionSpec};
pub use multiplexer::{ReportCallback, ReportMultiplexer};
pub use report::{JoystickReport, AXIS_MAX, AXIS_MIN, REPORT_SIZE};
