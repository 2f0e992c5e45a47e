//! Composite HID report descriptor for N virtual joysticks.
//!
//! Each joystick gets one copy of [`JOYSTICK_TEMPLATE`] with its report ID
//! patched in; the copies are concatenated into a single descriptor so one
//! HID function (one endpoint) carries all of them.

use crate::error::{Error, Result};

/// Size of one per-device template.
pub const TEMPLATE_SIZE: usize = 44;

/// Offset of the report ID value inside the template.
pub const REPORT_ID_OFFSET: usize = 7;

/// Report descriptor of one joystick: two signed 8-bit axes and eight buttons.
#[rustfmt::skip]
pub const JOYSTICK_TEMPLATE: [u8; TEMPLATE_SIZE] = [
    0x05, 0x01, // Usage Page (Generic Desktop Ctrls)
    0x09, 0x04, // Usage (Joystick)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (patched per device)
    0x15, 0x81, //   Logical Minimum (-127)
    0x25, 0x7F, //   Logical Maximum (127)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data,Var,Abs)
    0xC0,       //   End Collection
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (0x01)
    0x29, 0x08, //   Usage Maximum (0x08)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data,Var,Abs)
    0xC0,       // End Collection
];

const REPORT_ID_TAG: u8 = 0x85;

/// Immutable descriptor built once for a fixed device count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeDescriptor {
    bytes: Vec<u8>,
    devices: usize,
}

impl CompositeDescriptor {
    /// Build the descriptor for `n` joysticks, `1 <= n <= ceiling`.
    pub fn build(n: usize, ceiling: usize) -> Result<Self> {
        if n == 0 || n > ceiling {
            return Err(Error::Config(format!(
                "device count {} outside supported range 1..={}",
                n, ceiling
            )));
        }
        if n > u8::MAX as usize {
            return Err(Error::Config(format!(
                "device count {} does not fit a report ID",
                n
            )));
        }

        let mut bytes = Vec::with_capacity(n * TEMPLATE_SIZE);
        for index in 0..n {
            let mut copy = JOYSTICK_TEMPLATE;
            copy[REPORT_ID_OFFSET] = (index + 1) as u8;
            bytes.extend_from_slice(&copy);
        }

        Ok(Self { bytes, devices: n })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of joysticks described
    pub fn device_count(&self) -> usize {
        self.devices
    }

    /// Report IDs declared in the descriptor, in order of appearance.
    pub fn report_ids(&self) -> Vec<u8> {
        self.bytes
            .chunks_exact(TEMPLATE_SIZE)
            .filter(|chunk| chunk[REPORT_ID_OFFSET - 1] == REPORT_ID_TAG)
            .map(|chunk| chunk[REPORT_ID_OFFSET])
            .collect()
    }
}

impl AsRef<[u8]> for CompositeDescriptor {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
