//! Joystick input report as written to the gadget endpoint.
//!
//! Layout (4 bytes):
//! ```text
//! Byte 0: Report ID (1..N, selects the virtual joystick)
//! Byte 1: X axis (signed, -127..127)
//! Byte 2: Y axis (signed, -127..127)
//! Byte 3: Button bitfield (bit i = button i+1 pressed)
//! ```

/// Report size in bytes, report ID included.
pub const REPORT_SIZE: usize = 4;

/// Axis value for a held negative direction (left/up).
pub const AXIS_MIN: i8 = -127;

/// Axis value for a held positive direction (right/down).
pub const AXIS_MAX: i8 = 127;

/// One joystick input report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct JoystickReport {
    /// Report ID of the owning session (1-based).
    pub report_id: u8,
    /// X axis.
    pub x: i8,
    /// Y axis.
    pub y: i8,
    /// Button bitfield.
    pub buttons: u8,
}

impl JoystickReport {
    /// Neutral report (centered, no buttons) for a given report ID.
    pub const fn neutral(report_id: u8) -> Self {
        Self {
            report_id,
            x: 0,
            y: 0,
            buttons: 0,
        }
    }

    /// Wire representation.
    pub fn to_bytes(&self) -> [u8; REPORT_SIZE] {
        [self.report_id, self.x as u8, self.y as u8, self.buttons]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_report_bytes() {
        assert_eq!(JoystickReport::neutral(3).to_bytes(), [3, 0, 0, 0]);
    }

    #[test]
    fn axes_encode_as_twos_complement() {
        let report = JoystickReport {
            report_id: 1,
            x: AXIS_MIN,
            y: AXIS_MAX,
            buttons: 0b1000_0001,
        };
        assert_eq!(report.to_bytes(), [0x01, 0x81, 0x7F, 0x81]);
    }
}
