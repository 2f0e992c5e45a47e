//! Key code definitions and the fixed joystick key layout

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Represents a Linux input key code (`KEY_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const UP: KeyCode = KeyCode(103);
    pub const LEFT: KeyCode = KeyCode(105);
    pub const RIGHT: KeyCode = KeyCode(106);
    pub const DOWN: KeyCode = KeyCode(108);

    pub const A: KeyCode = KeyCode(30);
    pub const S: KeyCode = KeyCode(31);
    pub const D: KeyCode = KeyCode(32);
    pub const F: KeyCode = KeyCode(33);
    pub const Z: KeyCode = KeyCode(44);
    pub const X: KeyCode = KeyCode(45);
    pub const C: KeyCode = KeyCode(46);
    pub const V: KeyCode = KeyCode(47);

    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether this key takes part in the joystick mapping
    pub fn is_tracked(&self) -> bool {
        TRACKED_KEYS.contains(self)
    }

    /// Display name for logging
    pub fn name(&self) -> &'static str {
        KEY_NAMES.get(self).copied().unwrap_or("unknown")
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// Keys that drive the two axes
pub const DIRECTION_KEYS: [KeyCode; 4] = [KeyCode::LEFT, KeyCode::RIGHT, KeyCode::UP, KeyCode::DOWN];

/// Button table: bit `i` of the button mask follows `BUTTON_KEYS[i]`
pub const BUTTON_KEYS: [KeyCode; 8] = [
    KeyCode::F,
    KeyCode::D,
    KeyCode::S,
    KeyCode::A,
    KeyCode::V,
    KeyCode::C,
    KeyCode::X,
    KeyCode::Z,
];

/// Every key whose transitions reach the joystick state machine
pub const TRACKED_KEYS: [KeyCode; 12] = [
    KeyCode::LEFT,
    KeyCode::RIGHT,
    KeyCode::UP,
    KeyCode::DOWN,
    KeyCode::F,
    KeyCode::D,
    KeyCode::S,
    KeyCode::A,
    KeyCode::V,
    KeyCode::C,
    KeyCode::X,
    KeyCode::Z,
];

static KEY_NAMES: LazyLock<HashMap<KeyCode, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert(KeyCode::UP, "KEY_UP");
    map.insert(KeyCode::DOWN, "KEY_DOWN");
    map.insert(KeyCode::LEFT, "KEY_LEFT");
    map.insert(KeyCode::RIGHT, "KEY_RIGHT");
    map.insert(KeyCode::A, "KEY_A");
    map.insert(KeyCode::S, "KEY_S");
    map.insert(KeyCode::D, "KEY_D");
    map.insert(KeyCode::F, "KEY_F");
    map.insert(KeyCode::Z, "KEY_Z");
    map.insert(KeyCode::X, "KEY_X");
    map.insert(KeyCode::C, "KEY_C");
    map.insert(KeyCode::V, "KEY_V");
    map
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tracked_keys_are_directions_plus_buttons() {
        let tracked: HashSet<_> = TRACKED_KEYS.iter().copied().collect();
        let expected: HashSet<_> = DIRECTION_KEYS
            .iter()
            .chain(BUTTON_KEYS.iter())
            .copied()
            .collect();
        assert_eq!(tracked, expected);
        assert_eq!(tracked.len(), 12);
    }

    #[test]
    fn untracked_key_is_not_tracked() {
        assert!(!KeyCode(57).is_tracked()); // space
        assert!(KeyCode::LEFT.is_tracked());
    }

    #[test]
    fn button_zero_is_f() {
        assert_eq!(BUTTON_KEYS[0], KeyCode::F);
        assert_eq!(BUTTON_KEYS[7], KeyCode::Z);
    }

    #[test]
    fn display_uses_name() {
        assert_eq!(KeyCode::LEFT.to_string(), "KEY_LEFT (105)");
        assert_eq!(KeyCode(1).name(), "unknown");
    }
}
