//! Key state tracking and the key-state to joystick-report mapping

use super::keymap::{BUTTON_KEYS, TRACKED_KEYS};
use super::{KeyCode, KeyEvent, KeyEventType};
use crate::hid::{JoystickReport, AXIS_MAX, AXIS_MIN};
use std::collections::HashMap;

/// Pressed/released state of the tracked keys of one keyboard
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    keys: HashMap<KeyCode, bool>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition. Untracked keys are ignored and return false.
    pub fn set(&mut self, key: KeyCode, pressed: bool) -> bool {
        if !key.is_tracked() {
            return false;
        }
        self.keys.insert(key, pressed);
        true
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.keys.get(&key).copied().unwrap_or(false)
    }

    /// Currently pressed keys, in tracked-table order
    pub fn pressed_keys(&self) -> Vec<KeyCode> {
        TRACKED_KEYS
            .iter()
            .copied()
            .filter(|k| self.is_pressed(*k))
            .collect()
    }

    pub fn reset(&mut self) {
        self.keys.clear();
    }
}

/// Joystick emulation for one keyboard session
///
/// The report is a pure function of the current [`KeyState`]: the order in
/// which keys went down never matters, only which ones are held now.
#[derive(Debug, Clone)]
pub struct JoystickState {
    report_id: u8,
    keys: KeyState,
}

impl JoystickState {
    pub fn new(report_id: u8) -> Self {
        Self {
            report_id,
            keys: KeyState::new(),
        }
    }

    pub fn report_id(&self) -> u8 {
        self.report_id
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    /// Apply a key transition.
    ///
    /// Returns the recomputed report for every tracked transition, even when
    /// the bytes are unchanged, and `None` for keys outside the layout.
    pub fn apply(&mut self, event: &KeyEvent) -> Option<JoystickReport> {
        let pressed = event.event_type == KeyEventType::Press;
        if !self.keys.set(event.key, pressed) {
            return None;
        }
        Some(self.report())
    }

    /// Compute the report for the current key state
    pub fn report(&self) -> JoystickReport {
        JoystickReport {
            report_id: self.report_id,
            x: self.axis(KeyCode::LEFT, KeyCode::RIGHT),
            y: self.axis(KeyCode::UP, KeyCode::DOWN),
            buttons: self.button_mask(),
        }
    }

    // The negative direction wins when both are held
    fn axis(&self, negative: KeyCode, positive: KeyCode) -> i8 {
        if self.keys.is_pressed(negative) {
            AXIS_MIN
        } else if self.keys.is_pressed(positive) {
            AXIS_MAX
        } else {
            0
        }
    }

    fn button_mask(&self) -> u8 {
        BUTTON_KEYS
            .iter()
            .enumerate()
            .filter(|(_, key)| self.keys.is_pressed(**key))
            .fold(0u8, |mask, (bit, _)| mask | (1 << bit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(state: &mut JoystickState, events: &[KeyEvent]) -> Option<JoystickReport> {
        events.iter().filter_map(|e| state.apply(e)).last()
    }

    #[test]
    fn idle_report_is_neutral() {
        let state = JoystickState::new(1);
        assert_eq!(state.report().to_bytes(), [1, 0, 0, 0]);
    }

    #[test]
    fn left_only() {
        let mut state = JoystickState::new(2);
        let report = state.apply(&KeyEvent::press(KeyCode::LEFT)).unwrap();
        assert_eq!(report.to_bytes(), [2, 0x81, 0, 0]);
        assert_eq!(report.x, -127);
    }

    #[test]
    fn left_and_up_held() {
        let mut state = JoystickState::new(1);
        let report = run(
            &mut state,
            &[KeyEvent::press(KeyCode::LEFT), KeyEvent::press(KeyCode::UP)],
        )
        .unwrap();
        assert_eq!((report.x, report.y, report.buttons), (-127, -127, 0));
    }

    #[test]
    fn left_wins_regardless_of_press_order() {
        let mut a = JoystickState::new(1);
        let mut b = JoystickState::new(1);
        let ra = run(
            &mut a,
            &[KeyEvent::press(KeyCode::LEFT), KeyEvent::press(KeyCode::RIGHT)],
        )
        .unwrap();
        let rb = run(
            &mut b,
            &[KeyEvent::press(KeyCode::RIGHT), KeyEvent::press(KeyCode::LEFT)],
        )
        .unwrap();
        assert_eq!(ra.x, -127);
        assert_eq!(ra, rb);
    }

    #[test]
    fn up_wins_over_down() {
        let mut state = JoystickState::new(1);
        let report = run(
            &mut state,
            &[KeyEvent::press(KeyCode::DOWN), KeyEvent::press(KeyCode::UP)],
        )
        .unwrap();
        assert_eq!(report.y, -127);

        let report = state.apply(&KeyEvent::release(KeyCode::UP)).unwrap();
        assert_eq!(report.y, 127);
    }

    #[test]
    fn right_only_after_left_released() {
        let mut state = JoystickState::new(1);
        let report = run(
            &mut state,
            &[
                KeyEvent::press(KeyCode::LEFT),
                KeyEvent::press(KeyCode::RIGHT),
                KeyEvent::release(KeyCode::LEFT),
            ],
        )
        .unwrap();
        assert_eq!(report.x, 127);
    }

    #[test]
    fn button_zero_press_and_release() {
        let mut state = JoystickState::new(1);
        let report = state.apply(&KeyEvent::press(KeyCode::F)).unwrap();
        assert_eq!(report.to_bytes(), [1, 0, 0, 0x01]);
        let report = state.apply(&KeyEvent::release(KeyCode::F)).unwrap();
        assert_eq!(report.to_bytes(), [1, 0, 0, 0x00]);
    }

    #[test]
    fn every_button_maps_to_its_bit() {
        for (bit, key) in BUTTON_KEYS.iter().enumerate() {
            let mut state = JoystickState::new(1);
            let report = state.apply(&KeyEvent::press(*key)).unwrap();
            assert_eq!(report.buttons, 1 << bit, "key {}", key);
        }
    }

    #[test]
    fn all_buttons_held() {
        let mut state = JoystickState::new(3);
        let presses: Vec<_> = BUTTON_KEYS.iter().map(|k| KeyEvent::press(*k)).collect();
        let report = run(&mut state, &presses).unwrap();
        assert_eq!(report.buttons, 0xFF);
    }

    #[test]
    fn release_clears_only_its_bit() {
        let mut state = JoystickState::new(1);
        run(
            &mut state,
            &[KeyEvent::press(KeyCode::F), KeyEvent::press(KeyCode::Z)],
        );
        let report = state.apply(&KeyEvent::release(KeyCode::F)).unwrap();
        assert_eq!(report.buttons, 0x80);
    }

    #[test]
    fn untracked_key_produces_no_report() {
        let mut state = JoystickState::new(1);
        assert!(state.apply(&KeyEvent::press(KeyCode(57))).is_none());
        assert!(state.keys().pressed_keys().is_empty());
    }

    #[test]
    fn repeated_transition_still_reports() {
        let mut state = JoystickState::new(1);
        let first = state.apply(&KeyEvent::press(KeyCode::A)).unwrap();
        let second = state.apply(&KeyEvent::press(KeyCode::A)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn report_id_is_session_id() {
        let mut state = JoystickState::new(4);
        let report = state.apply(&KeyEvent::press(KeyCode::DOWN)).unwrap();
        assert_eq!(report.report_id, 4);
        assert_eq!(state.report_id(), 4);
    }

    #[test]
    fn key_state_reset() {
        let mut keys = KeyState::new();
        assert!(keys.set(KeyCode::UP, true));
        assert_eq!(keys.pressed_keys(), vec![KeyCode::UP]);
        keys.reset();
        assert!(!keys.is_pressed(KeyCode::UP));
    }
}
