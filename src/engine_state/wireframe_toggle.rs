//! # Wireframe Toggle
//!
//! An edge-triggered latch bound to one key. Each press arms the latch once;
//! the frame renderer samples and clears it exactly once per frame.

use winit::keyboard::KeyCode;

#[derive(Debug, Clone)]
pub struct WireframeToggle {
    key: KeyCode,
    held: bool,
    triggered: bool,
}

impl WireframeToggle {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            held: false,
            triggered: false,
        }
    }

    /// Feeds a key state change. Repeats while the key stays down are ignored.
    pub fn intake_key(&mut self, key: KeyCode, pressed: bool) {
        if key != self.key {
            return;
        }
        if pressed && !self.held {
            self.triggered = true;
        }
        self.held = pressed;
    }

    /// Releases the key without triggering, e.g. when the window loses focus.
    pub fn reset(&mut self) {
        self.held = false;
    }

    /// Whether the action fired since the last sample. Clears the latch.
    pub fn was_triggered(&mut self) -> bool {
        std::mem::take(&mut self.triggered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_trigger_per_press() {
        let mut toggle = WireframeToggle::new(KeyCode::KeyF);
        toggle.intake_key(KeyCode::KeyF, true);
        toggle.intake_key(KeyCode::KeyF, true);
        toggle.intake_key(KeyCode::KeyF, true);

        assert!(toggle.was_triggered());
        assert!(!toggle.was_triggered());

        toggle.intake_key(KeyCode::KeyF, false);
        assert!(!toggle.was_triggered());

        toggle.intake_key(KeyCode::KeyF, true);
        assert!(toggle.was_triggered());
    }

    #[test]
    fn test_press_and_release_between_samples_still_fires() {
        let mut toggle = WireframeToggle::new(KeyCode::KeyF);
        toggle.intake_key(KeyCode::KeyF, true);
        toggle.intake_key(KeyCode::KeyF, false);
        assert!(toggle.was_triggered());
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let mut toggle = WireframeToggle::new(KeyCode::KeyG);
        toggle.intake_key(KeyCode::KeyF, true);
        assert!(!toggle.was_triggered());

        toggle.intake_key(KeyCode::KeyG, true);
        assert!(toggle.was_triggered());
    }
}
