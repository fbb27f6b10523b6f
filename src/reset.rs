//! Long-press detection for the factory reset button.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressEvent {
    Pressed,
    /// Released before the threshold.
    ReleasedEarly { held_ms: u32 },
    LongPress,
}

#[derive(Debug, Clone)]
pub struct LongPress {
    threshold_ms: u32,
    held_ms: u32,
    pressed: bool,
    fired: bool,
}

impl LongPress {
    pub fn new(threshold_ms: u32) -> Self {
        Self {
            threshold_ms,
            held_ms: 0,
            pressed: false,
            fired: false,
        }
    }

    /// Feeds the button state sampled `elapsed_ms` after the previous call.
    pub fn update(&mut self, pressed: bool, elapsed_ms: u32) -> Option<PressEvent> {
        let was_pressed = core::mem::replace(&mut self.pressed, pressed);

        match (was_pressed, pressed) {
            (false, true) => {
                self.held_ms = 0;
                self.fired = false;
                Some(PressEvent::Pressed)
            }
            (true, true) => {
                self.held_ms = self.held_ms.saturating_add(elapsed_ms);

                if !self.fired && self.held_ms >= self.threshold_ms {
                    self.fired = true;
                    Some(PressEvent::LongPress)
                } else {
                    None
                }
            }
            (true, false) => {
                let held_ms = core::mem::take(&mut self.held_ms);

                if self.fired || held_ms == 0 {
                    None
                } else {
                    Some(PressEvent::ReleasedEarly { held_ms })
                }
            }
            (false, false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(button: &mut LongPress, ticks: usize) -> Vec<PressEvent> {
        (0..ticks).filter_map(|_| button.update(true, 100)).collect()
    }

    #[test]
    fn test_idle_button_is_silent() {
        let mut button = LongPress::new(5000);

        for _ in 0..100 {
            assert_eq!(button.update(false, 100), None);
        }
    }

    #[test]
    fn test_long_press_fires_at_threshold() {
        let mut button = LongPress::new(5000);

        assert_eq!(button.update(true, 100), Some(PressEvent::Pressed));
        assert!(hold(&mut button, 49).is_empty());
        assert_eq!(button.update(true, 100), Some(PressEvent::LongPress));
    }

    #[test]
    fn test_long_press_fires_once_per_press() {
        let mut button = LongPress::new(5000);

        button.update(true, 100);
        let events = hold(&mut button, 200);

        assert_eq!(events, vec![PressEvent::LongPress]);
        assert_eq!(button.update(false, 100), None);
    }

    #[test]
    fn test_early_release_reports_duration() {
        let mut button = LongPress::new(5000);

        button.update(true, 100);
        hold(&mut button, 15);

        assert_eq!(
            button.update(false, 100),
            Some(PressEvent::ReleasedEarly { held_ms: 1500 })
        );
    }

    #[test]
    fn test_tap_shorter_than_a_tick_is_not_reported() {
        let mut button = LongPress::new(5000);

        assert_eq!(button.update(true, 100), Some(PressEvent::Pressed));
        assert_eq!(button.update(false, 100), None);
    }

    #[test]
    fn test_new_press_restarts_the_count() {
        let mut button = LongPress::new(500);

        button.update(true, 100);
        hold(&mut button, 3);
        button.update(false, 100);

        assert_eq!(button.update(true, 100), Some(PressEvent::Pressed));
        assert!(hold(&mut button, 4).is_empty());
        assert_eq!(button.update(true, 100), Some(PressEvent::LongPress));
    }
}
