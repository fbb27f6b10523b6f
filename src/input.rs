//! Debounced edge detection for the digital inputs.
//!
//! Inputs are sampled at a fixed interval. A new level is only accepted once
//! it has been seen on `debounce` consecutive samples, so contact bounce
//! shorter than the window never reaches the Matter attribute.

use core::cell::Cell;

use crate::config::InputPin;

#[derive(Debug, Clone)]
pub struct InputChannel {
    pin: InputPin,
    debounce: u8,
    stable: bool,
    candidate: bool,
    streak: u8,
}

impl InputChannel {
    /// Starts out at the idle level of a pulled-up input.
    pub fn new(pin: InputPin, debounce: u8) -> Self {
        let idle = !pin.invert;

        Self {
            pin,
            debounce: debounce.max(1),
            stable: idle,
            candidate: idle,
            streak: 0,
        }
    }

    /// Last accepted level, after inversion.
    pub fn level(&self) -> bool {
        self.stable
    }

    /// Feeds one raw sample, returns the new level when an edge is accepted.
    pub fn sample(&mut self, raw: bool) -> Option<bool> {
        let level = raw != self.pin.invert;

        if level == self.stable {
            self.candidate = level;
            self.streak = 0;
            return None;
        }

        if level == self.candidate {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.candidate = level;
            self.streak = 1;
        }

        if self.streak >= self.debounce {
            self.stable = level;
            self.streak = 0;
            Some(level)
        } else {
            None
        }
    }
}

pub struct InputBank<const N: usize> {
    channels: [InputChannel; N],
}

impl<const N: usize> InputBank<N> {
    pub fn new(pins: &[InputPin; N], debounce: u8) -> Self {
        Self {
            channels: pins.map(|pin| InputChannel::new(pin, debounce)),
        }
    }

    pub fn channels(&self) -> &[InputChannel; N] {
        &self.channels
    }

    /// Samples every channel through `read` and reports accepted edges
    /// as `(index, level)` in table order.
    pub fn poll<F, C>(&mut self, mut read: F, mut changed: C)
    where
        F: FnMut(i32) -> bool,
        C: FnMut(usize, bool),
    {
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if let Some(level) = channel.sample(read(channel.pin.gpio)) {
                changed(index, level);
            }
        }
    }
}

/// Reported level of one input, shared between the poller and whoever
/// serves it to the network.
#[derive(Debug)]
pub struct ContactState {
    level: Cell<bool>,
}

impl ContactState {
    pub fn new(level: bool) -> Self {
        Self {
            level: Cell::new(level),
        }
    }

    pub fn get(&self) -> bool {
        self.level.get()
    }

    /// Returns `true` if the value changed.
    pub fn set(&self, level: bool) -> bool {
        self.level.replace(level) != level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: InputPin = InputPin {
        gpio: 0,
        invert: false,
    };

    const INVERTED: InputPin = InputPin {
        gpio: 1,
        invert: true,
    };

    #[test]
    fn test_idle_level_produces_no_edges() {
        let mut channel = InputChannel::new(PLAIN, 2);

        for _ in 0..10 {
            assert_eq!(channel.sample(true), None);
        }
        assert!(channel.level());
    }

    #[test]
    fn test_edge_accepted_after_debounce_window() {
        let mut channel = InputChannel::new(PLAIN, 2);

        assert_eq!(channel.sample(false), None);
        assert_eq!(channel.sample(false), Some(false));
        assert_eq!(channel.sample(false), None);
        assert!(!channel.level());

        assert_eq!(channel.sample(true), None);
        assert_eq!(channel.sample(true), Some(true));
    }

    #[test]
    fn test_glitch_shorter_than_window_is_ignored() {
        let mut channel = InputChannel::new(PLAIN, 3);

        assert_eq!(channel.sample(false), None);
        assert_eq!(channel.sample(false), None);
        assert_eq!(channel.sample(true), None);
        assert_eq!(channel.sample(false), None);
        assert_eq!(channel.sample(false), None);
        assert!(channel.level());
        assert_eq!(channel.sample(false), Some(false));
    }

    #[test]
    fn test_single_sample_window_reports_immediately() {
        let mut channel = InputChannel::new(PLAIN, 1);

        assert_eq!(channel.sample(false), Some(false));
        assert_eq!(channel.sample(true), Some(true));
    }

    #[test]
    fn test_zero_window_behaves_like_one() {
        let mut channel = InputChannel::new(PLAIN, 0);

        assert_eq!(channel.sample(false), Some(false));
    }

    #[test]
    fn test_inverted_input() {
        let mut channel = InputChannel::new(INVERTED, 1);

        // Pulled-up idle HIGH reads as false.
        assert!(!channel.level());
        assert_eq!(channel.sample(true), None);
        assert_eq!(channel.sample(false), Some(true));
    }

    #[test]
    fn test_bank_reports_changes_by_index() {
        let mut bank = InputBank::new(&[PLAIN, INVERTED, PLAIN], 1);
        let mut changes = Vec::new();

        bank.poll(|gpio| gpio != 0, |i, level| changes.push((i, level)));

        // gpio 0 is read LOW on both PLAIN channels, gpio 1 stays HIGH.
        assert_eq!(changes, vec![(0, false), (2, false)]);

        changes.clear();
        bank.poll(|gpio| gpio != 0, |i, level| changes.push((i, level)));
        assert!(changes.is_empty());

        bank.poll(|_| false, |i, level| changes.push((i, level)));
        assert_eq!(changes, vec![(1, true)]);
        assert_eq!(
            bank.channels().iter().map(InputChannel::level).collect::<Vec<_>>(),
            vec![false, true, false]
        );
    }

    #[test]
    fn test_contact_state_reports_changes_only() {
        let contact = ContactState::new(true);

        assert!(!contact.set(true));
        assert!(contact.get());

        assert!(contact.set(false));
        assert!(!contact.get());
        assert!(!contact.set(false));

        assert!(contact.set(true));
        assert!(contact.get());
    }

    #[test]
    fn test_bank_edges_feed_contact_state() {
        let mut bank = InputBank::new(&[PLAIN, INVERTED], 2);
        let contacts = bank.channels().clone().map(|c| ContactState::new(c.level()));
        let mut notified = 0;

        for _ in 0..3 {
            let mut changed = false;
            bank.poll(|_| false, |i, level| changed |= contacts[i].set(level));
            if changed {
                notified += 1;
            }
        }

        assert_eq!(notified, 1);
        assert_eq!(contacts.each_ref().map(ContactState::get), [false, true]);
    }
}
