//! Mirrors commanded on/off states onto output pins.

use core::cell::Cell;

use crate::config::OutputPin;

/// Writes a logic level to a GPIO.
pub trait LevelWriter {
    type Error;

    fn set_level(&self, gpio: i32, high: bool) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChannel {
    pin: OutputPin,
}

impl OutputChannel {
    pub const fn new(pin: OutputPin) -> Self {
        Self { pin }
    }

    pub fn gpio(&self) -> i32 {
        self.pin.gpio
    }

    /// Electrical level for a logical state.
    pub fn level_for(&self, on: bool) -> bool {
        on != self.pin.invert
    }

    pub fn drive<W: LevelWriter>(&self, writer: &W, on: bool) -> Result<(), W::Error> {
        writer.set_level(self.pin.gpio, self.level_for(on))
    }
}

/// Last commanded state of one output, together with the pin it drives.
pub struct SwitchedOutput<W> {
    number: usize,
    channel: OutputChannel,
    writer: W,
    state: Cell<bool>,
}

impl<W: LevelWriter> SwitchedOutput<W> {
    /// Outputs start off, matching the level driven at boot.
    pub fn new(index: usize, pin: OutputPin, writer: W) -> Self {
        Self {
            number: index + 1,
            channel: OutputChannel::new(pin),
            writer,
            state: Cell::new(false),
        }
    }

    /// 1-based output number used in logs.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn gpio(&self) -> i32 {
        self.channel.gpio()
    }

    pub fn is_on(&self) -> bool {
        self.state.get()
    }

    /// Records the command, then drives the pin. The state is kept even if
    /// the write fails.
    pub fn command(&self, on: bool) -> Result<(), W::Error> {
        self.state.set(on);
        self.channel.drive(&self.writer, on)
    }
}
