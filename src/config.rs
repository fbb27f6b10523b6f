//! Board wiring and timing for the Seeed XIAO ESP32-C6.

/// A digital input wired to a contact sensor endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPin {
    pub gpio: i32,
    /// Report the opposite of the electrical level.
    pub invert: bool,
}

/// A digital output driven by an On/Off endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPin {
    pub gpio: i32,
    /// Drive LOW for "on".
    pub invert: bool,
}

const fn input(gpio: i32) -> InputPin {
    InputPin { gpio, invert: false }
}

const fn output(gpio: i32) -> OutputPin {
    OutputPin { gpio, invert: false }
}

pub const INPUT_COUNT: usize = 4;
pub const OUTPUT_COUNT: usize = 4;

// D0, D1, D2, D3
pub const INPUTS: [InputPin; INPUT_COUNT] = [input(0), input(1), input(2), input(21)];

// D4, D5, D8, D9
pub const OUTPUTS: [OutputPin; OUTPUT_COUNT] = [output(22), output(23), output(19), output(20)];

/// BOOT button, active low.
pub const RESET_BUTTON_GPIO: i32 = 9;

/// On-board user LED, active low.
pub const STATUS_LED: OutputPin = OutputPin {
    gpio: 15,
    invert: true,
};

pub const INPUT_POLL_MS: u64 = 50;
pub const DEBOUNCE_SAMPLES: u8 = 2;
pub const RESET_POLL_MS: u64 = 100;
pub const LONG_PRESS_MS: u32 = 5000;
pub const LED_TICK_MS: u64 = 50;

/// Endpoint 0 is the root endpoint, inputs come first, then outputs.
pub const fn input_endpoint(index: usize) -> u16 {
    1 + index as u16
}

pub const fn output_endpoint(index: usize) -> u16 {
    1 + (INPUT_COUNT + index) as u16
}

pub const VENDOR_NAME: &str = match option_env!("MATTER_VENDOR_NAME") {
    Some(name) => name,
    None => "VicinoDiCasaDigitale",
};

pub const PRODUCT_NAME: &str = match option_env!("MATTER_PRODUCT_NAME") {
    Some(name) => name,
    None => "Matter Thread 6in/6out",
};

/// Bit mask for `gpio_config_t::pin_bit_mask`.
pub fn pin_mask(gpios: impl IntoIterator<Item = i32>) -> u64 {
    gpios.into_iter().fold(0, |mask, gpio| mask | (1u64 << gpio))
}
