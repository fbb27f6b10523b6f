//! Raw ESP-IDF GPIO access.

use esp_idf_svc::sys::{
    esp, gpio_config, gpio_config_t, gpio_get_level, gpio_int_type_t_GPIO_INTR_DISABLE,
    gpio_mode_t_GPIO_MODE_INPUT, gpio_mode_t_GPIO_MODE_OUTPUT, gpio_set_level, EspError,
};

use crate::config::pin_mask;
use crate::output::LevelWriter;

pub struct EspGpio;

impl LevelWriter for EspGpio {
    type Error = EspError;

    fn set_level(&self, gpio: i32, high: bool) -> Result<(), EspError> {
        esp!(unsafe { gpio_set_level(gpio, u32::from(high)) })
    }
}

pub fn read_level(gpio: i32) -> bool {
    unsafe { gpio_get_level(gpio) != 0 }
}

pub fn configure_outputs(gpios: impl IntoIterator<Item = i32>) -> Result<(), EspError> {
    let io_conf = gpio_config_t {
        pin_bit_mask: pin_mask(gpios),
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: 0,
        pull_down_en: 0,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };

    esp!(unsafe { gpio_config(&io_conf) })
}

/// Inputs with the internal pull-up enabled.
pub fn configure_inputs(gpios: impl IntoIterator<Item = i32>) -> Result<(), EspError> {
    let io_conf = gpio_config_t {
        pin_bit_mask: pin_mask(gpios),
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: 1,
        pull_down_en: 0,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };

    esp!(unsafe { gpio_config(&io_conf) })
}
