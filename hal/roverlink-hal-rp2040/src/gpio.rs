//! GPIO adapters

use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::Peri;
use roverlink_hal::{InputPin, OutputPin};

/// Push-pull output
pub struct RpOutput(Output<'static>);

impl RpOutput {
    /// Configure `pin` as an output at `initial` level
    pub fn new(pin: Peri<'static, AnyPin>, initial_high: bool) -> Self {
        let level = if initial_high { Level::High } else { Level::Low };
        Self(Output::new(pin, level))
    }
}

impl OutputPin for RpOutput {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

/// Digital input, optionally pulled up
pub struct RpInput(Input<'static>);

impl RpInput {
    pub fn new(pin: Peri<'static, AnyPin>, pull_up: bool) -> Self {
        let pull = if pull_up { Pull::Up } else { Pull::None };
        Self(Input::new(pin, pull))
    }
}

impl InputPin for RpInput {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}
