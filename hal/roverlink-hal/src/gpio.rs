//! GPIO pin abstractions
//!
//! Used for the radio chip select and reset lines, the radio DIO0 interrupt
//! line and the transmit indicator LED.

/// Digital output pin
pub trait OutputPin {
    /// Drive the pin high (logic 1)
    fn set_high(&mut self);

    /// Drive the pin low (logic 0)
    fn set_low(&mut self);

    /// Drive the pin to a specific level
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Whether the pin is currently driven high
    fn is_set_high(&self) -> bool;
}

/// Digital input pin
pub trait InputPin {
    /// Whether the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Whether the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Output that may be wired active-low
///
/// Wraps a pin so callers can say "on"/"off" without caring about the
/// board's polarity.
pub struct Polarized<P> {
    pin: P,
    inverted: bool,
}

impl<P: OutputPin> Polarized<P> {
    pub fn new(pin: P, inverted: bool) -> Self {
        Self { pin, inverted }
    }

    /// Switch the output on
    pub fn on(&mut self) {
        self.pin.set_state(!self.inverted);
    }

    /// Switch the output off
    pub fn off(&mut self) {
        self.pin.set_state(self.inverted);
    }

    /// Whether the output is currently on
    pub fn is_on(&self) -> bool {
        self.pin.is_set_high() != self.inverted
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> OutputPin for Polarized<P> {
    fn set_high(&mut self) {
        self.on();
    }

    fn set_low(&mut self) {
        self.off();
    }

    fn is_set_high(&self) -> bool {
        self.is_on()
    }
}

/// An absent pin: writes are dropped and it always reads low
impl<P: OutputPin> OutputPin for Option<P> {
    fn set_high(&mut self) {
        if let Some(pin) = self {
            pin.set_high();
        }
    }

    fn set_low(&mut self) {
        if let Some(pin) = self {
            pin.set_low();
        }
    }

    fn is_set_high(&self) -> bool {
        self.as_ref().is_some_and(|pin| pin.is_set_high())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePin(bool);

    impl OutputPin for FakePin {
        fn set_high(&mut self) {
            self.0 = true;
        }
        fn set_low(&mut self) {
            self.0 = false;
        }
        fn is_set_high(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_active_high() {
        let mut led = Polarized::new(FakePin(false), false);
        led.on();
        assert!(led.is_on());
        assert!(led.into_inner().0);
    }

    #[test]
    fn test_active_low() {
        let mut led = Polarized::new(FakePin(true), true);
        led.on();
        assert!(led.is_on());
        led.off();
        assert!(!led.is_on());
        assert!(led.into_inner().0);
    }

    #[test]
    fn test_absent_pin() {
        let mut led: Option<FakePin> = None;
        led.set_high();
        assert!(!led.is_set_high());

        let mut led = Some(FakePin(false));
        led.set_high();
        assert!(led.is_set_high());
    }
}
