//! Hardware configuration types
//!
//! Pin assignments for the radio module. Each supported Feather variant has
//! a preset table; the config file may override individual pins.

/// Pin configuration with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    /// GPIO number in the board's numbering
    pub pin: u8,
    /// Pin is active-low (inverted)
    pub inverted: bool,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinConfig {
    /// Create a new pin config
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: false,
        }
    }

    /// Create an inverted (active-low) pin
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
            pull_up: false,
        }
    }

    /// Create a pin with pull-up enabled
    pub const fn with_pullup(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: true,
        }
    }
}

/// Radio module wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioPins {
    /// SPI chip select
    pub cs: PinConfig,
    /// DIO0 interrupt line
    pub irq: PinConfig,
    /// Module reset
    pub reset: PinConfig,
    /// Transmit indicator LED
    pub led: Option<PinConfig>,
}

impl RadioPins {
    const fn feather(cs: u8, irq: u8, reset: u8, led: Option<u8>) -> Self {
        Self {
            cs: PinConfig::new(cs),
            irq: PinConfig::new(irq),
            reset: PinConfig::new(reset),
            led: match led {
                Some(pin) => Some(PinConfig::new(pin)),
                None => None,
            },
        }
    }

    /// True if any two of cs, irq, reset and led share a GPIO
    pub fn has_conflict(&self) -> bool {
        let mut used = [self.cs.pin, self.irq.pin, self.reset.pin, 0];
        let count = match self.led {
            Some(led) => {
                used[3] = led.pin;
                4
            }
            None => 3,
        };
        let used = &used[..count];
        used.iter()
            .enumerate()
            .any(|(i, a)| used[i + 1..].iter().any(|b| a == b))
    }
}

impl Default for RadioPins {
    fn default() -> Self {
        BoardVariant::default().radio_pins()
    }
}

/// Supported controller boards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardVariant {
    /// Feather 32u4 RFM9x
    Feather32u4,
    /// Feather M0 RFM9x
    FeatherM0,
    /// Feather RP2040 RFM9x
    #[default]
    FeatherRp2040Rfm,
    /// Feather 328P with RFM9x FeatherWing
    Feather328pWing,
    /// Feather HUZZAH ESP8266 with RFM9x FeatherWing
    FeatherEsp8266Wing,
    /// Feather ESP32-S2 or nRF52840 with RFM9x FeatherWing
    FeatherEsp32s2Wing,
    /// Feather HUZZAH32 ESP32 with RFM9x FeatherWing
    FeatherEsp32Wing,
    /// Feather nRF52832 with RFM9x FeatherWing
    FeatherNrf52832Wing,
}

impl BoardVariant {
    /// Config file names, in declaration order
    pub const NAMES: [(&'static str, BoardVariant); 8] = [
        ("feather_32u4", BoardVariant::Feather32u4),
        ("feather_m0", BoardVariant::FeatherM0),
        ("feather_rp2040_rfm", BoardVariant::FeatherRp2040Rfm),
        ("feather_328p_wing", BoardVariant::Feather328pWing),
        ("feather_esp8266_wing", BoardVariant::FeatherEsp8266Wing),
        ("feather_esp32s2_wing", BoardVariant::FeatherEsp32s2Wing),
        ("feather_esp32_wing", BoardVariant::FeatherEsp32Wing),
        ("feather_nrf52832_wing", BoardVariant::FeatherNrf52832Wing),
    ];

    /// Look up a board by its config file name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, board)| *board)
    }

    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, b)| *b == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// Factory wiring of the radio on this board
    pub const fn radio_pins(self) -> RadioPins {
        match self {
            BoardVariant::Feather32u4 => RadioPins::feather(8, 7, 4, Some(13)),
            BoardVariant::FeatherM0 => RadioPins::feather(8, 3, 4, Some(13)),
            BoardVariant::FeatherRp2040Rfm => RadioPins::feather(16, 21, 17, Some(13)),
            BoardVariant::Feather328pWing => RadioPins::feather(4, 3, 2, Some(13)),
            BoardVariant::FeatherEsp8266Wing => RadioPins::feather(2, 15, 16, Some(0)),
            BoardVariant::FeatherEsp32s2Wing => RadioPins::feather(10, 9, 11, Some(13)),
            // GPIO13 is taken by the radio reset on this wing
            BoardVariant::FeatherEsp32Wing => RadioPins::feather(33, 27, 13, None),
            BoardVariant::FeatherNrf52832Wing => RadioPins::feather(11, 31, 7, Some(17)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_config() {
        let pin = PinConfig::new(10);
        assert_eq!(pin.pin, 10);
        assert!(!pin.inverted);
        assert!(!pin.pull_up);

        let inverted = PinConfig::inverted(12);
        assert!(inverted.inverted);

        let pullup = PinConfig::with_pullup(4);
        assert!(pullup.pull_up);
    }

    #[test]
    fn test_rp2040_pins() {
        let pins = BoardVariant::FeatherRp2040Rfm.radio_pins();
        assert_eq!(pins.cs.pin, 16);
        assert_eq!(pins.irq.pin, 21);
        assert_eq!(pins.reset.pin, 17);
        assert_eq!(pins.led, Some(PinConfig::new(13)));
        assert_eq!(RadioPins::default(), pins);
    }

    #[test]
    fn test_wing_pins() {
        let pins = BoardVariant::FeatherEsp32Wing.radio_pins();
        assert_eq!((pins.cs.pin, pins.irq.pin, pins.reset.pin), (33, 27, 13));
        assert_eq!(pins.led, None);

        let pins = BoardVariant::Feather32u4.radio_pins();
        assert_eq!((pins.cs.pin, pins.irq.pin, pins.reset.pin), (8, 7, 4));
    }

    #[test]
    fn test_presets_have_no_conflicts() {
        for (_, board) in BoardVariant::NAMES {
            assert!(!board.radio_pins().has_conflict(), "{:?}", board);
        }
    }

    #[test]
    fn test_conflict_detected() {
        let mut pins = RadioPins::default();
        pins.reset = PinConfig::new(16);
        assert!(pins.has_conflict());
    }

    #[test]
    fn test_board_names() {
        for (name, board) in BoardVariant::NAMES {
            assert_eq!(BoardVariant::from_name(name), Some(board));
            assert_eq!(board.name(), name);
        }
        assert_eq!(BoardVariant::from_name("arduino_uno"), None);
    }
}
