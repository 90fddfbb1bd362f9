//! Seesaw mini TFT wing button pad
//!
//! The wing's buttons, backlight and TFT reset line hang off a seesaw
//! co-processor on I²C. Buttons are pulled up and read active-low as one
//! 32-bit bulk GPIO read.

use embedded_hal::delay::DelayNs;
use roverlink_core::traits::{InputError, InputSource};
use roverlink_hal::I2cBus;
use roverlink_protocol::{Control, ControlSet};

use crate::fmt::{debug, warn};

/// Default I²C address of the mini TFT wing
pub const DEFAULT_ADDRESS: u8 = 0x5E;

/// Value of the HW_ID register on SAMD09 seesaw parts
pub const HW_ID: u8 = 0x55;

/// Seesaw module base addresses and their registers
pub mod reg {
    pub const STATUS_BASE: u8 = 0x00;
    pub const GPIO_BASE: u8 = 0x01;
    pub const PWM_BASE: u8 = 0x08;

    /// STATUS: hardware id
    pub const STATUS_HW_ID: u8 = 0x01;
    /// STATUS: software reset, write 0xFF
    pub const STATUS_SWRST: u8 = 0x7F;

    pub const GPIO_DIRSET_BULK: u8 = 0x02;
    pub const GPIO_DIRCLR_BULK: u8 = 0x03;
    pub const GPIO_BULK: u8 = 0x04;
    pub const GPIO_BULK_SET: u8 = 0x05;
    pub const GPIO_BULK_CLR: u8 = 0x06;
    pub const GPIO_PULLENSET: u8 = 0x0B;

    /// PWM: [pin, value_hi, value_lo]
    pub const PWM_VAL: u8 = 0x01;
}

/// Wing pin numbers
pub mod pin {
    pub const BACKLIGHT: u8 = 5;
    pub const TFT_RESET: u8 = 8;

    pub const UP: u8 = 2;
    pub const LEFT: u8 = 3;
    pub const DOWN: u8 = 4;
    pub const RIGHT: u8 = 7;
    pub const B: u8 = 9;
    pub const A: u8 = 10;
    pub const SELECT: u8 = 11;
}

/// Backlight PWM value for fully on (the backlight driver is inverted)
pub const BACKLIGHT_ON: u16 = 0;
/// Backlight PWM value for off
pub const BACKLIGHT_OFF: u16 = 0xFFFF;

const BUTTON_PINS: [(u8, Control); 7] = [
    (pin::LEFT, Control::Left),
    (pin::RIGHT, Control::Right),
    (pin::DOWN, Control::Down),
    (pin::UP, Control::Up),
    (pin::A, Control::A),
    (pin::B, Control::B),
    (pin::SELECT, Control::Select),
];

/// Bulk mask covering every button pin
pub const BUTTON_MASK: u32 = {
    let mut mask = 0;
    let mut i = 0;
    while i < BUTTON_PINS.len() {
        mask |= 1 << BUTTON_PINS[i].0;
        i += 1;
    }
    mask
};

/// Time the seesaw needs between a register select and the read
const READ_DELAY_US: u32 = 250;

/// Settle time after a software reset
const RESET_SETTLE_MS: u32 = 10;

/// HW_ID polls before giving up
const HW_ID_ATTEMPTS: u32 = 10;

/// Map a raw bulk read (active-low) to controls
pub fn controls_from_bulk(bulk: u32) -> ControlSet {
    let pressed = !bulk & BUTTON_MASK;
    BUTTON_PINS
        .iter()
        .filter(|(pin, _)| pressed & (1 << pin) != 0)
        .map(|&(_, control)| control)
        .collect()
}

/// Seesaw button pad driver
pub struct SeesawButtons<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2cBus, D: DelayNs> SeesawButtons<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn write_register(&mut self, base: u8, function: u8, data: &[u8]) -> Result<(), InputError> {
        let mut buf = [0u8; 6];
        let len = 2 + data.len();
        buf[0] = base;
        buf[1] = function;
        buf[2..len].copy_from_slice(data);
        self.i2c
            .write(self.address, &buf[..len])
            .map_err(|_| InputError::Bus)
    }

    fn read_register(&mut self, base: u8, function: u8, buf: &mut [u8]) -> Result<(), InputError> {
        self.i2c
            .write(self.address, &[base, function])
            .map_err(|_| InputError::Bus)?;
        self.delay.delay_us(READ_DELAY_US);
        self.i2c
            .read(self.address, buf)
            .map_err(|_| InputError::Bus)
    }

    fn write_mask(&mut self, function: u8, mask: u32) -> Result<(), InputError> {
        self.write_register(reg::GPIO_BASE, function, &mask.to_be_bytes())
    }

    fn software_reset(&mut self) -> Result<(), InputError> {
        self.write_register(reg::STATUS_BASE, reg::STATUS_SWRST, &[0xFF])?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        Ok(())
    }

    /// Poll HW_ID until the chip answers with the seesaw id
    fn probe(&mut self) -> Result<(), InputError> {
        let mut id = [0u8];
        for _ in 0..HW_ID_ATTEMPTS {
            // NACKs are expected while the chip is still booting
            let answered = self
                .read_register(reg::STATUS_BASE, reg::STATUS_HW_ID, &mut id)
                .is_ok();
            if answered && id[0] == HW_ID {
                return Ok(());
            }
            self.delay.delay_ms(RESET_SETTLE_MS);
        }
        warn!("seesaw not found at {=u8:#x} (id {=u8:#x})", self.address, id[0]);
        Err(InputError::NotFound)
    }

    /// Drive the TFT reset line high, releasing the display
    pub fn tft_reset(&mut self, release: bool) -> Result<(), InputError> {
        let function = if release {
            reg::GPIO_BULK_SET
        } else {
            reg::GPIO_BULK_CLR
        };
        self.write_mask(function, 1 << pin::TFT_RESET)
    }

    /// Set the backlight PWM value
    pub fn set_backlight(&mut self, value: u16) -> Result<(), InputError> {
        let [hi, lo] = value.to_be_bytes();
        self.write_register(reg::PWM_BASE, reg::PWM_VAL, &[pin::BACKLIGHT, hi, lo])
    }

    /// Raw bulk GPIO state
    pub fn read_bulk(&mut self) -> Result<u32, InputError> {
        let mut buf = [0u8; 4];
        self.read_register(reg::GPIO_BASE, reg::GPIO_BULK, &mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }
}

impl<I2C: I2cBus, D: DelayNs> InputSource for SeesawButtons<I2C, D> {
    fn begin(&mut self) -> Result<(), InputError> {
        self.software_reset()?;
        self.probe()?;

        self.write_mask(reg::GPIO_DIRSET_BULK, 1 << pin::TFT_RESET)?;
        self.write_mask(reg::GPIO_DIRCLR_BULK, BUTTON_MASK)?;
        self.write_mask(reg::GPIO_PULLENSET, BUTTON_MASK)?;
        self.write_mask(reg::GPIO_BULK_SET, BUTTON_MASK)?;

        self.tft_reset(true)?;
        self.set_backlight(BACKLIGHT_ON)?;
        debug!("seesaw up at {=u8:#x}", self.address);
        Ok(())
    }

    fn read(&mut self) -> Result<ControlSet, InputError> {
        self.read_bulk().map(controls_from_bulk)
    }
}
