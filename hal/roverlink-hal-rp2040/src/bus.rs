//! Blocking SPI and I²C buses
//!
//! The control loop is strictly sequential, so the blocking embassy-rp
//! drivers are used directly.

use embassy_rp::i2c::{self, I2c};
use embassy_rp::spi::{self, Phase, Polarity, Spi};
use embassy_rp::Peri;
use embassy_rp::peripherals::{I2C1, PIN_14, PIN_15, PIN_2, PIN_3, PIN_8, SPI1};
use roverlink_hal::i2c::I2cConfig;
use roverlink_hal::spi::SpiConfig;
use roverlink_hal::{I2cBus, SpiBus};

/// SPI1 on the Feather RP2040 RFM radio pins (SCK 14, MOSI 15, MISO 8)
pub struct RpSpi(Spi<'static, SPI1, spi::Blocking>);

impl RpSpi {
    pub fn new(
        spi: Peri<'static, SPI1>,
        sck: Peri<'static, PIN_14>,
        mosi: Peri<'static, PIN_15>,
        miso: Peri<'static, PIN_8>,
        config: SpiConfig,
    ) -> Self {
        let mut rp_config = spi::Config::default();
        rp_config.frequency = config.frequency;
        rp_config.polarity = if config.mode.idle_high() {
            Polarity::IdleHigh
        } else {
            Polarity::IdleLow
        };
        rp_config.phase = if config.mode.capture_on_second() {
            Phase::CaptureOnSecondTransition
        } else {
            Phase::CaptureOnFirstTransition
        };
        Self(Spi::new_blocking(spi, sck, mosi, miso, rp_config))
    }
}

impl SpiBus for RpSpi {
    type Error = spi::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.0.blocking_write(data)
    }

    fn transfer_in_place(&mut self, data: &mut [u8]) -> Result<(), Self::Error> {
        self.0.blocking_transfer_in_place(data)
    }
}

/// I2C1 on the Feather STEMMA/wing pins (SDA 2, SCL 3)
pub struct RpI2c(I2c<'static, I2C1, i2c::Blocking>);

impl RpI2c {
    pub fn new(
        i2c: Peri<'static, I2C1>,
        scl: Peri<'static, PIN_3>,
        sda: Peri<'static, PIN_2>,
        config: I2cConfig,
    ) -> Self {
        let mut rp_config = i2c::Config::default();
        rp_config.frequency = config.frequency;
        Self(I2c::new_blocking(i2c, scl, sda, rp_config))
    }
}

impl I2cBus for RpI2c {
    type Error = i2c::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.0.blocking_write(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.0.blocking_read(address, buf)
    }
}
