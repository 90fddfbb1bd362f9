//! Roverlink - handheld LoRa rover controller
//!
//! Firmware for the Adafruit Feather RP2040 RFM with a mini TFT wing.
//! Reads the button pad, sends one `RoverId,Command` frame per held
//! control and listens briefly for the rover's reply.
//!
//! The control loop is strictly sequential and runs on the executor's
//! only task; nothing else is spawned.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::{Delay, Timer};
use roverlink_core::config::{parse_config, ControllerConfig, RadioPins};
use roverlink_core::source::ModeSource;
use roverlink_core::state::FatalKind;
use roverlink_core::{halt_unbuilt, Controller};
use roverlink_drivers::input::SeesawButtons;
use roverlink_drivers::radio::Rfm95;
use roverlink_hal::gpio::Polarized;
use roverlink_hal::i2c::I2cConfig;
use roverlink_hal::spi::SpiConfig;
use roverlink_hal_rp2040::{BoardPeripherals, PinBank, PinError, RpInput, RpOutput};
use {defmt_rtt as _, panic_probe as _};

mod feedback;

use feedback::LogFeedback;

/// Embedded configuration (compiled into firmware)
/// Edit controller.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../controller.toml");

/// Pins driving the radio and the transmit indicator
struct RadioLines {
    cs: RpOutput,
    reset: RpOutput,
    dio0: RpInput,
    led: Option<Polarized<RpOutput>>,
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Roverlink controller starting...");

    let p = embassy_rp::init(Default::default());
    let config = load_config();

    if config.board != roverlink_core::config::BoardVariant::FeatherRp2040Rfm {
        warn!(
            "board {=str} is not an RP2040 board, using its pin numbers as-is",
            config.board.name()
        );
    }

    let BoardPeripherals { spi, i2c, mut pins } =
        BoardPeripherals::new(p, SpiConfig::default(), I2cConfig::STANDARD);

    let lines = match take_radio_lines(&mut pins, &config.pins) {
        Ok(lines) => lines,
        Err(e) => {
            error!("radio pins unusable: {}", e);
            halt_unbuilt(&mut LogFeedback::new(), FatalKind::Pins);
            park().await
        }
    };
    let ping = config.ping_command.clone();

    let radio = Rfm95::new(spi, lines.cs, lines.reset, lines.dio0, Delay)
        .with_reset_pulse_ms(config.timing.reset_pulse_ms);
    let buttons = SeesawButtons::new(i2c, Delay);
    let source = ModeSource::new(config.mode, buttons, config.hold, ping);

    info!("Peripherals initialized");

    let mut controller = Controller::new(
        config,
        radio,
        lines.led,
        source,
        LogFeedback::new(),
        Delay,
    );
    controller.run()
}

/// Parse the embedded config, falling back to the built-in defaults
fn load_config() -> ControllerConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration");
            config
        }
        Err(e) => {
            // build.rs rejects a broken controller.toml, so this is a mismatch
            // between the build-time and runtime parsers
            warn!("embedded config line {}: {}, using defaults", e.line, e.kind);
            ControllerConfig::new()
        }
    }
}

fn take_radio_lines(pins: &mut PinBank, wiring: &RadioPins) -> Result<RadioLines, PinError> {
    // CS idles high; reset is released until the driver pulses it
    let cs = pins.output(wiring.cs.pin, true)?;
    let reset = pins.output(wiring.reset.pin, true)?;
    let dio0 = pins.input(wiring.irq.pin, wiring.irq.pull_up)?;
    let led = match wiring.led {
        Some(led) => Some(Polarized::new(pins.output(led.pin, led.inverted)?, led.inverted)),
        None => None,
    };
    Ok(RadioLines {
        cs,
        reset,
        dio0,
        led,
    })
}

/// Halted before the controller existed; idle forever
async fn park() -> ! {
    loop {
        Timer::after_secs(60).await;
    }
}
