//! RFM95 LoRa radio driver (SX1276 over SPI)
//!
//! Register-level driver that talks the same over-the-air format as the
//! RadioHead `RH_RF95` driver, so stock RadioHead receivers on the rover
//! accept our packets and we accept theirs.
//!
//! # Packet format
//!
//! Every LoRa packet starts with a 4-byte RadioHead header:
//! - TO: destination address (0xFF = broadcast)
//! - FROM: source address
//! - ID: sequence number
//! - FLAGS: unused, 0
//!
//! The header is added on transmit and stripped (after address filtering)
//! on receive; callers only see their payload.
//!
//! # Modem settings
//!
//! Bw125Cr45Sf128: 125 kHz bandwidth, coding rate 4/5, spreading factor 7,
//! explicit header, CRC on. Preamble of 8 symbols.
//!
//! # Interrupts
//!
//! DIO0 is mapped to TxDone while transmitting and RxDone while receiving.
//! The driver polls it instead of taking an interrupt.

use embedded_hal::delay::DelayNs;
use roverlink_core::traits::{RadioConfig, RadioError, RadioTransport, RxInfo};
use roverlink_hal::{InputPin, OutputPin, SpiBus};

use crate::fmt::{debug, trace, warn};

/// SX1276 register addresses (LoRa mode)
pub mod reg {
    /// FIFO read/write access
    pub const FIFO: u8 = 0x00;
    /// Operating mode and LoRa/FSK selection
    pub const OP_MODE: u8 = 0x01;
    /// Carrier frequency, MSB
    pub const FRF_MSB: u8 = 0x06;
    /// Carrier frequency, middle byte
    pub const FRF_MID: u8 = 0x07;
    /// Carrier frequency, LSB
    pub const FRF_LSB: u8 = 0x08;
    /// Power amplifier selection and output power
    pub const PA_CONFIG: u8 = 0x09;
    /// FIFO SPI pointer
    pub const FIFO_ADDR_PTR: u8 = 0x0D;
    /// Start of TX data in FIFO
    pub const FIFO_TX_BASE_ADDR: u8 = 0x0E;
    /// Start of RX data in FIFO
    pub const FIFO_RX_BASE_ADDR: u8 = 0x0F;
    /// Start of last received packet in FIFO
    pub const FIFO_RX_CURRENT_ADDR: u8 = 0x10;
    /// Interrupt flags, write 1 to clear
    pub const IRQ_FLAGS: u8 = 0x12;
    /// Length of last received packet
    pub const RX_NB_BYTES: u8 = 0x13;
    /// SNR of last packet, signed, quarter dB
    pub const PKT_SNR_VALUE: u8 = 0x19;
    /// RSSI of last packet
    pub const PKT_RSSI_VALUE: u8 = 0x1A;
    /// Bandwidth, coding rate, header mode
    pub const MODEM_CONFIG1: u8 = 0x1D;
    /// Spreading factor, CRC
    pub const MODEM_CONFIG2: u8 = 0x1E;
    /// Preamble length, MSB
    pub const PREAMBLE_MSB: u8 = 0x20;
    /// Preamble length, LSB
    pub const PREAMBLE_LSB: u8 = 0x21;
    /// TX payload length
    pub const PAYLOAD_LENGTH: u8 = 0x22;
    /// Low data rate optimisation, AGC
    pub const MODEM_CONFIG3: u8 = 0x26;
    /// DIO0..DIO3 function mapping
    pub const DIO_MAPPING1: u8 = 0x40;
    /// Silicon revision
    pub const VERSION: u8 = 0x42;
    /// High power PA_BOOST DAC
    pub const PA_DAC: u8 = 0x4D;
}

/// OP_MODE values
pub mod mode {
    /// LoRa (long range) mode bit
    pub const LONG_RANGE: u8 = 0x80;
    pub const SLEEP: u8 = 0x00;
    pub const STDBY: u8 = 0x01;
    pub const TX: u8 = 0x03;
    pub const RX_CONTINUOUS: u8 = 0x05;
    /// Mode field mask
    pub const MASK: u8 = 0x07;
}

/// IRQ_FLAGS bits
pub mod irq {
    pub const RX_DONE: u8 = 0x40;
    pub const PAYLOAD_CRC_ERROR: u8 = 0x20;
    pub const TX_DONE: u8 = 0x08;
    pub const ALL: u8 = 0xFF;
}

/// SPI write flag on the address byte
const WRITE: u8 = 0x80;

/// DIO0 = RxDone
const DIO0_RX_DONE: u8 = 0x00;
/// DIO0 = TxDone
const DIO0_TX_DONE: u8 = 0x40;

/// SX1276 crystal frequency
const FXOSC_HZ: u64 = 32_000_000;

/// Frequencies at or above this use the high-frequency RF port
const HF_PORT_MIN_HZ: u32 = 779_000_000;

/// Tunable range of the RFM9x family
const MIN_FREQUENCY_HZ: u32 = 137_000_000;
const MAX_FREQUENCY_HZ: u32 = 1_020_000_000;

/// PA_CONFIG: select PA_BOOST
const PA_SELECT: u8 = 0x80;
/// PA_CONFIG: MaxPower field for the RFO pin
const RFO_MAX_POWER: u8 = 0x70;
/// PA_DAC: +20 dBm on PA_BOOST
const PA_DAC_ENABLE: u8 = 0x87;
/// PA_DAC: default
const PA_DAC_DISABLE: u8 = 0x84;

/// Bw125Cr45Sf128
const MODEM_CONFIG: [u8; 3] = [0x72, 0x74, 0x04];

/// Preamble length in symbols
const PREAMBLE_LEN: u16 = 8;

/// RadioHead header length
pub const HEADER_LEN: usize = 4;

/// FIFO size
const FIFO_LEN: usize = 256;

/// Largest user payload per packet
pub const MAX_MESSAGE_LEN: usize = 255 - HEADER_LEN;

/// RadioHead broadcast address
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// Poll interval while waiting on DIO0
const POLL_INTERVAL_MS: u32 = 1;

/// Longest wait for a previous packet to leave before `send` gives up
const TX_TIMEOUT_MS: u32 = 500;

/// Settle time after entering sleep during bring-up
const SLEEP_SETTLE_MS: u32 = 10;

/// Default reset pulse width
const DEFAULT_RESET_PULSE_MS: u32 = 10;

/// Driver-side view of the transceiver mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioMode {
    /// Not configured yet
    Uninit,
    Idle,
    Tx,
    Rx,
}

/// Receive-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxCounters {
    /// Packets accepted
    pub good: u32,
    /// Packets dropped for CRC errors or short headers
    pub bad: u32,
    /// Packets addressed to another node
    pub filtered: u32,
}

/// RFM95 driver
///
/// Owns the SPI bus, chip select, reset line, DIO0 line and a delay source.
pub struct Rfm95<SPI, CS, RST, IRQ, D> {
    spi: SPI,
    cs: CS,
    reset: RST,
    dio0: IRQ,
    delay: D,
    reset_pulse_ms: u32,
    address: u8,
    mode: RadioMode,
    frequency_hz: u32,
    tx_id: u8,
    last_rssi: Option<i16>,
    counters: RxCounters,
}

impl<SPI, CS, RST, IRQ, D> Rfm95<SPI, CS, RST, IRQ, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    RST: OutputPin,
    IRQ: InputPin,
    D: DelayNs,
{
    /// Create a driver. Nothing is sent to the radio until `configure`.
    pub fn new(spi: SPI, mut cs: CS, mut reset: RST, dio0: IRQ, delay: D) -> Self {
        cs.set_high();
        reset.set_high();
        Self {
            spi,
            cs,
            reset,
            dio0,
            delay,
            reset_pulse_ms: DEFAULT_RESET_PULSE_MS,
            address: BROADCAST_ADDRESS,
            mode: RadioMode::Uninit,
            frequency_hz: 0,
            tx_id: 0,
            last_rssi: None,
            counters: RxCounters::default(),
        }
    }

    /// Set the reset pulse width used by `configure`
    pub fn with_reset_pulse_ms(mut self, ms: u32) -> Self {
        self.reset_pulse_ms = ms;
        self
    }

    /// Set this node's address. Packets to other addresses are dropped.
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn mode(&self) -> RadioMode {
        self.mode
    }

    /// RSSI of the last accepted packet in dBm
    pub fn last_rssi(&self) -> Option<i16> {
        self.last_rssi
    }

    pub fn counters(&self) -> RxCounters {
        self.counters
    }

    /// Release the owned peripherals
    pub fn release(self) -> (SPI, CS, RST, IRQ, D) {
        (self.spi, self.cs, self.reset, self.dio0, self.delay)
    }

    fn read_register(&mut self, addr: u8) -> Result<u8, RadioError> {
        let mut buf = [addr & !WRITE, 0];
        self.cs.set_low();
        let result = self.spi.transfer_in_place(&mut buf);
        self.cs.set_high();
        result.map_err(|_| RadioError::Bus)?;
        Ok(buf[1])
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), RadioError> {
        self.cs.set_low();
        let result = self.spi.write(&[addr | WRITE, value]);
        self.cs.set_high();
        result.map_err(|_| RadioError::Bus)
    }

    /// Write `parts` back to back in one transaction starting at `addr`
    fn write_burst(&mut self, addr: u8, parts: &[&[u8]]) -> Result<(), RadioError> {
        self.cs.set_low();
        let mut result = self.spi.write(&[addr | WRITE]);
        for part in parts {
            if result.is_err() {
                break;
            }
            result = self.spi.write(part);
        }
        self.cs.set_high();
        result.map_err(|_| RadioError::Bus)
    }

    fn read_burst(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), RadioError> {
        buf.fill(0);
        self.cs.set_low();
        let mut result = self.spi.write(&[addr & !WRITE]);
        if result.is_ok() {
            result = self.spi.transfer_in_place(buf);
        }
        self.cs.set_high();
        result.map_err(|_| RadioError::Bus)
    }

    fn set_op_mode(&mut self, op: u8) -> Result<(), RadioError> {
        self.write_register(reg::OP_MODE, mode::LONG_RANGE | op)
    }

    fn set_mode_idle(&mut self) -> Result<(), RadioError> {
        if self.mode != RadioMode::Idle {
            self.set_op_mode(mode::STDBY)?;
            self.mode = RadioMode::Idle;
        }
        Ok(())
    }

    fn set_mode_rx(&mut self) -> Result<(), RadioError> {
        if self.mode != RadioMode::Rx {
            self.set_op_mode(mode::RX_CONTINUOUS)?;
            self.write_register(reg::DIO_MAPPING1, DIO0_RX_DONE)?;
            self.mode = RadioMode::Rx;
        }
        Ok(())
    }

    fn set_mode_tx(&mut self) -> Result<(), RadioError> {
        self.set_op_mode(mode::TX)?;
        self.write_register(reg::DIO_MAPPING1, DIO0_TX_DONE)?;
        self.mode = RadioMode::Tx;
        Ok(())
    }

    /// Pulse the reset line low, then give the module time to boot
    fn hard_reset(&mut self) {
        self.reset.set_low();
        self.delay.delay_ms(self.reset_pulse_ms);
        self.reset.set_high();
        self.delay.delay_ms(self.reset_pulse_ms);
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), RadioError> {
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&frequency_hz) {
            return Err(RadioError::FrequencyRejected);
        }
        let frf = frf_for(frequency_hz);
        self.write_register(reg::FRF_MSB, (frf >> 16) as u8)?;
        self.write_register(reg::FRF_MID, (frf >> 8) as u8)?;
        self.write_register(reg::FRF_LSB, frf as u8)?;
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    fn set_tx_power(&mut self, power_dbm: i8, pa_boost: bool) -> Result<(), RadioError> {
        let (pa_dac, pa_config) = pa_settings(power_dbm, pa_boost)?;
        if let Some(pa_dac) = pa_dac {
            self.write_register(reg::PA_DAC, pa_dac)?;
        }
        self.write_register(reg::PA_CONFIG, pa_config)
    }

    /// Wait for a packet in flight to finish. Returns false on timeout.
    fn wait_packet_sent(&mut self, timeout_ms: u32) -> Result<bool, RadioError> {
        let mut waited = 0;
        while self.mode == RadioMode::Tx {
            self.check_tx_done()?;
            if self.mode != RadioMode::Tx {
                break;
            }
            if waited >= timeout_ms {
                return Ok(false);
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
            waited += POLL_INTERVAL_MS;
        }
        Ok(true)
    }

    fn check_tx_done(&mut self) -> Result<(), RadioError> {
        if !self.dio0.is_high() {
            return Ok(());
        }
        let flags = self.read_register(reg::IRQ_FLAGS)?;
        if flags & irq::TX_DONE != 0 {
            self.write_register(reg::IRQ_FLAGS, irq::ALL)?;
            self.mode = RadioMode::Idle;
            trace!("tx done");
        }
        Ok(())
    }

    /// One poll of the receive path. Returns a packet when one was accepted.
    fn poll_receive(&mut self, buf: &mut [u8]) -> Result<Option<RxInfo>, RadioError> {
        if self.mode == RadioMode::Tx {
            self.check_tx_done()?;
            if self.mode == RadioMode::Tx {
                return Ok(None);
            }
        }
        self.set_mode_rx()?;

        if !self.dio0.is_high() {
            return Ok(None);
        }
        let flags = self.read_register(reg::IRQ_FLAGS)?;
        self.write_register(reg::IRQ_FLAGS, irq::ALL)?;

        if flags & irq::RX_DONE == 0 {
            return Ok(None);
        }
        if flags & irq::PAYLOAD_CRC_ERROR != 0 {
            self.counters.bad += 1;
            debug!("rx crc error");
            return Ok(None);
        }

        let len = self.read_register(reg::RX_NB_BYTES)? as usize;
        let start = self.read_register(reg::FIFO_RX_CURRENT_ADDR)?;
        self.write_register(reg::FIFO_ADDR_PTR, start)?;
        let mut packet = [0u8; FIFO_LEN];
        self.read_burst(reg::FIFO, &mut packet[..len])?;

        let snr = self.read_register(reg::PKT_SNR_VALUE)? as i8;
        let raw_rssi = self.read_register(reg::PKT_RSSI_VALUE)?;
        let rssi = packet_rssi(raw_rssi, snr, self.frequency_hz >= HF_PORT_MIN_HZ);

        if len < HEADER_LEN {
            self.counters.bad += 1;
            debug!("rx short packet ({} bytes)", len);
            return Ok(None);
        }
        let to = packet[0];
        if to != self.address && to != BROADCAST_ADDRESS {
            self.counters.filtered += 1;
            trace!("rx for node {}, ignored", to);
            return Ok(None);
        }

        let payload = &packet[HEADER_LEN..len];
        let copied = payload.len().min(buf.len());
        buf[..copied].copy_from_slice(&payload[..copied]);

        self.counters.good += 1;
        self.last_rssi = Some(rssi);
        Ok(Some(RxInfo { len: copied, rssi }))
    }
}

impl<SPI, CS, RST, IRQ, D> RadioTransport for Rfm95<SPI, CS, RST, IRQ, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    RST: OutputPin,
    IRQ: InputPin,
    D: DelayNs,
{
    fn configure(&mut self, config: &RadioConfig) -> Result<(), RadioError> {
        // Validate before touching the module so a rejected config leaves it idle
        pa_settings(config.tx_power_dbm, config.pa_boost)?;
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&config.frequency_hz) {
            return Err(RadioError::FrequencyRejected);
        }

        self.mode = RadioMode::Uninit;
        self.hard_reset();

        let version = self.read_register(reg::VERSION)?;
        if version == 0x00 || version == 0xFF {
            warn!("no radio on SPI (version {=u8:#x})", version);
            return Err(RadioError::NotFound);
        }

        // LoRa mode can only be selected from sleep
        self.write_register(reg::OP_MODE, mode::LONG_RANGE | mode::SLEEP)?;
        self.delay.delay_ms(SLEEP_SETTLE_MS);
        let op_mode = self.read_register(reg::OP_MODE)?;
        if op_mode != mode::LONG_RANGE | mode::SLEEP {
            warn!("radio refused LoRa mode (op mode {=u8:#x})", op_mode);
            return Err(RadioError::InitFailed);
        }

        // Whole FIFO for each direction; TX and RX never overlap in time
        self.write_register(reg::FIFO_TX_BASE_ADDR, 0)?;
        self.write_register(reg::FIFO_RX_BASE_ADDR, 0)?;
        self.set_op_mode(mode::STDBY)?;
        self.mode = RadioMode::Idle;

        self.write_register(reg::MODEM_CONFIG1, MODEM_CONFIG[0])?;
        self.write_register(reg::MODEM_CONFIG2, MODEM_CONFIG[1])?;
        self.write_register(reg::MODEM_CONFIG3, MODEM_CONFIG[2])?;
        self.write_register(reg::PREAMBLE_MSB, (PREAMBLE_LEN >> 8) as u8)?;
        self.write_register(reg::PREAMBLE_LSB, PREAMBLE_LEN as u8)?;

        self.set_frequency(config.frequency_hz)?;
        self.set_tx_power(config.tx_power_dbm, config.pa_boost)?;

        debug!(
            "rfm95 v{=u8:#x} up: {} Hz, {} dBm",
            version, config.frequency_hz, config.tx_power_dbm
        );
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if self.mode == RadioMode::Uninit {
            return Err(RadioError::InitFailed);
        }
        if payload.len() > MAX_MESSAGE_LEN {
            return Err(RadioError::PayloadTooLarge);
        }
        // blocks for at most TX_TIMEOUT_MS while the previous packet is on air
        if !self.wait_packet_sent(TX_TIMEOUT_MS)? {
            return Err(RadioError::Busy);
        }

        self.set_mode_idle()?;
        self.write_register(reg::FIFO_ADDR_PTR, 0)?;
        let header = [BROADCAST_ADDRESS, self.address, self.tx_id, 0];
        self.write_burst(reg::FIFO, &[&header, payload])?;
        self.write_register(reg::PAYLOAD_LENGTH, (HEADER_LEN + payload.len()) as u8)?;
        self.set_mode_tx()?;

        self.tx_id = self.tx_id.wrapping_add(1);
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Option<RxInfo> {
        if self.mode == RadioMode::Uninit {
            return None;
        }
        let mut waited = 0;
        loop {
            match self.poll_receive(buf) {
                Ok(Some(info)) => return Some(info),
                Ok(None) => {}
                Err(e) => {
                    warn!("rx failed: {}", e);
                    return None;
                }
            }
            if waited >= timeout_ms {
                return None;
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
            waited += POLL_INTERVAL_MS;
        }
    }

    fn max_payload(&self) -> usize {
        MAX_MESSAGE_LEN
    }
}

/// FRF register value: `freq * 2^19 / FXOSC`
pub fn frf_for(frequency_hz: u32) -> u32 {
    ((u64::from(frequency_hz) << 19) / FXOSC_HZ) as u32
}

/// PA_DAC (if it needs writing) and PA_CONFIG for a power level
fn pa_settings(power_dbm: i8, pa_boost: bool) -> Result<(Option<u8>, u8), RadioError> {
    if pa_boost {
        if !(2..=20).contains(&power_dbm) {
            return Err(RadioError::PowerRejected);
        }
        // The DAC adds about 3 dB; used for the top of the range
        let (dac, level) = if power_dbm > 17 {
            (PA_DAC_ENABLE, power_dbm - 3)
        } else {
            (PA_DAC_DISABLE, power_dbm)
        };
        Ok((Some(dac), PA_SELECT | (level - 2) as u8))
    } else {
        if !(-1..=14).contains(&power_dbm) {
            return Err(RadioError::PowerRejected);
        }
        Ok((None, RFO_MAX_POWER | (power_dbm + 1) as u8))
    }
}

/// Packet RSSI in dBm, corrected by SNR
pub fn packet_rssi(raw: u8, snr_quarter_db: i8, hf_port: bool) -> i16 {
    let snr = i16::from(snr_quarter_db) / 4;
    let raw = i16::from(raw);
    let rssi = if snr < 0 { raw + snr } else { raw * 16 / 15 };
    if hf_port {
        rssi - 157
    } else {
        rssi - 164
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Packet waiting to arrive over the air
    #[derive(Debug, Clone)]
    struct Inbound {
        bytes: Vec<u8>,
        rssi: u8,
        snr: i8,
        crc_error: bool,
    }

    impl Inbound {
        fn radiohead(to: u8, payload: &[u8], rssi: u8, snr: i8) -> Self {
            let mut bytes = vec![to, 0x01, 0x00, 0x00];
            bytes.extend_from_slice(payload);
            Self {
                bytes,
                rssi,
                snr,
                crc_error: false,
            }
        }
    }

    /// SX1276 register file with just enough behaviour for the driver
    #[derive(Debug)]
    struct Chip {
        regs: [u8; 128],
        fifo: [u8; FIFO_LEN],
        version: u8,
        selected: bool,
        addr: Option<u8>,
        writing: bool,
        transmitted: Vec<Vec<u8>>,
        inbound: VecDeque<Inbound>,
        /// DIO0 polls before TxDone fires
        tx_airtime_polls: u32,
        tx_pending: Option<u32>,
        /// Refuse to enter LoRa mode
        stuck_in_fsk: bool,
        mode_writes: Vec<u8>,
    }

    impl Chip {
        fn new() -> Self {
            Self {
                regs: [0; 128],
                fifo: [0; FIFO_LEN],
                version: 0x12,
                selected: false,
                addr: None,
                writing: false,
                transmitted: Vec::new(),
                inbound: VecDeque::new(),
                tx_airtime_polls: 0,
                tx_pending: None,
                stuck_in_fsk: false,
                mode_writes: Vec::new(),
            }
        }

        fn select(&mut self, selected: bool) {
            self.selected = selected;
            self.addr = None;
        }

        fn exchange(&mut self, byte: u8) -> u8 {
            assert!(self.selected, "SPI traffic without chip select");
            let Some(addr) = self.addr else {
                self.writing = byte & WRITE != 0;
                self.addr = Some(byte & !WRITE);
                return 0;
            };
            if addr == reg::FIFO {
                let ptr = self.regs[reg::FIFO_ADDR_PTR as usize] as usize;
                let out = self.fifo[ptr];
                if self.writing {
                    self.fifo[ptr] = byte;
                }
                self.regs[reg::FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1) as u8;
                return out;
            }
            self.addr = Some(addr + 1);
            if self.writing {
                self.write(addr, byte);
                0
            } else {
                self.read(addr)
            }
        }

        fn read(&mut self, addr: u8) -> u8 {
            match addr {
                reg::VERSION => self.version,
                _ => self.regs[addr as usize],
            }
        }

        fn write(&mut self, addr: u8, value: u8) {
            match addr {
                reg::IRQ_FLAGS => {
                    self.regs[addr as usize] &= !value;
                    if self.regs[addr as usize] == 0 && self.op_mode() == mode::RX_CONTINUOUS {
                        self.deliver();
                    }
                }
                reg::OP_MODE => {
                    let value = if self.stuck_in_fsk { value & !mode::LONG_RANGE } else { value };
                    self.regs[addr as usize] = value;
                    self.mode_writes.push(value);
                    match value & mode::MASK {
                        mode::TX => self.transmit(),
                        mode::RX_CONTINUOUS => self.deliver(),
                        _ => {}
                    }
                }
                _ => self.regs[addr as usize] = value,
            }
        }

        fn op_mode(&self) -> u8 {
            self.regs[reg::OP_MODE as usize] & mode::MASK
        }

        fn transmit(&mut self) {
            let start = self.regs[reg::FIFO_TX_BASE_ADDR as usize] as usize;
            let len = self.regs[reg::PAYLOAD_LENGTH as usize] as usize;
            self.transmitted.push(self.fifo[start..start + len].to_vec());
            self.tx_pending = Some(self.tx_airtime_polls);
            self.poll_airtime();
        }

        fn poll_airtime(&mut self) {
            match self.tx_pending {
                Some(0) => {
                    self.tx_pending = None;
                    self.regs[reg::IRQ_FLAGS as usize] |= irq::TX_DONE;
                    self.regs[reg::OP_MODE as usize] =
                        (self.regs[reg::OP_MODE as usize] & !mode::MASK) | mode::STDBY;
                }
                Some(n) => self.tx_pending = Some(n - 1),
                None => {}
            }
        }

        fn deliver(&mut self) {
            if self.regs[reg::IRQ_FLAGS as usize] != 0 {
                return;
            }
            let Some(packet) = self.inbound.pop_front() else {
                return;
            };
            let base = self.regs[reg::FIFO_RX_BASE_ADDR as usize] as usize;
            self.fifo[base..base + packet.bytes.len()].copy_from_slice(&packet.bytes);
            self.regs[reg::RX_NB_BYTES as usize] = packet.bytes.len() as u8;
            self.regs[reg::FIFO_RX_CURRENT_ADDR as usize] = base as u8;
            self.regs[reg::PKT_RSSI_VALUE as usize] = packet.rssi;
            self.regs[reg::PKT_SNR_VALUE as usize] = packet.snr as u8;
            let mut flags = irq::RX_DONE;
            if packet.crc_error {
                flags |= irq::PAYLOAD_CRC_ERROR;
            }
            self.regs[reg::IRQ_FLAGS as usize] |= flags;
        }

        fn dio0(&mut self) -> bool {
            self.poll_airtime();
            let mapping = self.regs[reg::DIO_MAPPING1 as usize] & 0xC0;
            let flags = self.regs[reg::IRQ_FLAGS as usize];
            match mapping {
                DIO0_TX_DONE => flags & irq::TX_DONE != 0,
                _ => flags & irq::RX_DONE != 0,
            }
        }

        fn reg(&self, addr: u8) -> u8 {
            self.regs[addr as usize]
        }
    }

    type Shared = Rc<RefCell<Chip>>;

    struct MockSpi(Shared);

    impl SpiBus for MockSpi {
        type Error = ();

        fn write(&mut self, data: &[u8]) -> Result<(), ()> {
            let mut chip = self.0.borrow_mut();
            for &b in data {
                chip.exchange(b);
            }
            Ok(())
        }

        fn transfer_in_place(&mut self, data: &mut [u8]) -> Result<(), ()> {
            let mut chip = self.0.borrow_mut();
            for b in data.iter_mut() {
                *b = chip.exchange(*b);
            }
            Ok(())
        }
    }

    struct MockCs(Shared);

    impl OutputPin for MockCs {
        fn set_high(&mut self) {
            self.0.borrow_mut().select(false);
        }
        fn set_low(&mut self) {
            self.0.borrow_mut().select(true);
        }
        fn is_set_high(&self) -> bool {
            !self.0.borrow().selected
        }
    }

    #[derive(Default, Clone)]
    struct MockReset(Rc<RefCell<Vec<bool>>>);

    impl OutputPin for MockReset {
        fn set_high(&mut self) {
            self.0.borrow_mut().push(true);
        }
        fn set_low(&mut self) {
            self.0.borrow_mut().push(false);
        }
        fn is_set_high(&self) -> bool {
            self.0.borrow().last().copied().unwrap_or(false)
        }
    }

    struct MockDio0(Shared);

    impl InputPin for MockDio0 {
        fn is_high(&self) -> bool {
            self.0.borrow_mut().dio0()
        }
    }

    #[derive(Default, Clone)]
    struct MockDelay(Rc<RefCell<u64>>);

    impl MockDelay {
        fn elapsed_ms(&self) -> u64 {
            *self.0.borrow() / 1_000_000
        }
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            *self.0.borrow_mut() += u64::from(ns);
        }
    }

    type Driver = Rfm95<MockSpi, MockCs, MockReset, MockDio0, MockDelay>;

    fn driver() -> (Driver, Shared, MockReset, MockDelay) {
        let chip = Rc::new(RefCell::new(Chip::new()));
        let reset = MockReset::default();
        let delay = MockDelay::default();
        let radio = Rfm95::new(
            MockSpi(chip.clone()),
            MockCs(chip.clone()),
            reset.clone(),
            MockDio0(chip.clone()),
            delay.clone(),
        );
        (radio, chip, reset, delay)
    }

    fn configured() -> (Driver, Shared, MockDelay) {
        let (mut radio, chip, _, delay) = driver();
        radio.configure(&RadioConfig::default()).unwrap();
        (radio, chip, delay)
    }

    #[test]
    fn test_frf() {
        assert_eq!(frf_for(915_000_000), 0xE4C000);
        assert_eq!(frf_for(868_000_000), 0xD90000);
        assert_eq!(frf_for(434_000_000), 0x6C8000);
    }

    #[test]
    fn test_pa_settings() {
        // Stock controller: 5 dBm on PA_BOOST
        assert_eq!(pa_settings(5, true), Ok((Some(PA_DAC_DISABLE), 0x83)));
        assert_eq!(pa_settings(17, true), Ok((Some(PA_DAC_DISABLE), 0x8F)));
        assert_eq!(pa_settings(20, true), Ok((Some(PA_DAC_ENABLE), 0x8F)));
        assert_eq!(pa_settings(14, false), Ok((None, 0x7F)));
        assert_eq!(pa_settings(-1, false), Ok((None, 0x70)));
        assert_eq!(pa_settings(1, true), Err(RadioError::PowerRejected));
        assert_eq!(pa_settings(21, true), Err(RadioError::PowerRejected));
        assert_eq!(pa_settings(15, false), Err(RadioError::PowerRejected));
    }

    #[test]
    fn test_packet_rssi() {
        assert_eq!(packet_rssi(108, 40, true), -42);
        // Negative SNR is added to the raw value
        assert_eq!(packet_rssi(60, -20, true), -102);
        assert_eq!(packet_rssi(100, 0, false), -58);
    }

    #[test]
    fn test_configure_writes_registers() {
        let (mut radio, chip, reset, delay) = driver();

        radio.configure(&RadioConfig::default()).unwrap();

        let chip = chip.borrow();
        assert_eq!(chip.reg(reg::OP_MODE), mode::LONG_RANGE | mode::STDBY);
        assert_eq!(chip.reg(reg::MODEM_CONFIG1), 0x72);
        assert_eq!(chip.reg(reg::MODEM_CONFIG2), 0x74);
        assert_eq!(chip.reg(reg::MODEM_CONFIG3), 0x04);
        assert_eq!(chip.reg(reg::PREAMBLE_MSB), 0);
        assert_eq!(chip.reg(reg::PREAMBLE_LSB), 8);
        assert_eq!(
            [chip.reg(reg::FRF_MSB), chip.reg(reg::FRF_MID), chip.reg(reg::FRF_LSB)],
            [0xE4, 0xC0, 0x00]
        );
        assert_eq!(chip.reg(reg::PA_DAC), PA_DAC_DISABLE);
        assert_eq!(chip.reg(reg::PA_CONFIG), 0x83);
        assert_eq!(radio.mode(), RadioMode::Idle);

        // Reset pulse: low then high, 10 ms each, then the sleep settle
        assert_eq!(*reset.0.borrow(), vec![true, false, true]);
        assert_eq!(delay.elapsed_ms(), 30);
    }

    #[test]
    fn test_configure_missing_radio() {
        let (mut radio, chip, _, _) = driver();
        chip.borrow_mut().version = 0x00;

        assert_eq!(
            radio.configure(&RadioConfig::default()),
            Err(RadioError::NotFound)
        );
        assert_eq!(radio.send(b"1,stop\0"), Err(RadioError::InitFailed));
    }

    #[test]
    fn test_configure_lora_mode_refused() {
        let (mut radio, chip, _, _) = driver();
        chip.borrow_mut().stuck_in_fsk = true;

        assert_eq!(
            radio.configure(&RadioConfig::default()),
            Err(RadioError::InitFailed)
        );
    }

    #[test]
    fn test_configure_rejects_before_touching_radio() {
        let (mut radio, chip, reset, _) = driver();
        let config = RadioConfig {
            frequency_hz: 2_400_000_000,
            ..RadioConfig::default()
        };
        assert_eq!(radio.configure(&config), Err(RadioError::FrequencyRejected));

        let config = RadioConfig {
            tx_power_dbm: 23,
            ..RadioConfig::default()
        };
        assert_eq!(radio.configure(&config), Err(RadioError::PowerRejected));

        assert!(chip.borrow().mode_writes.is_empty());
        // Only the idle-high from construction
        assert_eq!(*reset.0.borrow(), vec![true]);
    }

    #[test]
    fn test_configure_is_repeatable() {
        let (mut radio, chip, _) = configured();
        radio.configure(&RadioConfig::default()).unwrap();
        assert_eq!(chip.borrow().reg(reg::PA_CONFIG), 0x83);
        assert_eq!(radio.mode(), RadioMode::Idle);
    }

    #[test]
    fn test_send_adds_radiohead_header() {
        let (mut radio, chip, _) = configured();

        radio.send(b"1,forward\0").unwrap();

        let chip = chip.borrow();
        assert_eq!(chip.transmitted.len(), 1);
        let packet = &chip.transmitted[0];
        assert_eq!(&packet[..4], &[0xFF, 0xFF, 0x00, 0x00]);
        assert_eq!(&packet[4..], b"1,forward\0");
        assert_eq!(chip.reg(reg::DIO_MAPPING1), DIO0_TX_DONE);
        assert_eq!(radio.mode(), RadioMode::Tx);
    }

    #[test]
    fn test_send_increments_header_id() {
        let (mut radio, chip, _) = configured();
        radio.send(b"a").unwrap();
        radio.send(b"b").unwrap();

        let chip = chip.borrow();
        assert_eq!(chip.transmitted[0][2], 0);
        assert_eq!(chip.transmitted[1][2], 1);
    }

    #[test]
    fn test_send_rejects_oversized_payload() {
        let (mut radio, chip, _) = configured();
        let payload = [b'x'; MAX_MESSAGE_LEN + 1];

        assert_eq!(radio.send(&payload), Err(RadioError::PayloadTooLarge));
        assert!(chip.borrow().transmitted.is_empty());
        assert_eq!(radio.max_payload(), 251);
    }

    #[test]
    fn test_send_busy_when_tx_never_finishes() {
        let (mut radio, chip, delay) = configured();
        chip.borrow_mut().tx_airtime_polls = u32::MAX;
        radio.send(b"1,left\0").unwrap();

        let start = delay.elapsed_ms();
        assert_eq!(radio.send(b"1,left\0"), Err(RadioError::Busy));
        assert_eq!(delay.elapsed_ms() - start, u64::from(TX_TIMEOUT_MS));
        assert_eq!(chip.borrow().transmitted.len(), 1);
    }

    #[test]
    fn test_send_waits_for_previous_packet() {
        let (mut radio, chip, _) = configured();
        chip.borrow_mut().tx_airtime_polls = 5;
        radio.send(b"1,left\0").unwrap();
        radio.send(b"1,right\0").unwrap();
        assert_eq!(chip.borrow().transmitted.len(), 2);
    }

    #[test]
    fn test_receive_reply() {
        let (mut radio, chip, _) = configured();
        chip.borrow_mut()
            .inbound
            .push_back(Inbound::radiohead(0xFF, b"OK", 108, 40));
        radio.send(b"1,beep\0").unwrap();

        let mut buf = [0u8; 64];
        let info = radio.receive(&mut buf, 100).unwrap();

        assert_eq!(info.len, 2);
        assert_eq!(&buf[..2], b"OK");
        assert_eq!(info.rssi, -42);
        assert_eq!(radio.last_rssi(), Some(-42));
        assert_eq!(radio.mode(), RadioMode::Rx);
        assert_eq!(radio.counters().good, 1);
    }

    #[test]
    fn test_receive_waits_out_airtime_within_window() {
        let (mut radio, chip, delay) = configured();
        {
            let mut chip = chip.borrow_mut();
            chip.tx_airtime_polls = 30;
            chip.inbound.push_back(Inbound::radiohead(0xFF, b"ack", 90, 0));
        }
        radio.send(b"1,left\0").unwrap();
        let start = delay.elapsed_ms();

        let mut buf = [0u8; 64];
        assert!(radio.receive(&mut buf, 100).is_some());
        let waited = delay.elapsed_ms() - start;
        assert!(waited > 0 && waited < 100, "waited {} ms", waited);
    }

    #[test]
    fn test_receive_timeout() {
        let (mut radio, _, delay) = configured();
        radio.send(b"1,forward\0").unwrap();
        let start = delay.elapsed_ms();

        let mut buf = [0u8; 64];
        assert_eq!(radio.receive(&mut buf, 100), None);
        assert_eq!(delay.elapsed_ms() - start, 100);
    }

    #[test]
    fn test_receive_drops_crc_error() {
        let (mut radio, chip, _) = configured();
        let mut bad = Inbound::radiohead(0xFF, b"garbled", 80, 10);
        bad.crc_error = true;
        chip.borrow_mut().inbound.push_back(bad);

        let mut buf = [0u8; 64];
        assert_eq!(radio.receive(&mut buf, 20), None);
        assert_eq!(radio.counters().bad, 1);
    }

    #[test]
    fn test_receive_good_packet_after_crc_error() {
        let (mut radio, chip, _) = configured();
        {
            let mut chip = chip.borrow_mut();
            let mut bad = Inbound::radiohead(0xFF, b"garbled", 80, 10);
            bad.crc_error = true;
            chip.inbound.push_back(bad);
            chip.inbound.push_back(Inbound::radiohead(0xFF, b"fine", 80, 10));
        }

        let mut buf = [0u8; 64];
        let info = radio.receive(&mut buf, 20).unwrap();
        assert_eq!(&buf[..info.len], b"fine");
    }

    #[test]
    fn test_receive_filters_other_nodes() {
        let (mut radio, chip, _) = configured();
        radio = radio.with_address(0x01);
        chip.borrow_mut()
            .inbound
            .push_back(Inbound::radiohead(0x07, b"not ours", 80, 10));

        let mut buf = [0u8; 64];
        assert_eq!(radio.receive(&mut buf, 10), None);
        assert_eq!(radio.counters().filtered, 1);
    }

    #[test]
    fn test_receive_short_packet() {
        let (mut radio, chip, _) = configured();
        chip.borrow_mut().inbound.push_back(Inbound {
            bytes: vec![0xFF, 0x01],
            rssi: 80,
            snr: 0,
            crc_error: false,
        });

        let mut buf = [0u8; 64];
        assert_eq!(radio.receive(&mut buf, 10), None);
        assert_eq!(radio.counters().bad, 1);
    }

    #[test]
    fn test_receive_truncates_to_buffer() {
        let (mut radio, chip, _) = configured();
        chip.borrow_mut()
            .inbound
            .push_back(Inbound::radiohead(0xFF, b"0123456789", 80, 0));

        let mut buf = [0u8; 4];
        let info = radio.receive(&mut buf, 10).unwrap();
        assert_eq!(info.len, 4);
        assert_eq!(&buf, b"0123");
    }

    #[test]
    fn test_receive_before_configure() {
        let (mut radio, _, _, delay) = driver();
        let mut buf = [0u8; 8];
        assert_eq!(radio.receive(&mut buf, 100), None);
        assert_eq!(delay.elapsed_ms(), 0);
    }
}
