//! Radio transport trait
//!
//! The transport carries opaque payloads. Framing, addressing headers,
//! modulation and CRC are the implementation's business.

/// Errors reported by a radio transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// No radio answered on the bus
    NotFound,
    /// Radio did not enter the requested mode
    InitFailed,
    /// Carrier frequency outside the module's range
    FrequencyRejected,
    /// Transmit power outside the selected amplifier's range
    PowerRejected,
    /// Still transmitting the previous packet
    Busy,
    /// Payload larger than [`RadioTransport::max_payload`]
    PayloadTooLarge,
    /// SPI or GPIO fault
    Bus,
}

/// Startup radio settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    /// Carrier frequency in Hz
    pub frequency_hz: u32,
    /// Transmit power in dBm
    pub tx_power_dbm: i8,
    /// Use the PA_BOOST pin (true) or the RFO pin (false)
    pub pa_boost: bool,
}

impl Default for RadioConfig {
    /// 915 MHz, 5 dBm on PA_BOOST
    fn default() -> Self {
        Self {
            frequency_hz: 915_000_000,
            tx_power_dbm: 5,
            pa_boost: true,
        }
    }
}

/// Metadata of a received packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxInfo {
    /// Payload bytes written to the caller's buffer
    pub len: usize,
    /// Signal strength in dBm
    pub rssi: i16,
}

/// Packet radio used by the command session
pub trait RadioTransport {
    /// Apply startup settings. Safe to call more than once.
    fn configure(&mut self, config: &RadioConfig) -> Result<(), RadioError>;

    /// Queue a payload for transmission.
    ///
    /// Returns once the radio has accepted the packet; success says nothing
    /// about delivery. A transport may wait a bounded time for its previous
    /// packet to leave and then fail with [`RadioError::Busy`].
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError>;

    /// Wait up to `timeout_ms` for a packet and copy its payload into `buf`.
    ///
    /// Returns `None` on timeout or when the packet failed its CRC.
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Option<RxInfo>;

    /// Largest payload `send` accepts
    fn max_payload(&self) -> usize;
}
