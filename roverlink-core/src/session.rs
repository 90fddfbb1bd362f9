//! Command session: one send followed by one bounded reply wait
//!
//! ```text
//! Sending ──send ok──▶ AwaitingReply ──packet──▶ Replied
//!    │                      │
//!    │                      └──timeout──▶ NoReply
//!    └──send err──▶ SendFailed
//! ```
//!
//! Sessions are single-shot. There are no retries in any phase; the control
//! loop decides whether to send again on a later tick.

use embedded_hal::delay::DelayNs;
use roverlink_hal::OutputPin;
use roverlink_protocol::{decode, InboundReply, OutboundFrame, MAX_FRAME_SIZE};

use crate::fmt::{debug, info, trace, warn};
use crate::traits::{RadioError, RadioTransport};

/// Delays around one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionTiming {
    /// Pause after the radio accepts a frame
    pub settle_ms: u32,
    /// Longest wait for a reply
    pub reply_timeout_ms: u32,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            settle_ms: 10,
            reply_timeout_ms: 100,
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A packet arrived inside the wait window
    Replied(InboundReply),
    /// Nothing arrived inside the wait window
    NoReply,
    /// The radio refused the frame; no wait happened
    SendFailed(RadioError),
}

impl SessionOutcome {
    pub fn is_replied(&self) -> bool {
        matches!(self, SessionOutcome::Replied(_))
    }
}

/// Non-terminal session phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Sending,
    AwaitingReply,
}

/// Borrowed hardware a session runs on
pub struct Link<'a, R, P, D> {
    pub radio: &'a mut R,
    /// Lit for the whole Sending phase, settle delay included
    pub indicator: &'a mut P,
    pub delay: &'a mut D,
    pub timing: SessionTiming,
}

/// Result of advancing a session by one phase
#[derive(Debug)]
pub enum Step<'f> {
    Continue(Session<'f>),
    Finished(SessionOutcome),
}

/// A session in progress
#[derive(Debug)]
pub struct Session<'f> {
    frame: &'f OutboundFrame,
    phase: Phase,
}

impl<'f> Session<'f> {
    pub fn new(frame: &'f OutboundFrame) -> Self {
        Self {
            frame,
            phase: Phase::Sending,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advance by one phase
    pub fn step<R, P, D>(self, link: &mut Link<'_, R, P, D>) -> Step<'f>
    where
        R: RadioTransport,
        P: OutputPin,
        D: DelayNs,
    {
        match self.phase {
            Phase::Sending => {
                debug!("tx {=str} ({} bytes)", self.frame.text(), self.frame.len());

                link.indicator.set_high();
                match link.radio.send(self.frame.as_bytes()) {
                    Ok(()) => {
                        link.delay.delay_ms(link.timing.settle_ms);
                        link.indicator.set_low();
                        Step::Continue(Session {
                            frame: self.frame,
                            phase: Phase::AwaitingReply,
                        })
                    }
                    Err(e) => {
                        link.indicator.set_low();
                        warn!("send rejected: {}", e);
                        Step::Finished(SessionOutcome::SendFailed(e))
                    }
                }
            }
            Phase::AwaitingReply => {
                let mut buf = [0u8; MAX_FRAME_SIZE];
                match link.radio.receive(&mut buf, link.timing.reply_timeout_ms) {
                    Some(rx) => {
                        let len = rx.len.min(buf.len());
                        let reply = decode(&buf[..len]).with_rssi(rx.rssi);
                        info!("rx {=str} rssi {} dBm", reply.text(), rx.rssi);
                        Step::Finished(SessionOutcome::Replied(reply))
                    }
                    None => {
                        trace!("no reply");
                        Step::Finished(SessionOutcome::NoReply)
                    }
                }
            }
        }
    }
}

/// Run a full session for `frame`
pub fn execute<R, P, D>(frame: &OutboundFrame, link: &mut Link<'_, R, P, D>) -> SessionOutcome
where
    R: RadioTransport,
    P: OutputPin,
    D: DelayNs,
{
    let mut session = Session::new(frame);
    loop {
        match session.step(link) {
            Step::Continue(next) => session = next,
            Step::Finished(outcome) => return outcome,
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted radio, LED and delay sharing one virtual clock

    use core::cell::Cell;
    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::*;
    use crate::traits::{RadioConfig, RxInfo};

    /// Virtual time in microseconds
    #[derive(Debug, Default)]
    pub struct Clock {
        now_us: Cell<u64>,
    }

    impl Clock {
        pub fn advance_ms(&self, ms: u32) {
            self.now_us.set(self.now_us.get() + u64::from(ms) * 1000);
        }

        pub fn advance_ns(&self, ns: u32) {
            self.now_us.set(self.now_us.get() + u64::from(ns) / 1000);
        }

        pub fn now_ms(&self) -> u64 {
            self.now_us.get() / 1000
        }
    }

    pub struct MockDelay<'c> {
        pub clock: &'c Clock,
    }

    impl DelayNs for MockDelay<'_> {
        fn delay_ns(&mut self, ns: u32) {
            self.clock.advance_ns(ns);
        }

        fn delay_ms(&mut self, ms: u32) {
            self.clock.advance_ms(ms);
        }
    }

    #[derive(Debug, Default)]
    pub struct MockLed {
        pub on: bool,
        pub pulses: u32,
    }

    impl OutputPin for MockLed {
        fn set_high(&mut self) {
            if !self.on {
                self.pulses += 1;
            }
            self.on = true;
        }

        fn set_low(&mut self) {
            self.on = false;
        }

        fn is_set_high(&self) -> bool {
            self.on
        }
    }

    /// LED that accumulates how long it was lit on the shared clock
    pub struct TimedLed<'c> {
        pub clock: &'c Clock,
        pub lit_at: Option<u64>,
        pub lit_ms: u64,
    }

    impl<'c> TimedLed<'c> {
        pub fn new(clock: &'c Clock) -> Self {
            Self {
                clock,
                lit_at: None,
                lit_ms: 0,
            }
        }
    }

    impl OutputPin for TimedLed<'_> {
        fn set_high(&mut self) {
            if self.lit_at.is_none() {
                self.lit_at = Some(self.clock.now_ms());
            }
        }

        fn set_low(&mut self) {
            if let Some(at) = self.lit_at.take() {
                self.lit_ms += self.clock.now_ms() - at;
            }
        }

        fn is_set_high(&self) -> bool {
            self.lit_at.is_some()
        }
    }

    /// What the mock does on the next receive
    #[derive(Debug, Clone)]
    pub enum Reply {
        Packet(Vec<u8>, i16),
        /// Packet arrives after some delay, still inside the window if short enough
        Late(Vec<u8>, i16, u32),
        Silence,
    }

    pub struct MockRadio<'c> {
        pub clock: &'c Clock,
        pub sent: Vec<Vec<u8>>,
        pub receive_calls: u32,
        pub replies: VecDeque<Reply>,
        pub send_error: Option<RadioError>,
        pub configure_error: Option<RadioError>,
        pub configured: Option<RadioConfig>,
        pub max_payload: usize,
    }

    impl<'c> MockRadio<'c> {
        pub fn new(clock: &'c Clock) -> Self {
            Self {
                clock,
                sent: Vec::new(),
                receive_calls: 0,
                replies: VecDeque::new(),
                send_error: None,
                configure_error: None,
                configured: None,
                max_payload: MAX_FRAME_SIZE,
            }
        }

        pub fn sent_frames(&self) -> Vec<Vec<u8>> {
            self.sent.clone()
        }
    }

    impl RadioTransport for MockRadio<'_> {
        fn configure(&mut self, config: &RadioConfig) -> Result<(), RadioError> {
            if let Some(e) = self.configure_error {
                return Err(e);
            }
            self.configured = Some(*config);
            Ok(())
        }

        fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
            if let Some(e) = self.send_error {
                return Err(e);
            }
            self.sent.push(payload.to_vec());
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Option<RxInfo> {
            self.receive_calls += 1;
            let reply = self.replies.pop_front().unwrap_or(Reply::Silence);
            let (bytes, rssi, after) = match reply {
                Reply::Packet(bytes, rssi) => (bytes, rssi, 0),
                Reply::Late(bytes, rssi, after) => (bytes, rssi, after),
                Reply::Silence => {
                    self.clock.advance_ms(timeout_ms);
                    return None;
                }
            };
            if after >= timeout_ms {
                self.clock.advance_ms(timeout_ms);
                return None;
            }
            self.clock.advance_ms(after);
            let len = bytes.len().min(buf.len());
            buf[..len].copy_from_slice(&bytes[..len]);
            Some(RxInfo { len, rssi })
        }

        fn max_payload(&self) -> usize {
            self.max_payload
        }
    }
}
