//! Link statistics
//!
//! Counters over all sessions since boot, logged every few ticks. Counters
//! stop at `u32::MAX`.

use crate::fmt::info;
use crate::session::SessionOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames the radio accepted
    pub sent: u32,
    pub replied: u32,
    pub no_reply: u32,
    pub send_failed: u32,
    /// Commands that could not be encoded
    pub rejected: u32,
    /// Failed button pad reads
    pub input_errors: u32,
    /// RSSI of the most recent reply
    pub last_rssi: Option<i16>,
    ticks: u32,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Replied(reply) => {
                self.sent = self.sent.saturating_add(1);
                self.replied = self.replied.saturating_add(1);
                if let Some(rssi) = reply.rssi() {
                    self.last_rssi = Some(rssi);
                }
            }
            SessionOutcome::NoReply => {
                self.sent = self.sent.saturating_add(1);
                self.no_reply = self.no_reply.saturating_add(1);
            }
            SessionOutcome::SendFailed(_) => {
                self.send_failed = self.send_failed.saturating_add(1);
            }
        }
    }

    pub fn inc_rejected(&mut self) {
        self.rejected = self.rejected.saturating_add(1);
    }

    pub fn inc_input_errors(&mut self) {
        self.input_errors = self.input_errors.saturating_add(1);
    }

    /// Reply rate over accepted frames, in percent
    pub fn reply_percent(&self) -> u32 {
        if self.sent == 0 {
            return 0;
        }
        (u64::from(self.replied) * 100 / u64::from(self.sent)) as u32
    }

    /// Count a tick and log a summary every `interval` ticks.
    ///
    /// Returns true when a summary was due. An interval of 0 never reports.
    pub fn maybe_report(&mut self, interval: u32) -> bool {
        self.ticks = self.ticks.wrapping_add(1);
        if interval == 0 || self.ticks % interval != 0 {
            return false;
        }
        info!(
            "link: sent={} replied={} ({}%) none={} failed={} rejected={} rssi={}",
            self.sent,
            self.replied,
            self.reply_percent(),
            self.no_reply,
            self.send_failed,
            self.rejected,
            self.last_rssi
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RadioError;
    use roverlink_protocol::decode;

    #[test]
    fn test_record_outcomes() {
        let mut stats = LinkStats::new();
        stats.record(&SessionOutcome::Replied(decode(b"OK").with_rssi(-42)));
        stats.record(&SessionOutcome::NoReply);
        stats.record(&SessionOutcome::SendFailed(RadioError::Busy));
        stats.inc_rejected();

        assert_eq!(stats.sent, 2);
        assert_eq!(stats.replied, 1);
        assert_eq!(stats.no_reply, 1);
        assert_eq!(stats.send_failed, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.last_rssi, Some(-42));
        assert_eq!(stats.reply_percent(), 50);
    }

    #[test]
    fn test_counters_saturate() {
        let mut stats = LinkStats {
            sent: u32::MAX,
            replied: u32::MAX,
            no_reply: u32::MAX,
            send_failed: u32::MAX,
            rejected: u32::MAX,
            input_errors: u32::MAX,
            ..LinkStats::new()
        };
        stats.record(&SessionOutcome::Replied(decode(b"OK").with_rssi(-60)));
        stats.record(&SessionOutcome::NoReply);
        stats.record(&SessionOutcome::SendFailed(RadioError::Bus));
        stats.inc_rejected();
        stats.inc_input_errors();

        assert_eq!(stats.sent, u32::MAX);
        assert_eq!(stats.replied, u32::MAX);
        assert_eq!(stats.no_reply, u32::MAX);
        assert_eq!(stats.send_failed, u32::MAX);
        assert_eq!(stats.rejected, u32::MAX);
        assert_eq!(stats.input_errors, u32::MAX);
        assert_eq!(stats.last_rssi, Some(-60));
        assert_eq!(stats.reply_percent(), 100);
    }

    #[test]
    fn test_reply_percent_empty() {
        assert_eq!(LinkStats::new().reply_percent(), 0);
    }

    #[test]
    fn test_report_interval() {
        let mut stats = LinkStats::new();
        let reports = (0..10).filter(|_| stats.maybe_report(5)).count();
        assert_eq!(reports, 2);

        let mut stats = LinkStats::new();
        assert!(!(0..10).any(|_| stats.maybe_report(0)));
    }
}
