//! Feedback over the debug log
//!
//! The transmit LED is driven by the command session itself; this surface
//! only reports what the operator would otherwise see on the display.

use defmt::*;
use roverlink_core::state::FatalKind;
use roverlink_core::traits::Feedback;
use roverlink_core::SessionOutcome;
use roverlink_protocol::ControlSet;

#[derive(Default)]
pub struct LogFeedback {
    last_controls: ControlSet,
}

impl LogFeedback {
    pub fn new() -> Self {
        Self {
            last_controls: ControlSet::empty(),
        }
    }
}

impl Feedback for LogFeedback {
    fn controls(&mut self, active: ControlSet) {
        if active == self.last_controls {
            return;
        }
        self.last_controls = active;
        for control in active.iter() {
            debug!("held: {=str}", control.name());
        }
    }

    fn outcome(&mut self, command: &str, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Replied(reply) => {
                debug!("{=str} -> {=str} ({} dBm)", command, reply.text(), reply.rssi());
            }
            SessionOutcome::NoReply => debug!("{=str} -> (no reply)", command),
            SessionOutcome::SendFailed(e) => warn!("{=str} not sent: {}", command, e),
        }
    }

    fn halted(&mut self, kind: FatalKind) {
        error!("halted: {}. Fix the fault and reset the board.", kind);
    }
}
