//! User-facing feedback surface
//!
//! The firmware's implementation logs and lights LEDs; a display would
//! implement the same trait.

use roverlink_protocol::ControlSet;

use crate::session::SessionOutcome;
use crate::state::FatalKind;

/// Visual feedback for the operator
pub trait Feedback {
    /// Controls active this tick
    fn controls(&mut self, active: ControlSet);

    /// Result of one command session
    fn outcome(&mut self, command: &str, outcome: &SessionOutcome);

    /// Controller halted. Called once.
    fn halted(&mut self, kind: FatalKind);

    /// End of tick
    fn refresh(&mut self) {}
}

/// Feedback surface that shows nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn controls(&mut self, _active: ControlSet) {}

    fn outcome(&mut self, _command: &str, _outcome: &SessionOutcome) {}

    fn halted(&mut self, _kind: FatalKind) {}
}
