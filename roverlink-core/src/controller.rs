//! Control loop
//!
//! Owns every peripheral the controller uses. Boot brings the radio and the
//! command source up; each tick polls the source and runs one command session
//! per command, strictly in order.

use embedded_hal::delay::DelayNs;
use roverlink_hal::OutputPin;
use roverlink_protocol::{encode, ControlSet};

use crate::config::ControllerConfig;
use crate::fmt::{error, info, warn};
use crate::session::{self, Link, SessionOutcome};
use crate::source::CommandSource;
use crate::state::{Event, FatalKind, State};
use crate::stats::LinkStats;
use crate::traits::{Feedback, RadioTransport};

/// Sleep between checks while halted
const PARK_INTERVAL_MS: u32 = 1000;

/// Summary of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    pub controls: ControlSet,
    pub replied: u8,
    pub no_reply: u8,
    pub send_failed: u8,
    /// Commands skipped because they could not be encoded
    pub rejected: u8,
}

impl TickReport {
    fn record(&mut self, outcome: &SessionOutcome) {
        let counter = match outcome {
            SessionOutcome::Replied(_) => &mut self.replied,
            SessionOutcome::NoReply => &mut self.no_reply,
            SessionOutcome::SendFailed(_) => &mut self.send_failed,
        };
        *counter = counter.saturating_add(1);
    }

    /// Sessions run this tick
    pub fn sessions(&self) -> u8 {
        self.replied
            .saturating_add(self.no_reply)
            .saturating_add(self.send_failed)
    }
}

/// Halt before a [`Controller`] could be built, e.g. when its pins cannot be
/// claimed. Reported the same way as a failed boot.
pub fn halt_unbuilt<F: Feedback>(feedback: &mut F, kind: FatalKind) -> State {
    report_halt(State::Boot, feedback, kind)
}

fn report_halt<F: Feedback>(state: State, feedback: &mut F, kind: FatalKind) -> State {
    error!("controller halted: {}", kind);
    feedback.halted(kind);
    state.transition(Event::Fatal(kind))
}

/// The handheld controller
pub struct Controller<R, P, S, F, D> {
    radio: R,
    indicator: P,
    source: S,
    feedback: F,
    delay: D,
    config: ControllerConfig,
    state: State,
    stats: LinkStats,
}

impl<R, P, S, F, D> Controller<R, P, S, F, D>
where
    R: RadioTransport,
    P: OutputPin,
    S: CommandSource,
    F: Feedback,
    D: DelayNs,
{
    pub fn new(
        config: ControllerConfig,
        radio: R,
        indicator: P,
        source: S,
        feedback: F,
        delay: D,
    ) -> Self {
        Self {
            radio,
            indicator,
            source,
            feedback,
            delay,
            config,
            state: State::Boot,
            stats: LinkStats::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Validate config, configure the radio and start the command source.
    ///
    /// Any failure halts the controller for good. Calling again after boot
    /// reports the existing state without touching hardware.
    pub fn boot(&mut self) -> Result<(), FatalKind> {
        match self.state {
            State::Boot => {}
            State::Running => return Ok(()),
            State::Halted(kind) => return Err(kind),
        }

        match self.bring_up() {
            Ok(()) => {
                self.state = self.state.transition(Event::BootComplete);
                info!(
                    "controller running: rover {=str} @ {} Hz",
                    self.config.link.rover_id.as_str(),
                    self.config.link.frequency_hz
                );
                Ok(())
            }
            Err(kind) => {
                self.halt(kind);
                Err(kind)
            }
        }
    }

    fn bring_up(&mut self) -> Result<(), FatalKind> {
        self.config.validate()?;
        self.indicator.set_low();
        self.radio.configure(&self.config.link.radio_config())?;
        self.source.begin()?;
        Ok(())
    }

    fn halt(&mut self, kind: FatalKind) {
        self.indicator.set_low();
        self.state = report_halt(self.state, &mut self.feedback, kind);
    }

    /// Run one tick: poll, dispatch, housekeeping.
    ///
    /// Returns `None` without doing anything unless the controller is running.
    pub fn tick(&mut self) -> Option<TickReport> {
        if !self.state.is_running() {
            return None;
        }

        let tick = self.source.poll();
        if tick.input_error {
            self.stats.inc_input_errors();
        }
        self.feedback.controls(tick.controls);

        let mut report = TickReport {
            controls: tick.controls,
            ..TickReport::default()
        };
        let max_payload = self.radio.max_payload();
        let timing = self.config.timing.session();

        for command in &tick.commands {
            let rover = self.config.link.rover_id.as_str();
            let frame = match encode(rover, command.as_str(), max_payload) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("cannot encode {=str}: {}", command.as_str(), e);
                    self.stats.inc_rejected();
                    report.rejected = report.rejected.saturating_add(1);
                    continue;
                }
            };

            let mut link = Link {
                radio: &mut self.radio,
                indicator: &mut self.indicator,
                delay: &mut self.delay,
                timing,
            };
            let outcome = session::execute(&frame, &mut link);

            self.stats.record(&outcome);
            report.record(&outcome);
            self.feedback.outcome(command.as_str(), &outcome);
        }

        self.stats.maybe_report(self.config.stats_interval_ticks);
        self.feedback.refresh();
        self.delay.delay_ms(self.config.timing.tick_delay_ms);

        Some(report)
    }

    /// Boot, then tick forever. A halted controller parks without ticking.
    pub fn run(&mut self) -> ! {
        let _ = self.boot();
        loop {
            if self.tick().is_none() {
                self.delay.delay_ms(PARK_INTERVAL_MS);
            }
        }
    }
}
