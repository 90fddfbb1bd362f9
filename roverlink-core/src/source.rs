//! Command sources
//!
//! A command source turns one poll into the ordered list of commands to send
//! this tick. The button pad maps active controls through the keymap; the
//! scripted sources replay fixed link-test sequences.

use heapless::Vec;
use roverlink_protocol::{commands, CommandToken, ControlSet};

use crate::config::{HoldPolicy, InputMode};
use crate::fmt::warn;
use crate::traits::{InputError, InputSource};

/// Most commands a single tick can carry
pub const MAX_COMMANDS_PER_TICK: usize = 8;

/// Commands for one tick, in dispatch order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickCommands {
    /// Controls held this tick (empty for scripted sources)
    pub controls: ControlSet,
    pub commands: Vec<CommandToken, MAX_COMMANDS_PER_TICK>,
    /// The input source failed this tick
    pub input_error: bool,
}

impl TickCommands {
    fn push(&mut self, token: &str) {
        match CommandToken::new(token) {
            Ok(command) => {
                if self.commands.push(command).is_err() {
                    warn!("tick command list full, dropping {=str}", token);
                }
            }
            Err(e) => warn!("bad command token {=str}: {}", token, e),
        }
    }
}

/// Produces the commands for each tick
pub trait CommandSource {
    /// Bring the source up. Called once at boot.
    fn begin(&mut self) -> Result<(), InputError>;

    /// Commands to send this tick
    fn poll(&mut self) -> TickCommands;
}

/// Button pad source: one command per active control
pub struct ButtonPad<I> {
    input: I,
    hold: HoldPolicy,
    previous: ControlSet,
}

impl<I: InputSource> ButtonPad<I> {
    pub fn new(input: I, hold: HoldPolicy) -> Self {
        Self {
            input,
            hold,
            previous: ControlSet::empty(),
        }
    }

    pub fn into_inner(self) -> I {
        self.input
    }
}

impl<I: InputSource> CommandSource for ButtonPad<I> {
    fn begin(&mut self) -> Result<(), InputError> {
        self.input.begin()
    }

    fn poll(&mut self) -> TickCommands {
        let mut tick = TickCommands::default();

        // a failed read sends nothing and leaves the edge baseline alone
        let active = match self.input.read() {
            Ok(active) => active,
            Err(e) => {
                warn!("button read failed: {}", e);
                tick.input_error = true;
                return tick;
            }
        };

        let fire = match self.hold {
            HoldPolicy::Repeat => active,
            HoldPolicy::Edge => active.newly_pressed(self.previous),
        };
        self.previous = active;
        tick.controls = active;

        for control in fire.iter() {
            if let Some(token) = control.default_command() {
                tick.push(token);
            }
        }
        tick
    }
}

/// Link-test sequence sent by [`Script::cycle`]
pub const CYCLE_SEQUENCE: [&str; 7] = [
    commands::TEST,
    commands::FORWARD,
    commands::BACKWARD,
    commands::LEFT,
    commands::RIGHT,
    commands::STOP,
    commands::START,
];

/// Fixed command sequence, repeated every tick
pub struct Script {
    sequence: Vec<CommandToken, MAX_COMMANDS_PER_TICK>,
}

impl Script {
    /// Every well-known command in turn
    pub fn cycle() -> Self {
        let mut sequence = Vec::new();
        for token in CYCLE_SEQUENCE {
            if let Ok(token) = CommandToken::new(token) {
                let _ = sequence.push(token);
            }
        }
        Self { sequence }
    }

    /// One command per tick
    pub fn ping(token: CommandToken) -> Self {
        let mut sequence = Vec::new();
        let _ = sequence.push(token);
        Self { sequence }
    }
}

impl CommandSource for Script {
    fn begin(&mut self) -> Result<(), InputError> {
        Ok(())
    }

    fn poll(&mut self) -> TickCommands {
        TickCommands {
            controls: ControlSet::empty(),
            commands: self.sequence.clone(),
            input_error: false,
        }
    }
}

/// Source chosen by [`InputMode`] at startup
pub enum ModeSource<I> {
    Buttons(ButtonPad<I>),
    Script(Script),
}

impl<I: InputSource> ModeSource<I> {
    /// Build the source for `mode`.
    ///
    /// Scripted modes never touch the button pad, so it is not brought up.
    pub fn new(mode: InputMode, input: I, hold: HoldPolicy, ping: CommandToken) -> Self {
        match mode {
            InputMode::Buttons => ModeSource::Buttons(ButtonPad::new(input, hold)),
            InputMode::Cycle => ModeSource::Script(Script::cycle()),
            InputMode::Ping => ModeSource::Script(Script::ping(ping)),
        }
    }
}

impl<I: InputSource> CommandSource for ModeSource<I> {
    fn begin(&mut self) -> Result<(), InputError> {
        match self {
            ModeSource::Buttons(pad) => pad.begin(),
            ModeSource::Script(script) => script.begin(),
        }
    }

    fn poll(&mut self) -> TickCommands {
        match self {
            ModeSource::Buttons(pad) => pad.poll(),
            ModeSource::Script(script) => script.poll(),
        }
    }
}
