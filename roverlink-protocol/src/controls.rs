//! Named controls on the handheld button pad

use crate::commands;

/// One physical control on the pad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    /// D-pad left
    Left,
    /// D-pad right
    Right,
    /// D-pad down
    Down,
    /// D-pad up
    Up,
    /// A button
    A,
    /// B button
    B,
    /// Joystick press
    Select,
}

impl Control {
    /// All controls, in the order commands are dispatched within a tick
    pub const ALL: [Control; 7] = [
        Control::Left,
        Control::Right,
        Control::Down,
        Control::Up,
        Control::A,
        Control::B,
        Control::Select,
    ];

    /// Command sent while this control is active, if any.
    ///
    /// `B` only lights its indicator.
    pub fn default_command(self) -> Option<&'static str> {
        match self {
            Control::Left => Some(commands::LEFT),
            Control::Right => Some(commands::RIGHT),
            Control::Down => Some(commands::BACKWARD),
            Control::Up => Some(commands::FORWARD),
            Control::A => Some(commands::BEEP),
            Control::B => None,
            Control::Select => Some(commands::BEEP_TWICE),
        }
    }

    /// Short display name
    pub fn name(self) -> &'static str {
        match self {
            Control::Left => "left",
            Control::Right => "right",
            Control::Down => "down",
            Control::Up => "up",
            Control::A => "A",
            Control::B => "B",
            Control::Select => "select",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Snapshot of the controls active during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlSet(u16);

impl ControlSet {
    /// No controls active
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mark a control active
    pub fn insert(&mut self, control: Control) {
        self.0 |= control.bit();
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, control: Control) -> Self {
        self.insert(control);
        self
    }

    pub fn contains(&self, control: Control) -> bool {
        self.0 & control.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Controls active now that were not active in `previous`
    pub fn newly_pressed(&self, previous: ControlSet) -> ControlSet {
        ControlSet(self.0 & !previous.0)
    }

    /// Active controls, in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = Control> + '_ {
        Control::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Control> for ControlSet {
    fn from_iter<I: IntoIterator<Item = Control>>(iter: I) -> Self {
        let mut set = ControlSet::empty();
        for control in iter {
            set.insert(control);
        }
        set
    }
}
