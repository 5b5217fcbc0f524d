//! Events delivered to faces.

/// The three buttons on the case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Light,
    Mode,
    Alarm,
}

impl Button {
    pub const ALL: [Button; 3] = [Button::Light, Button::Mode, Button::Alarm];

    /// Bit used for this button in the interrupt masks
    pub const fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// Button gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gesture {
    Down,
    /// Released before a long press
    Up,
    /// Held for [`LONG_PRESS_TICKS`](crate::movement::LONG_PRESS_TICKS)
    LongPress,
    /// Held for [`LONGER_PRESS_TICKS`](crate::movement::LONGER_PRESS_TICKS)
    LongerPress,
    /// Released after a long press
    LongUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// The face just became active and should draw itself from scratch
    Activate,
    /// Periodic tick at the requested tick frequency
    Tick,
    Button(Button, Gesture),
    /// Once a minute while in low energy mode
    LowEnergyUpdate,
    /// The face asked for background work and this is its turn
    BackgroundTask,
    /// No button has been pressed for the timeout interval
    Timeout,
}

impl EventKind {
    pub const fn is_button(&self) -> bool {
        matches!(self, EventKind::Button(..))
    }
}

/// An event and the subsecond counter at the time it was raised
///
/// The counter counts ticks since the last whole second and wraps at 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    pub kind: EventKind,
    pub subsecond: u8,
}

impl Event {
    pub const fn new(kind: EventKind, subsecond: u8) -> Self {
        Self { kind, subsecond }
    }

    pub const fn button(button: Button, gesture: Gesture, subsecond: u8) -> Self {
        Self::new(EventKind::Button(button, gesture), subsecond)
    }
}
