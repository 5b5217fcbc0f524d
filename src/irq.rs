//! State shared between interrupt trampolines and the main loop.
//!
//! Trampolines only ever set bits or bump counters; the main loop takes and clears them in one
//! atomic swap. No other state crosses the interrupt boundary.

use crate::event::Button;
use portable_atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

pub struct InterruptFlags {
    ticks: AtomicU8,
    pressed: AtomicU8,
    released: AtomicU8,
    /// Buttons down as of the last edge. Not cleared by [`InterruptFlags::take`].
    down: AtomicU8,
    fast_ticks: AtomicU16,
    minute: AtomicBool,
    wake: AtomicBool,
}

/// Everything taken from [`InterruptFlags`] in one pass of the main loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pending {
    pub ticks: u8,
    /// [`Button::mask`] bits
    pub pressed: u8,
    pub released: u8,
    /// Buttons down after the last edge
    pub down: u8,
    pub fast_ticks: u16,
    pub minute: bool,
    pub wake: bool,
}

impl Pending {
    /// No edges, ticks or flags. Buttons may still be held.
    pub fn is_empty(&self) -> bool {
        Pending { down: 0, ..*self } == Pending::default()
    }
}

impl InterruptFlags {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU8::new(0),
            pressed: AtomicU8::new(0),
            released: AtomicU8::new(0),
            down: AtomicU8::new(0),
            fast_ticks: AtomicU16::new(0),
            minute: AtomicBool::new(false),
            wake: AtomicBool::new(false),
        }
    }

    /// Periodic tick
    pub fn tick(&self) {
        // Saturate rather than wrap so a stalled loop sees "many" instead of "none"
        let _ = self
            .ticks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1));
    }

    pub fn press(&self, button: Button) {
        self.down.fetch_or(button.mask(), Ordering::AcqRel);
        self.pressed.fetch_or(button.mask(), Ordering::AcqRel);
    }

    pub fn release(&self, button: Button) {
        self.down.fetch_and(!button.mask(), Ordering::AcqRel);
        self.released.fetch_or(button.mask(), Ordering::AcqRel);
    }

    /// 128 Hz tick while a button is held
    pub fn fast_tick(&self) {
        let _ = self
            .fast_ticks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1));
    }

    /// Top of the minute
    pub fn minute(&self) {
        self.minute.store(true, Ordering::Release);
    }

    /// Wake from low energy mode
    pub fn wake(&self) {
        self.wake.store(true, Ordering::Release);
    }

    /// Whether anything is waiting for the main loop
    pub fn any_pending(&self) -> bool {
        self.ticks.load(Ordering::Acquire) != 0
            || self.pressed.load(Ordering::Acquire) != 0
            || self.released.load(Ordering::Acquire) != 0
            || self.fast_ticks.load(Ordering::Acquire) != 0
            || self.minute.load(Ordering::Acquire)
            || self.wake.load(Ordering::Acquire)
    }

    /// Take and clear everything pending
    pub fn take(&self) -> Pending {
        Pending {
            ticks: self.ticks.swap(0, Ordering::AcqRel),
            pressed: self.pressed.swap(0, Ordering::AcqRel),
            released: self.released.swap(0, Ordering::AcqRel),
            down: self.down.load(Ordering::Acquire),
            fast_ticks: self.fast_ticks.swap(0, Ordering::AcqRel),
            minute: self.minute.swap(false, Ordering::AcqRel),
            wake: self.wake.swap(false, Ordering::AcqRel),
        }
    }
}

impl Default for InterruptFlags {
    fn default() -> Self {
        Self::new()
    }
}
