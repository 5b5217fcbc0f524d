//! Hardware the kernel drives.
//!
//! Each concern is its own trait so faces and tests only need to know about the part they
//! touch. [`Board`] ties them together for the dispatcher.

use crate::backup::BackupRegisters;
use crate::error::Fault;
use crate::irq::InterruptFlags;
use crate::power::PowerControl;
use crate::time::DateTime;
use crate::wake::WakeHardware;
use embedded_time::duration::Milliseconds;
use embedded_time::rate::Hertz;

/// Wall clock
pub trait Clock {
    /// Local time
    fn now(&self) -> DateTime;
    fn set_now(&mut self, now: DateTime);
}

/// Periodic interrupt sources
pub trait Ticker {
    /// (Re)start the periodic tick
    fn set_tick_frequency(&mut self, hz: Hertz) -> Result<(), Fault>;
    fn disable_tick(&mut self) -> Result<(), Fault>;
    /// 128 Hz tick used to time button holds
    fn start_fast_tick(&mut self) -> Result<(), Fault>;
    fn stop_fast_tick(&mut self) -> Result<(), Fault>;
    /// Interrupt at the top of every minute
    fn enable_minute_alarm(&mut self) -> Result<(), Fault>;
    fn disable_minute_alarm(&mut self) -> Result<(), Fault>;
}

/// Indicator segments. Boards without them ignore requests to light them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    /// Alarm enabled
    Signal,
    /// Hourly chime enabled
    Bell,
    H24,
    Pm,
    /// Battery low
    Lap,
}

/// Segment display
pub trait Screen {
    /// Draw `text` starting at `position`, one character per digit
    fn show(&mut self, position: usize, text: &str);
    fn set_indicator(&mut self, indicator: Indicator, on: bool);
    fn set_colon(&mut self, on: bool);
    fn clear(&mut self);
    /// Turn the display controller off entirely
    fn power_down(&mut self) -> Result<(), Fault>;
}

/// Blocking buzzer
pub trait Speaker {
    /// Sound `tone` for `duration`, or stay silent for it when `tone` is `None`
    fn play_tone(&mut self, tone: Option<Hertz>, duration: Milliseconds);
}

/// Bicolour LED. Intensities are 0-15; both zero is off.
pub trait Led {
    fn set_led(&mut self, red: u8, green: u8);
}

pub trait Battery {
    /// Supply voltage, `None` when it couldn't be measured
    fn battery_millivolts(&mut self) -> Option<u16>;
}

/// Everything the dispatcher needs from the hardware
pub trait Board:
    Clock + Ticker + Screen + Speaker + Led + Battery + BackupRegisters + WakeHardware + PowerControl
{
    /// Sleep until an interrupt fires, unless `flags` already has something pending
    fn wait_for_interrupt(&mut self, flags: &InterruptFlags);
}
