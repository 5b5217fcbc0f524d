//! Power-Mode State Machine
//!
//! ```text
//! Active <-> Idle               every pass of the main loop
//! Active  -> LowEnergy -> Active  after long inactivity, woken by the alarm button
//! any     -> DeepSleep          on request, ends in a reset
//! any     -> Backup             on request, ends in a reset
//! ```
//!
//! Deep sleep and backup lose RAM. The hardware comes back through a reset and the kernel
//! rebuilds itself from the backup registers, so the settings are written out before anything
//! is shut down.

use crate::backup::{BackupStore, SETTINGS_SLOT};
use crate::board::Board;
use crate::error::Fault;
use crate::irq::InterruptFlags;
use crate::settings::Settings;
use crate::wake::{Level, WakeInput, WakeSources};
use embedded_time::rate::Hertz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    Active,
    /// Waiting for an interrupt between events
    Idle,
    /// Tick stopped, woken once a minute and by the alarm button
    LowEnergy,
    DeepSleep,
    Backup,
}

/// Peripherals switched off on the way into deep sleep or backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Timers,
    Adc,
    Serial,
    ExternalInterrupts,
}

impl Peripheral {
    /// The order they are switched off in
    pub const SHUTDOWN_ORDER: [Peripheral; 4] = [
        Peripheral::Timers,
        Peripheral::Adc,
        Peripheral::Serial,
        Peripheral::ExternalInterrupts,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepDepth {
    /// Everything retained, any interrupt resumes
    Stop,
    /// RAM lost, RTC and display kept, wake source resets
    Standby,
    /// RAM and display lost, only the RTC domain survives
    Backup,
}

/// Power switches
pub trait PowerControl {
    /// Gate `peripheral`. Gating one that is already off does nothing.
    fn disable_peripheral(&mut self, peripheral: Peripheral);
    /// Stop brown out detection from raising a wake up or reset
    fn mask_brownout(&mut self);
    /// Park every pin except the ones belonging to the `armed` wake channels
    fn disable_pins_except(&mut self, armed: u8);
    fn sleep(&mut self, depth: SleepDepth);
    /// Reset the MCU. On hardware this does not return.
    fn reset(&mut self);
}

/// Current mode and the transitions out of it
pub struct Power {
    mode: PowerMode,
}

impl Power {
    pub const fn new() -> Self {
        Self {
            mode: PowerMode::Active,
        }
    }

    pub fn mode(&self) -> PowerMode {
        self.mode
    }

    /// Wait for the next interrupt, then carry on in the current mode
    pub fn idle<B: Board + ?Sized>(&mut self, board: &mut B, flags: &InterruptFlags) {
        let mode = self.mode;
        if mode == PowerMode::Active {
            self.mode = PowerMode::Idle;
        }

        board.wait_for_interrupt(flags);
        self.mode = mode;
    }

    /// Stop the tick and arm the alarm button to bring the watch back
    pub fn enter_low_energy<B: Board + ?Sized>(
        &mut self,
        board: &mut B,
        wake: &WakeSources,
        on_wake: Option<fn()>,
    ) -> Result<(), Fault> {
        info!("entering low energy mode");

        // Arm the way back before the tick goes
        wake.bind(board, WakeInput::AlarmButton, on_wake, Level::High)?;
        board.disable_tick()?;
        board.stop_fast_tick()?;
        board.enable_minute_alarm()?;

        self.mode = PowerMode::LowEnergy;
        Ok(())
    }

    /// Disarm the alarm button and restart the tick at `tick`
    pub fn exit_low_energy<B: Board + ?Sized>(
        &mut self,
        board: &mut B,
        wake: &WakeSources,
        tick: Hertz,
    ) -> Result<(), Fault> {
        info!("leaving low energy mode");

        wake.unbind(board, WakeInput::AlarmButton)?;
        board.set_tick_frequency(tick)?;

        self.mode = PowerMode::Active;
        Ok(())
    }

    /// Shut down to STANDBY, keeping `farewell` on the display
    ///
    /// Without a farewell the display is powered down as well. The alarm button is the only
    /// way back and it comes back through a reset.
    pub fn enter_low_power<B: Board + ?Sized>(
        &mut self,
        board: &mut B,
        wake: &WakeSources,
        settings: &Settings,
        farewell: Option<&str>,
    ) -> Result<(), Fault> {
        info!("entering deep sleep");
        self.mode = PowerMode::DeepSleep;

        self.shut_down(board, wake, settings, farewell)?;
        board.sleep(SleepDepth::Standby);
        board.reset();
        Ok(())
    }

    /// Shut down to the lowest power state the hardware has
    pub fn enter_lowest_power<B: Board + ?Sized>(
        &mut self,
        board: &mut B,
        wake: &WakeSources,
        settings: &Settings,
    ) -> Result<(), Fault> {
        info!("entering backup mode");
        self.mode = PowerMode::Backup;

        self.shut_down(board, wake, settings, None)?;
        board.sleep(SleepDepth::Backup);
        board.reset();
        Ok(())
    }

    fn shut_down<B: Board + ?Sized>(
        &mut self,
        board: &mut B,
        wake: &WakeSources,
        settings: &Settings,
        farewell: Option<&str>,
    ) -> Result<(), Fault> {
        board.store(SETTINGS_SLOT, settings.bits());

        wake.unbind_all(board)?;
        wake.bind(board, WakeInput::AlarmButton, None, Level::High)?;

        match farewell {
            Some(text) => {
                board.clear();
                board.show(0, text);
            }
            None => board.power_down()?,
        }

        for peripheral in Peripheral::SHUTDOWN_ORDER {
            board.disable_peripheral(peripheral);
        }

        board.stop_fast_tick()?;
        board.disable_minute_alarm()?;
        board.disable_tick()?;

        board.mask_brownout();

        let armed = wake.armed(board);
        board.disable_pins_except(armed);
        Ok(())
    }
}

impl Default for Power {
    fn default() -> Self {
        Self::new()
    }
}
