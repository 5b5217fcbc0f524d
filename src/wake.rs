//! Wake-Source Manager
//!
//! Physical inputs that can pull the watch out of low energy mode, STOP or STANDBY. Each input
//! owns one RTC tamper channel. The channel fields in the shared configuration register may
//! only change while detection is off, so every binding goes through the same sequence:
//!
//! 1. disable detection if it is on and wait for the hardware to settle
//! 2. clear and set only this channel's fields
//! 3. write the whole configuration back and re-enable detection
//! 4. wait for the hardware to settle again
//! 5. swap in the channel's callback
//!
//! The RTC interrupt lands in [`WakeSources::dispatch`], which calls the callback of every
//! channel that fired.

use crate::error::{spin_until, Fault};
use core::cell::Cell;
use critical_section::Mutex;

/// Number of wake channels
pub const CHANNELS: usize = 3;

/// Inputs that can be bound to a wake channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeInput {
    /// Auxiliary pin A4, channel 0
    A4,
    /// Auxiliary pin A2, channel 1
    A2,
    /// Alarm button, channel 2
    AlarmButton,
}

impl WakeInput {
    /// Dispatch priority, highest first
    pub const PRIORITY: [WakeInput; CHANNELS] =
        [WakeInput::AlarmButton, WakeInput::A2, WakeInput::A4];

    pub const fn channel(self) -> usize {
        self as usize
    }

    /// Bit for this input in channel masks
    pub const fn mask(self) -> u8 {
        1 << self.channel()
    }
}

/// Trigger polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

/// Where a channel's fields live in the configuration word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFields {
    /// Bits that arm the channel to wake the device
    pub action: u32,
    /// Set for active high, clear for active low
    pub level: u32,
    /// Input filter bits. Never cleared, other channels may share them.
    pub debounce: u32,
}

/// The wake detection peripheral
pub trait WakeHardware {
    /// Whether detection is running
    fn wake_enabled(&self) -> bool;
    fn disable_wake(&mut self);
    fn enable_wake(&mut self);
    /// The last enable, disable or configuration write has taken effect
    fn wake_synced(&self) -> bool;
    fn wake_config(&self) -> u32;
    fn write_wake_config(&mut self, config: u32);
    /// Channel layout for `input`, `None` when the board can't wake from it
    fn channel_fields(&self, input: WakeInput) -> Option<ChannelFields>;
    /// Read and clear the channels that fired, as [`WakeInput::mask`] bits
    fn take_wake_flags(&mut self) -> u8;
}

type Callback = Mutex<Cell<Option<fn()>>>;

/// Per channel callbacks
///
/// Lives in a `static` so the RTC interrupt trampoline can reach it.
pub struct WakeSources {
    callbacks: [Callback; CHANNELS],
}

impl WakeSources {
    pub const fn new() -> Self {
        Self {
            callbacks: [
                Mutex::new(Cell::new(None)),
                Mutex::new(Cell::new(None)),
                Mutex::new(Cell::new(None)),
            ],
        }
    }

    /// Arm `input` to wake the device at `level` and route it to `callback`
    ///
    /// Any callback previously bound to the channel is replaced. Inputs the board can't wake
    /// from are left alone.
    pub fn bind<H: WakeHardware + ?Sized>(
        &self,
        hw: &mut H,
        input: WakeInput,
        callback: Option<fn()>,
        level: Level,
    ) -> Result<(), Fault> {
        let Some(fields) = hw.channel_fields(input) else {
            warn!("no wake channel for {}", input);
            return Ok(());
        };

        debug!("bind wake source {} level {}", input, level);

        self.reconfigure(hw, |config| {
            let mut config = config & !(fields.action | fields.level);
            config |= fields.action | fields.debounce;
            if level == Level::High {
                config |= fields.level;
            }
            config
        })?;

        self.set_callback(input, callback);
        Ok(())
    }

    /// Disarm `input` and drop its callback
    pub fn unbind<H: WakeHardware + ?Sized>(&self, hw: &mut H, input: WakeInput) -> Result<(), Fault> {
        self.set_callback(input, None);

        let Some(fields) = hw.channel_fields(input) else {
            return Ok(());
        };

        self.reconfigure(hw, |config| config & !(fields.action | fields.level))
    }

    /// Disarm every channel and drop every callback
    pub fn unbind_all<H: WakeHardware + ?Sized>(&self, hw: &mut H) -> Result<(), Fault> {
        for input in WakeInput::PRIORITY {
            self.unbind(hw, input)?;
        }
        Ok(())
    }

    /// Channels currently armed in the hardware
    pub fn armed<H: WakeHardware + ?Sized>(&self, hw: &H) -> u8 {
        let config = hw.wake_config();

        WakeInput::PRIORITY
            .into_iter()
            .filter(|&input| {
                hw.channel_fields(input)
                    .is_some_and(|fields| fields.action != 0 && config & fields.action == fields.action)
            })
            .fold(0, |mask, input| mask | input.mask())
    }

    /// Call the callback of every channel set in `fired`, highest priority first
    ///
    /// Channels without a callback are skipped.
    pub fn dispatch(&self, fired: u8) {
        for input in WakeInput::PRIORITY {
            if fired & input.mask() == 0 {
                continue;
            }

            let callback = critical_section::with(|cs| self.callbacks[input.channel()].borrow(cs).get());
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    /// Read the fired channels from the hardware and dispatch them
    pub fn service<H: WakeHardware + ?Sized>(&self, hw: &mut H) {
        let fired = hw.take_wake_flags();
        self.dispatch(fired);
    }

    pub fn is_bound(&self, input: WakeInput) -> bool {
        critical_section::with(|cs| self.callbacks[input.channel()].borrow(cs).get().is_some())
    }

    fn set_callback(&self, input: WakeInput, callback: Option<fn()>) {
        critical_section::with(|cs| self.callbacks[input.channel()].borrow(cs).set(callback));
    }

    fn reconfigure<H: WakeHardware + ?Sized>(
        &self,
        hw: &mut H,
        update: impl FnOnce(u32) -> u32,
    ) -> Result<(), Fault> {
        if hw.wake_enabled() {
            hw.disable_wake();
        }
        spin_until(|| hw.wake_synced(), Fault::WakeSync)?;

        let config = update(hw.wake_config());
        hw.write_wake_config(config);

        hw.enable_wake();
        spin_until(|| hw.wake_synced(), Fault::WakeSync)
    }
}

impl Default for WakeSources {
    fn default() -> Self {
        Self::new()
    }
}
