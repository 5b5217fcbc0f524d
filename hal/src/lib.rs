//! # Watch OS
//!
//! A hardware abstraction library for my stm32l0x3 based watch.
//!
//! ---
//!
//! This library provides an opinionated way to configure and interact with the hardware. The
//! primary goal with the hardware configuration is to ensure as low power consumption as
//! possible. This is done in a few ways
//!
//! - The MCU drops into STOP between interrupts and only runs to service the tick, the buttons
//!   and the RTC alarms
//! - The system clock runs off the multispeed internal oscillator (MSI) which is set to 65.536
//!   kHz
//! - The voltage regulator runs at 1.2v
//! - The LCD and RTC are clocked by the external 32.768 kHz crystal (LSE) so they can continue
//!   running when the MSI is stopped
//!
//! Anything that has to survive STANDBY lives in the RTC backup registers, see [`rtc`].

#![no_std]

pub mod adc;
pub mod buzzer;
pub mod lcd;
pub mod rtc;
pub mod system;

pub use adc::Adc;
pub use buzzer::Buzzer;
pub use lcd::Lcd;
pub use rtc::Rtc;
pub use system::System;

pub use stm32l0::stm32l0x3 as pac;

/// Upper bound on how many times a hardware status bit is polled before giving up
pub const SYNC_SPIN_LIMIT: u32 = 100_000;

/// A peripheral never acknowledged a configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout;

/// Spin until `ready` returns true, at most [`SYNC_SPIN_LIMIT`] times.
pub fn wait_for(mut ready: impl FnMut() -> bool) -> Result<(), Timeout> {
    for _ in 0..SYNC_SPIN_LIMIT {
        if ready() {
            return Ok(());
        }
    }

    Err(Timeout)
}
