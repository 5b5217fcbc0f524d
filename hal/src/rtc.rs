//! # Real time clock (RTC)
//!
//! The real time clock uses the low frequency external oscillator in order to measure wall time.
//!
//! Note that the RTC uses 24 hour notation and stores the year as an offset from 2020.
//!
//! ## Wake up timer
//!
//! The wake up timer is clocked from RTCCLK/16 (2048 Hz) and drives the periodic tick. The
//! period is reprogrammed whenever the tick frequency changes.
//!
//! ## Alarms
//!
//! - Alarm A matches on `seconds == 0` with every other field masked, so it fires once a
//!   minute. This is the background task / low energy update cadence.
//! - Alarm B masks everything except the lowest sub second bit, so it fires at 128 Hz. It is
//!   only running while a button is held.
//!
//! ## Tamper inputs
//!
//! The tamper inputs are what can bring the MCU back out of STANDBY. Each input has an enable,
//! trigger level, interrupt enable and "no erase" bit in `TAMPCR`. The no erase bit must always
//! be set, otherwise a tamper event wipes the backup registers.
//!
//! ## Backup register
//!
//! The RTC contains registers which retain their contents as long as the RTC is powered; meaning
//! that they survive a reset and STANDBY. The last one holds the ADC calibration, the rest are
//! free for the firmware.

use crate::system::System;
use crate::{wait_for, Timeout};
use stm32l0::stm32l0x3::{EXTI, RTC};

/// Number of backup registers on the stm32l0x3
pub const BACKUP_REGISTERS: usize = 5;

/// Backup register reserved for the ADC calibration factor
pub const ADC_CALIBRATION_REGISTER: usize = BACKUP_REGISTERS - 1;

/// Frequency of the wake up timer clock (RTCCLK / 16)
const WAKEUP_CLOCK_HZ: u32 = 2048;

// CR
const CR_BYPSHAD: u32 = 1 << 5;
const CR_ALRAE: u32 = 1 << 8;
const CR_ALRBE: u32 = 1 << 9;
const CR_WUTE: u32 = 1 << 10;
const CR_ALRAIE: u32 = 1 << 12;
const CR_ALRBIE: u32 = 1 << 13;
const CR_WUTIE: u32 = 1 << 14;

// ISR
const ISR_ALRAWF: u32 = 1 << 0;
const ISR_ALRBWF: u32 = 1 << 1;
const ISR_WUTWF: u32 = 1 << 2;
const ISR_INIT: u32 = 1 << 7;
const ISR_ALRAF: u32 = 1 << 8;
const ISR_ALRBF: u32 = 1 << 9;
const ISR_WUTF: u32 = 1 << 10;
const ISR_TAMP1F: u32 = 1 << 13;
const ISR_TAMP2F: u32 = 1 << 14;
const ISR_FLAGS: u32 = 0x0001_FF00;

// ALRMxR
const ALRM_MSK1: u32 = 1 << 7;
const ALRM_MSK2: u32 = 1 << 15;
const ALRM_MSK3: u32 = 1 << 23;
const ALRM_MSK4: u32 = 1 << 31;

// ALRMBSSR: compare only SS[0]
const ALRMSSR_MASKSS_1: u32 = 1 << 24;

// TAMPCR
const TAMPCR_TAMPIE: u32 = 1 << 2;

/// EXTI lines for the RTC alarms (17), tamper (19) and wake up timer (20)
pub const RTC_EXTI_LINES: u32 = (1 << 17) | (1 << 19) | (1 << 20);

/// Tamper input bit positions within `TAMPCR`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TamperFields {
    /// TAMPxE, TAMPxIE and TAMPxNOERASE
    pub action: u32,
    /// TAMPxTRG
    pub level: u32,
    /// TAMPFLT, shared by every input
    pub filter: u32,
}

/// RTC_TAMP1 (PC13)
pub const TAMPER_1: TamperFields = TamperFields {
    action: (1 << 0) | (1 << 16) | (1 << 17),
    level: 1 << 1,
    filter: 0b01 << 11,
};

/// RTC_TAMP2 (PA0)
pub const TAMPER_2: TamperFields = TamperFields {
    action: (1 << 3) | (1 << 19) | (1 << 20),
    level: 1 << 4,
    filter: 0b01 << 11,
};

/// Every input's TAMPxE bit
const TAMPCR_INPUTS: u32 = (1 << 0) | (1 << 3) | (1 << 5);

/// Calendar date and time
///
/// The hardware stores this as BCD; conversion happens on the way in and out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Calendar {
    /// years since 2020 (0-99)
    pub year: u8,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
    /// 0-59
    pub second: u8,
}

const fn from_bcd(tens: u32, units: u32) -> u8 {
    (tens * 10 + units) as u8
}

const fn to_bcd(value: u8) -> u32 {
    (((value / 10) as u32) << 4) | (value % 10) as u32
}

/// Interrupt sources that were pending, see [`Rtc::take_flags()`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub wakeup_timer: bool,
    pub alarm_a: bool,
    pub alarm_b: bool,
    pub tamper_1: bool,
    pub tamper_2: bool,
}

/// # RTC
///
/// The RTC has two states, `run` mode and `initialisation` mode.
///
/// - In initialisation mode the RTC is stopped; the time registers are writeable allowing the time
///   to be set.
/// - In run mode the RTC measures time; the time registers are read only.
///
/// See [`crate::rtc`] for more information.
pub struct Rtc(RTC);

impl Rtc {
    /// Configure the RTC
    pub fn configure(rtc: RTC, sys: &mut System, exti: &mut EXTI) -> Rtc {
        // Unlock RTC registers
        rtc.wpr.write(|w| w.key().bits(0xCA));
        rtc.wpr.write(|w| w.key().bits(0x53));

        // Configure the RTC control register
        //
        // * Bypass the shadow registers. This is required due to the low APB1 clock speed
        // * Set the wakeup clock to RTCCLK/16
        rtc.cr.write(|w| unsafe { w.bits(CR_BYPSHAD) });

        // Route the alarm, tamper and wakeup timer events to the RTC interrupt
        exti.rtsr
            .modify(|r, w| unsafe { w.bits(r.bits() | RTC_EXTI_LINES) });
        exti.imr
            .modify(|r, w| unsafe { w.bits(r.bits() | RTC_EXTI_LINES) });

        sys.enable_rtc();

        Self(rtc)
    }

    /// Read the time and date registers.
    ///
    /// Due to the system clock being slow, the registers need to be read twice to ensure a clock
    /// tick doesn't occur during the read.
    fn read_calendar(&self) -> (u32, u32) {
        let first = (self.0.tr.read().bits(), self.0.dr.read().bits());
        let second = (self.0.tr.read().bits(), self.0.dr.read().bits());

        if first != second {
            // An update occured during the first or second read. A third read will definately give
            // a correct result
            return (self.0.tr.read().bits(), self.0.dr.read().bits());
        }

        second
    }

    /// Get the current date and time
    pub fn now(&self) -> Calendar {
        let (tr, dr) = self.read_calendar();

        Calendar {
            year: from_bcd(dr >> 20 & 0xF, dr >> 16 & 0xF),
            month: from_bcd(dr >> 12 & 0x1, dr >> 8 & 0xF),
            day: from_bcd(dr >> 4 & 0x3, dr & 0xF),
            hour: from_bcd(tr >> 20 & 0x3, tr >> 16 & 0xF),
            minute: from_bcd(tr >> 12 & 0x7, tr >> 8 & 0xF),
            second: from_bcd(tr >> 4 & 0x7, tr & 0xF),
        }
    }

    /// Set the calendar, passing through initialisation mode
    pub fn set(&mut self, calendar: Calendar) -> Result<(), Timeout> {
        self.init(|mut init| init.set_calendar(calendar))
    }

    /// Execute closure in initialisation mode
    pub fn init(&mut self, f: impl FnOnce(Init)) -> Result<(), Timeout> {
        // Enter initialisation mode
        self.0.isr.modify(|_, w| w.init().init_mode());
        // Wait for initialisation mode to be entered
        wait_for(|| self.0.isr.read().initf().is_allowed())?;

        f(Init(&mut self.0));

        // Return to run mode
        self.0.isr.modify(|_, w| w.init().free_running_mode());
        // Wait for run mode to be entered
        wait_for(|| self.0.isr.read().initf().is_not_allowed())
    }

    /// Read and clear the pending interrupt flags
    pub fn take_flags(&mut self) -> Flags {
        take_flags(&self.0)
    }

    /// Read and clear the pending interrupt flags from the RTC interrupt handler
    ///
    /// Only the write-0-to-clear status flags are touched, so this may run while the main loop
    /// owns the [`Rtc`].
    pub fn take_flags_from_interrupt() -> Flags {
        // SAFETY: see above, every other bit is written back as read
        take_flags(unsafe { &*RTC::ptr() })
    }

    /// Start the periodic tick at `hz`
    ///
    /// The wake up timer has to be stopped and acknowledged before the reload value can change.
    pub fn start_tick(&mut self, hz: u32) -> Result<(), Timeout> {
        self.stop_tick()?;

        let reload = WAKEUP_CLOCK_HZ / hz.clamp(1, WAKEUP_CLOCK_HZ) - 1;
        self.0.wutr.write(|w| unsafe { w.bits(reload) });

        self.0
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() | CR_WUTE | CR_WUTIE) });

        Ok(())
    }

    /// Stop the periodic tick
    pub fn stop_tick(&mut self) -> Result<(), Timeout> {
        self.0
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() & !(CR_WUTE | CR_WUTIE)) });

        wait_for(|| self.0.isr.read().bits() & ISR_WUTWF != 0)
    }

    /// Fire alarm A at the top of every minute
    pub fn start_minute_alarm(&mut self) -> Result<(), Timeout> {
        self.stop_minute_alarm()?;

        // Everything but the seconds is masked; seconds must be 00
        self.0
            .alrmar
            .write(|w| unsafe { w.bits(ALRM_MSK4 | ALRM_MSK3 | ALRM_MSK2) });

        self.0
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() | CR_ALRAE | CR_ALRAIE) });

        Ok(())
    }

    /// Stop alarm A
    pub fn stop_minute_alarm(&mut self) -> Result<(), Timeout> {
        self.0
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() & !(CR_ALRAE | CR_ALRAIE)) });

        wait_for(|| self.0.isr.read().bits() & ISR_ALRAWF != 0)
    }

    /// Fire alarm B at 128 Hz
    pub fn start_fast_tick(&mut self) -> Result<(), Timeout> {
        self.stop_fast_tick()?;

        self.0
            .alrmbr
            .write(|w| unsafe { w.bits(ALRM_MSK4 | ALRM_MSK3 | ALRM_MSK2 | ALRM_MSK1) });
        self.0
            .alrmbssr
            .write(|w| unsafe { w.bits(ALRMSSR_MASKSS_1) });

        self.0
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() | CR_ALRBE | CR_ALRBIE) });

        Ok(())
    }

    /// Stop alarm B
    pub fn stop_fast_tick(&mut self) -> Result<(), Timeout> {
        self.0
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() & !(CR_ALRBE | CR_ALRBIE)) });

        wait_for(|| self.0.isr.read().bits() & ISR_ALRBWF != 0)
    }

    /// Raw tamper configuration register
    pub fn tamper_config(&self) -> u32 {
        self.0.tampcr.read().bits()
    }

    /// Write the tamper configuration register in one go
    pub fn set_tamper_config(&mut self, config: u32) {
        self.0.tampcr.write(|w| unsafe { w.bits(config) });
    }

    /// Whether any tamper input is currently detecting
    pub fn tamper_enabled(&self) -> bool {
        self.tamper_config() & (TAMPCR_INPUTS | TAMPCR_TAMPIE) != 0
    }

    /// Stop tamper detection on every input and drop any latched tamper flags
    pub fn disable_tamper(&mut self) {
        let config = self.tamper_config();
        self.set_tamper_config(config & !(TAMPCR_INPUTS | TAMPCR_TAMPIE));

        self.0.isr.modify(|r, w| unsafe {
            w.bits((r.bits() & ISR_INIT) | (ISR_FLAGS & !(ISR_TAMP1F | ISR_TAMP2F)))
        });
    }

    /// Tamper detection is off and no tamper flag is latched
    pub fn tamper_idle(&self) -> bool {
        let isr = self.0.isr.read().bits();
        !self.tamper_enabled() && isr & (ISR_TAMP1F | ISR_TAMP2F) == 0
    }

    /// Write a backup register. Out of range indices are ignored.
    pub fn write_backup(&mut self, index: usize, value: u32) {
        if let Some(reg) = self.0.bkpr.get(index) {
            reg.write(|w| w.bkp().bits(value));
        }
    }

    /// Read a backup register. Out of range indices read as zero.
    pub fn read_backup(&self, index: usize) -> u32 {
        self.0
            .bkpr
            .get(index)
            .map(|reg| reg.read().bkp().bits())
            .unwrap_or(0)
    }

    /// Write ADC calibration to its backup register
    pub(crate) fn set_adc_calibration(&mut self, calibration: u8) {
        self.write_backup(ADC_CALIBRATION_REGISTER, calibration as u32);
    }

    /// Read ADC calibration from its backup register
    pub(crate) fn get_adc_calibration(&self) -> u8 {
        self.read_backup(ADC_CALIBRATION_REGISTER) as u8
    }
}

fn take_flags(rtc: &stm32l0::stm32l0x3::rtc::RegisterBlock) -> Flags {
    let isr = rtc.isr.read().bits();
    let pending = isr & (ISR_WUTF | ISR_ALRAF | ISR_ALRBF | ISR_TAMP1F | ISR_TAMP2F);

    // The flags are rc_w0, writing 1 leaves them alone. INIT is the only rw bit in the range
    // that must be preserved.
    rtc.isr
        .modify(|r, w| unsafe { w.bits((r.bits() & ISR_INIT) | (ISR_FLAGS & !pending)) });

    Flags {
        wakeup_timer: pending & ISR_WUTF != 0,
        alarm_a: pending & ISR_ALRAF != 0,
        alarm_b: pending & ISR_ALRBF != 0,
        tamper_1: pending & ISR_TAMP1F != 0,
        tamper_2: pending & ISR_TAMP2F != 0,
    }
}

/// Initialisation state
pub struct Init<'a>(&'a mut RTC);

impl<'a> Init<'a> {
    /// Set the RTC to the given date and time
    pub fn set_calendar(&mut self, calendar: Calendar) {
        let tr = to_bcd(calendar.hour) << 16 | to_bcd(calendar.minute) << 8 | to_bcd(calendar.second);
        let dr = to_bcd(calendar.year) << 16 | to_bcd(calendar.month) << 8 | to_bcd(calendar.day);

        self.0.tr.write(|w| unsafe { w.bits(tr) });
        // Weekday is left at Monday (1); nothing reads it back
        self.0.dr.write(|w| unsafe { w.bits(dr | 1 << 13) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_conversion() {
        assert_eq!(to_bcd(59), 0x59);
        assert_eq!(to_bcd(7), 0x07);
        assert_eq!(from_bcd(5, 9), 59);
    }

    #[test]
    fn tamper_inputs_keep_backup_registers() {
        // TAMPxNOERASE
        assert_ne!(TAMPER_1.action & (1 << 17), 0);
        assert_ne!(TAMPER_2.action & (1 << 20), 0);
    }
}
