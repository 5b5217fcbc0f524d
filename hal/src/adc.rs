//! # Analogue to digital converter (ADC)
//!
//! In the watch, the ADC is used for reading the battery cell voltage through the internal
//! reference (VREFINT).
//!
//! ## Calibrating
//!
//! The ADC needs to be recalibrated when an environmental change occurs. The
//! biggest factor is the battery voltage however temperature can also affect
//! it's readings. It's recommended to run the [`calibrate()`](Adc::calibrate)
//! method on a regular bases to ensure the ADC stays accurate.
//!
//! The resulting calibration value is written to the RTC backup register and
//! read back in before each conversion. This allows for the calibration to
//! persist when the MCU enters STOP or STANDBY.
//!
//! ## Sample time
//!
//! With a system clock of 65.536 kHz, an ADC clock prescaler of /2 and sample
//! duration of 1.5 clock cycles, this equates to a sample time of is approx
//! 46μs. The minimum sample time for VREFINT is 10μs.

use crate::rtc::Rtc;
use crate::system::System;
use crate::{wait_for, Timeout};
use stm32l0::stm32l0x3::{ADC, SYSCFG};

const VREFINT_CAL_VREF: u32 = 3000; // mV

/// Factory VREFINT reading taken at 3.0 V
const VREFINT_CAL: *const u16 = 0x1FF8_0078 as *const u16;

/// # ADC
///
/// See [`crate::adc`] for a more information.
pub struct Adc(ADC);

impl Adc {
    /// Configure the ADC
    pub fn configure(adc: ADC, sys: &mut System, syscfg: &mut SYSCFG) -> Self {
        sys.enable_adc_clk();

        // Use PCLK/2 as the ADC clock
        adc.cfgr2.write(|w| w.ckmode().pclk_div2());

        // Enable low frequency mode as PCLK is <3.5 MHz
        adc.ccr.write(|w| w.lfmen().enabled());

        // Enable the VREFINT buffer for the ADC
        syscfg
            .cfgr3
            .modify(|_, w| w.enbuf_vrefint_adc().enabled());

        // Select VREFINT (channel 17)
        adc.chselr.write(|w| w.chsel17().selected());

        Self(adc)
    }

    /// Calibrate the ADC.
    pub fn calibrate(&mut self, rtc: &mut Rtc) -> Result<(), Timeout> {
        self.0.cr.modify(|_, w| w.adcal().start_calibration());

        wait_for(|| !self.0.isr.read().eocal().is_not_complete())?;
        self.0.isr.modify(|_, w| w.eocal().clear());

        rtc.set_adc_calibration(self.0.calfact.read().calfact().bits());

        // Ensure ADCAL = 0 before continuing
        wait_for(|| !self.0.cr.read().adcal().is_calibrating())
    }

    /// Measure the supply voltage in millivolts
    ///
    /// The ADC is powered up for the conversion and powered back down afterwards.
    pub fn supply_millivolts(&mut self, rtc: &Rtc) -> Result<u16, Timeout> {
        // Enable vrefint. It settles within one ADC clock at this speed.
        self.0.ccr.modify(|_, w| w.vrefen().enabled());

        self.0.cr.modify(|_, w| w.aden().enabled());
        let ready = wait_for(|| !self.0.isr.read().adrdy().is_not_ready());

        let reading = ready.and_then(|_| {
            self.0.isr.modify(|_, w| w.adrdy().clear());

            // Apply the calibration stored in the RTC backup registers
            self.0
                .calfact
                .write(|w| w.calfact().bits(rtc.get_adc_calibration()));

            self.0.cr.modify(|_, w| w.adstart().start_conversion());
            wait_for(|| !self.0.isr.read().eoc().is_not_complete())?;

            // Reading ADC_DR clears the conversion finished status bit
            Ok(self.0.dr.read().data().bits())
        });

        self.0.ccr.modify(|_, w| w.vrefen().disabled());
        self.0.cr.modify(|_, w| w.addis().disable());

        let vrefint = reading?.max(1) as u32;

        // The calibration word lives in system memory and is always readable
        let vrefint_cal = unsafe { VREFINT_CAL.read_volatile() } as u32;

        Ok((VREFINT_CAL_VREF * vrefint_cal / vrefint) as u16)
    }
}
