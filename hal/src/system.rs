use cortex_m::peripheral::SCB;
use stm32l0::stm32l0x3::{EXTI, GPIOA, GPIOB, GPIOC, PWR, RCC, SYSCFG};

/// The system clock frequency (Hz)
pub const CLK_FREQ: usize = 65536;

// PWR_CR
const PWR_CR_PDDS: u32 = 1 << 1;
const PWR_CR_CWUF: u32 = 1 << 2;
const PWR_CR_PVDE: u32 = 1 << 4;
const PWR_CR_ULP: u32 = 1 << 9;

// EXTI line of the programmable voltage detector
const EXTI_PVD: u32 = 1 << 16;

// RCC_APB1ENR
const APB1_TIM2EN: u32 = 1 << 0;
const APB1_LCDEN: u32 = 1 << 9;
const APB1_USART2EN: u32 = 1 << 17;
const APB1_LPUART1EN: u32 = 1 << 18;
const APB1_I2C1EN: u32 = 1 << 21;

// RCC_APB2ENR
const APB2_ADCEN: u32 = 1 << 9;

/// Light button (PA2, EXTI2_3)
pub const LIGHT_BUTTON: (Port, u8) = (Port::A, 2);
/// Mode button (PB9, EXTI4_15)
pub const MODE_BUTTON: (Port, u8) = (Port::B, 9);
/// Alarm button (PC13, EXTI4_15 and RTC_TAMP1)
pub const ALARM_BUTTON: (Port, u8) = (Port::C, 13);
/// Auxiliary wake input (PA0, RTC_TAMP2)
pub const AUX_WAKE_PIN: (Port, u8) = (Port::A, 0);

/// EXTI lines of the three buttons
pub const BUTTON_EXTI_LINES: u32 = (1 << 2) | (1 << 9) | (1 << 13);

/// GPIO port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    A,
    B,
    C,
}

/// GPIO pins, one bit per pin of each port, that must keep their configuration when the rest are
/// parked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinMask {
    pub a: u16,
    pub b: u16,
    pub c: u16,
}

/// Expand a pin mask into the MODER bits that must be left untouched
const fn moder_keep(pins: u16) -> u32 {
    let mut keep = 0;
    let mut pin = 0;
    while pin < 16 {
        if pins & (1 << pin) != 0 {
            keep |= 0b11 << (pin * 2);
        }
        pin += 1;
    }
    keep
}

/// # System management
///
/// The general clock and power configuration is such that to provide ultra low power operation
///
/// * The system clock (MSI) is set to range 0 (~65.536 kHz)
/// * The voltage regulator is set to range 3 (1.2v)
///
/// Note that the LPRUN mode isn't used as it would require a full reset after each wakeup from
/// stop. As the device is designed to constantly be entering and exiting stop mode, using
/// LPRUN isn't feasible.
///
/// STANDBY loses everything but the RTC domain. The MCU comes back out of it through a reset.
pub struct System {
    rcc: RCC,
    pwr: PWR,
    scb: SCB,
}

impl System {
    pub fn configure(rcc: RCC, pwr: PWR, mut scb: SCB) -> Self {
        // Enter stop mode on WFI
        scb.set_sleepdeep();

        // Set the MSI clock to 65.536 kHz
        rcc.icscr.write(|w| w.msirange().range0());

        // Enable PWR clock
        rcc.apb1enr.modify(|_, w| w.pwren().enabled());

        // Configure PWR control register
        //
        // * Enable voltage regulator range 3 (1.2V)
        // * Switch the regulator into low power mode when sleep or deep sleep is entered
        // * Enter stop mode on deepsleep
        // * Enable RTC write access
        pwr.cr.write(|w| {
            w.vos()
                .v1_2()
                .lpsdsr()
                .low_power_mode()
                .pdds()
                .stop_mode()
                .dbp()
                .enabled()
        });

        // Enable SYSCFG clock
        rcc.apb2enr.modify(|_, w| w.syscfgen().enabled());

        // Enable GPIO port clocks
        rcc.iopenr
            .write(|w| w.iopaen().enabled().iopben().enabled().iopcen().enabled());

        // Configure the Control/Status register
        //
        // * Set the RTC/LCD to use the LSE
        // * Set LSE to medium-high drive capability
        rcc.csr
            .modify(|_, w| w.rtcsel().lse().lsedrv().medium_high());

        // Turn on the LSE
        rcc.csr.modify(|_, w| w.lseon().on());

        // Wait for the LSE to stabilise. Nothing works without it so there is no timeout.
        while rcc.csr.read().lserdy().is_not_ready() {}

        Self { rcc, pwr, scb }
    }

    /// Enable the ADC peripheral clock (PCLK)
    pub(crate) fn enable_adc_clk(&mut self) {
        self.rcc.apb2enr.modify(|_, w| w.adcen().enabled());

        // Disable ADC clock during sleep
        self.rcc.apb2smenr.modify(|_, w| w.adcsmen().disabled());
    }

    /// Enable the RTC
    pub(crate) fn enable_rtc(&mut self) {
        self.rcc.csr.modify(|_, w| w.rtcen().enabled());
    }

    /// Enable LCD perihpheral clock
    pub(crate) fn enable_lcd_clk(&mut self) {
        self.rcc
            .apb1enr
            .modify(|r, w| unsafe { w.bits(r.bits() | APB1_LCDEN) });

        // Enable LCD clock during sleep
        self.rcc
            .apb1smenr
            .modify(|r, w| unsafe { w.bits(r.bits() | APB1_LCDEN) });
    }

    /// Disable LCD peripheral clock
    pub(crate) fn disable_lcd_clk(&mut self) {
        self.rcc
            .apb1enr
            .modify(|r, w| unsafe { w.bits(r.bits() & !APB1_LCDEN) });
    }

    /// Enable TIM2 peripheral clock
    pub(crate) fn enable_tim2_clk(&mut self) {
        self.rcc.apb1enr.modify(|_, w| w.tim2en().enabled());

        // Disable TIM2 clock during sleep
        self.rcc.apb1smenr.modify(|_, w| w.tim2smen().disabled());
    }

    /// Configure the buttons as pulled down inputs that interrupt on both edges
    pub fn configure_buttons(
        &mut self,
        syscfg: &mut SYSCFG,
        exti: &mut EXTI,
        gpioa: &mut GPIOA,
        gpiob: &mut GPIOB,
        gpioc: &mut GPIOC,
    ) {
        gpioa.moder.modify(|_, w| w.mode2().input());
        gpioa.pupdr.modify(|_, w| w.pupd2().pull_down());
        gpiob.moder.modify(|_, w| w.mode9().input());
        gpiob.pupdr.modify(|_, w| w.pupd9().pull_down());
        gpioc.moder.modify(|_, w| w.mode13().input());
        gpioc.pupdr.modify(|_, w| w.pupd13().pull_down());

        // Route EXTI9 to port B and EXTI13 to port C. EXTI2 defaults to port A.
        syscfg
            .exticr3
            .modify(|r, w| unsafe { w.bits((r.bits() & !(0xF << 4)) | (1 << 4)) });
        syscfg
            .exticr4
            .modify(|r, w| unsafe { w.bits((r.bits() & !(0xF << 4)) | (2 << 4)) });

        exti.rtsr
            .modify(|r, w| unsafe { w.bits(r.bits() | BUTTON_EXTI_LINES) });
        exti.ftsr
            .modify(|r, w| unsafe { w.bits(r.bits() | BUTTON_EXTI_LINES) });
        exti.imr
            .modify(|r, w| unsafe { w.bits(r.bits() | BUTTON_EXTI_LINES) });
    }

    /// Gate the general purpose timers
    pub fn disable_timers(&mut self) {
        self.rcc
            .apb1enr
            .modify(|r, w| unsafe { w.bits(r.bits() & !APB1_TIM2EN) });
    }

    /// Gate the ADC
    pub fn disable_adc(&mut self) {
        self.rcc
            .apb2enr
            .modify(|r, w| unsafe { w.bits(r.bits() & !APB2_ADCEN) });
    }

    /// Gate the serial interfaces (USART2, LPUART1, I2C1)
    pub fn disable_serial(&mut self) {
        self.rcc.apb1enr.modify(|r, w| unsafe {
            w.bits(r.bits() & !(APB1_USART2EN | APB1_LPUART1EN | APB1_I2C1EN))
        });
    }

    /// Mask every external interrupt line except `keep`
    pub fn disable_external_interrupts(&mut self, exti: &mut EXTI, keep: u32) {
        exti.imr.modify(|r, w| unsafe { w.bits(r.bits() & keep) });
        exti.emr.modify(|r, w| unsafe { w.bits(r.bits() & keep) });
        // Clear anything already pending
        exti.pr.write(|w| unsafe { w.bits(!keep) });
    }

    /// Turn off the programmable voltage detector so a sagging cell can't wake the MCU
    pub fn mask_voltage_detector(&mut self, exti: &mut EXTI) {
        self.pwr
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() & !PWR_CR_PVDE) });
        exti.imr.modify(|r, w| unsafe { w.bits(r.bits() & !EXTI_PVD) });
    }

    /// Put every GPIO pin not in `keep` into analog mode, the lowest leakage state
    pub fn park_pins(&mut self, keep: PinMask, gpioa: &mut GPIOA, gpiob: &mut GPIOB, gpioc: &mut GPIOC) {
        let a = moder_keep(keep.a);
        let b = moder_keep(keep.b);
        let c = moder_keep(keep.c);

        gpioa
            .moder
            .modify(|r, w| unsafe { w.bits((r.bits() & a) | !a) });
        gpiob
            .moder
            .modify(|r, w| unsafe { w.bits((r.bits() & b) | !b) });
        gpioc
            .moder
            .modify(|r, w| unsafe { w.bits((r.bits() & c) | !c) });
    }

    /// Enter STOP until the next interrupt. RAM and registers are retained.
    pub fn stop(&mut self) {
        self.pwr
            .cr
            .modify(|r, w| unsafe { w.bits((r.bits() & !PWR_CR_PDDS) | PWR_CR_ULP) });
        self.scb.set_sleepdeep();

        cortex_m::asm::dsb();
        cortex_m::asm::wfi();
    }

    /// Enter STANDBY. The only way out is a reset.
    pub fn standby(&mut self) {
        self.pwr
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() | PWR_CR_PDDS | PWR_CR_CWUF | PWR_CR_ULP) });
        self.scb.set_sleepdeep();

        cortex_m::asm::dsb();
        cortex_m::asm::wfi();
    }

    /// Reset the MCU
    pub fn reset(&mut self) -> ! {
        SCB::sys_reset()
    }
}

/// Read the input level of a pin
///
/// Only reads IDR, so it is usable from interrupt handlers while the ports are owned elsewhere.
pub fn pin_is_high((port, pin): (Port, u8)) -> bool {
    // SAFETY: read only access to the input data registers
    let idr = unsafe {
        match port {
            Port::A => (*GPIOA::ptr()).idr.read().bits(),
            Port::B => (*GPIOB::ptr()).idr.read().bits(),
            Port::C => (*GPIOC::ptr()).idr.read().bits(),
        }
    };

    idr & (1 << pin) != 0
}

/// Clear the pending bits of `lines`, returning which of them were pending
///
/// EXTI_PR is write-1-to-clear so this doesn't disturb the other lines.
pub fn take_exti_pending(lines: u32) -> u32 {
    // SAFETY: only the bits in `lines` are written
    let exti = unsafe { &*EXTI::ptr() };
    let pending = exti.pr.read().bits() & lines;
    exti.pr.write(|w| unsafe { w.bits(pending) });
    pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moder_keep_covers_both_mode_bits() {
        assert_eq!(moder_keep(0), 0);
        assert_eq!(moder_keep(1 << 2), 0b11 << 4);
        assert_eq!(moder_keep(1 << 13), 0b11 << 26);
    }

    #[test]
    fn button_lines_match_pins() {
        for (_, pin) in [LIGHT_BUTTON, MODE_BUTTON, ALARM_BUTTON] {
            assert_ne!(BUTTON_EXTI_LINES & (1 << pin), 0);
        }
    }
}
