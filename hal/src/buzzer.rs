use crate::system::{System, CLK_FREQ};
use core::marker::PhantomData;
use embedded_time::duration::Milliseconds;
use embedded_time::rate::Hertz;
use stm32l0::stm32l0x3::{GPIOA, TIM2};

// Timer prescaler value, the timer counts at the system clock
const PRESCALER: u16 = 0;

/// Calculate the value for the auto reload register from a frequency (Hz)
///
/// See [`Buzzer::arr()`] for usage information.
pub const fn arr_from_frequency(freq: usize) -> u16 {
    ((CLK_FREQ / (freq * (PRESCALER as usize + 1))) - 1) as u16
}

/// Calculate the value for the compare capture register from a duty cycle (%) and AAR value
/// ([`arr_from_frequency`])
///
/// See [`Buzzer::ccr()`] for usage information.
pub const fn ccr_from_duty(duty: usize, aar: u16) -> u16 {
    (duty as u32 * aar as u32 / 100) as u16
}

pub struct Running;
pub struct Stopped;

/// Pezio buzzer
///
/// Note that the buzzer is connected to the channel 1 output pin of TIM2 (PA0)
pub struct Buzzer<S>(TIM2, PhantomData<S>);

impl Buzzer<Stopped> {
    pub fn configure(timer: TIM2, sys: &mut System, gpio: &mut GPIOA) -> Buzzer<Stopped> {
        sys.enable_tim2_clk();

        // Configure PA0 to use alternate function mode
        gpio.moder.modify(|_, w| w.mode0().alternate());

        // Set PA0 alternate function to TIM2_CH1 (AF2)
        gpio.afrl.modify(|_, w| w.afsel0().af2());

        // Enable PWM mode 1 for TIM2_CH1
        timer.ccmr1_output().write(|w| w.oc1m().pwm_mode1());

        // Enable TIM2_CH1 output pin
        timer.ccer.write(|w| w.cc1e().enabled());

        // Count at the system clock (clk / (PSC + 1))
        timer.psc.write(|w| w.psc().bits(PRESCALER));

        Self(timer, PhantomData)
    }

    /// Start the buzzer
    pub fn start(self) -> Buzzer<Running> {
        Buzzer::from(self)
    }

    /// Sound `tone` for `duration`, or stay quiet for it when `tone` is `None`.
    ///
    /// This blocks the caller for the whole duration.
    pub fn play(mut self, tone: Option<Hertz>, duration: Milliseconds) -> Self {
        let cycles = (CLK_FREQ as u32 / 1000) * duration.0;

        match tone {
            Some(Hertz(freq)) if freq > 0 => {
                let arr = arr_from_frequency(freq as usize);
                self.arr(arr);
                self.ccr(ccr_from_duty(50, arr));

                let running = self.start();
                cortex_m::asm::delay(cycles);
                running.stop()
            }
            _ => {
                cortex_m::asm::delay(cycles);
                self
            }
        }
    }
}

impl Buzzer<Running> {
    /// Stop the buzzer
    pub fn stop(self) -> Buzzer<Stopped> {
        Buzzer::from(self)
    }
}

impl From<Buzzer<Running>> for Buzzer<Stopped> {
    /// Stop the buzzer
    fn from(buzzer: Buzzer<Running>) -> Buzzer<Stopped> {
        buzzer.0.cr1.modify(|_, w| w.cen().disabled());

        Buzzer(buzzer.0, PhantomData)
    }
}

impl From<Buzzer<Stopped>> for Buzzer<Running> {
    /// Start the buzzer
    fn from(buzzer: Buzzer<Stopped>) -> Buzzer<Running> {
        buzzer.0.cr1.modify(|_, w| w.cen().enabled());

        Buzzer(buzzer.0, PhantomData)
    }
}

impl<S> Buzzer<S> {
    /// Set the auto reload register.
    ///
    /// This value correlates to the frequency of the buzzer and can be calulated using the
    /// [`arr_from_frequency()`] function.
    ///
    /// ARR can be set at any time.
    pub fn arr(&mut self, arr: u16) {
        self.0.arr.write(|w| w.arr().bits(arr));
    }

    /// Set the capture compare register.
    ///
    /// This value correlates to the duty cycle of the buzzer and can be calulated using the
    /// [`ccr_from_duty()`] function.
    ///
    /// CCR can be set at any time.
    pub fn ccr(&mut self, ccr: u16) {
        self.0.ccr1.write(|w| unsafe { w.bits(ccr as u32) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_for_audible_tone() {
        // 65536 / 2048 - 1
        assert_eq!(arr_from_frequency(2048), 31);
        assert_eq!(ccr_from_duty(50, 31), 15);
    }
}
