//! The STM32L053 watch board
//!
//! Wires the kernel's hardware traits onto `watch-hal`. The interrupt handlers only touch the
//! status registers and the shared [`InterruptFlags`]; everything else belongs to the main loop.

use crate::backup::BackupRegisters;
use crate::board::{Battery, Board, Clock, Indicator, Led, Screen, Speaker, Ticker};
use crate::error::Fault;
use crate::event::Button;
use crate::irq::InterruptFlags;
use crate::power::{Peripheral, PowerControl, SleepDepth};
use crate::time::DateTime;
use crate::wake::{ChannelFields, WakeHardware, WakeInput, WakeSources};
use cortex_m::peripheral::SCB;
use embedded_time::duration::Milliseconds;
use embedded_time::rate::Hertz;
use watch_hal::buzzer::Stopped;
use watch_hal::pac::{Peripherals, EXTI, GPIOA, GPIOB, GPIOC};
use watch_hal::rtc::{self, Calendar, ADC_CALIBRATION_REGISTER, RTC_EXTI_LINES, TAMPER_1, TAMPER_2};
use watch_hal::system::{
    self, PinMask, Port, ALARM_BUTTON, AUX_WAKE_PIN, BUTTON_EXTI_LINES, LIGHT_BUTTON,
    MODE_BUTTON,
};
use watch_hal::{lcd, Adc, Buzzer, Lcd, Rtc, System, Timeout};

impl From<Calendar> for DateTime {
    fn from(c: Calendar) -> Self {
        DateTime::new(c.year, c.month, c.day, c.hour, c.minute, c.second)
    }
}

impl From<DateTime> for Calendar {
    fn from(t: DateTime) -> Self {
        Calendar {
            year: t.year,
            month: t.month,
            day: t.day,
            hour: t.hour,
            minute: t.minute,
            second: t.second,
        }
    }
}

fn button_pin(button: Button) -> (Port, u8) {
    match button {
        Button::Light => LIGHT_BUTTON,
        Button::Mode => MODE_BUTTON,
        Button::Alarm => ALARM_BUTTON,
    }
}

/// The watch
pub struct Stm32Board {
    sys: System,
    rtc: Rtc,
    lcd: Lcd,
    buzzer: Option<Buzzer<Stopped>>,
    adc: Adc,
    exti: EXTI,
    gpioa: GPIOA,
    gpiob: GPIOB,
    gpioc: GPIOC,
    /// Tamper configuration to restore when detection is switched back on
    tamper: u32,
    tamper_on: bool,
}

impl Stm32Board {
    /// Bring up the clocks and every peripheral the kernel uses
    pub fn configure(dp: Peripherals, scb: SCB) -> Self {
        let mut exti = dp.EXTI;
        let mut syscfg = dp.SYSCFG;
        let mut gpioa = dp.GPIOA;
        let mut gpiob = dp.GPIOB;
        let mut gpioc = dp.GPIOC;

        let mut sys = System::configure(dp.RCC, dp.PWR, scb);
        let rtc = Rtc::configure(dp.RTC, &mut sys, &mut exti);
        let lcd = Lcd::configure(dp.LCD, &mut sys, &mut syscfg, &mut gpioa, &mut gpiob);
        let buzzer = Buzzer::configure(dp.TIM2, &mut sys, &mut gpioa);
        let adc = Adc::configure(dp.ADC, &mut sys, &mut syscfg);
        sys.configure_buttons(&mut syscfg, &mut exti, &mut gpioa, &mut gpiob, &mut gpioc);

        let tamper = rtc.tamper_config();
        let tamper_on = rtc.tamper_enabled();

        Self {
            sys,
            rtc,
            lcd,
            buzzer: Some(buzzer),
            adc,
            exti,
            gpioa,
            gpiob,
            gpioc,
            tamper,
            tamper_on,
        }
    }
}

fn sync(result: Result<(), Timeout>, fault: Fault) -> Result<(), Fault> {
    result.map_err(|Timeout| fault)
}

impl Clock for Stm32Board {
    fn now(&self) -> DateTime {
        self.rtc.now().into()
    }

    fn set_now(&mut self, now: DateTime) {
        if self.rtc.set(now.into()).is_err() {
            error!("rtc refused the new time");
        }
    }
}

impl Ticker for Stm32Board {
    fn set_tick_frequency(&mut self, hz: Hertz) -> Result<(), Fault> {
        sync(self.rtc.start_tick(hz.0), Fault::TickSync)
    }

    fn disable_tick(&mut self) -> Result<(), Fault> {
        sync(self.rtc.stop_tick(), Fault::TickSync)
    }

    fn start_fast_tick(&mut self) -> Result<(), Fault> {
        sync(self.rtc.start_fast_tick(), Fault::TickSync)
    }

    fn stop_fast_tick(&mut self) -> Result<(), Fault> {
        sync(self.rtc.stop_fast_tick(), Fault::TickSync)
    }

    fn enable_minute_alarm(&mut self) -> Result<(), Fault> {
        sync(self.rtc.start_minute_alarm(), Fault::TickSync)
    }

    fn disable_minute_alarm(&mut self) -> Result<(), Fault> {
        sync(self.rtc.stop_minute_alarm(), Fault::TickSync)
    }
}

impl Screen for Stm32Board {
    fn show(&mut self, position: usize, text: &str) {
        self.lcd.show(position, text);
    }

    // The glass has no indicator segments or colon
    fn set_indicator(&mut self, _: Indicator, _: bool) {}

    fn set_colon(&mut self, _: bool) {}

    fn clear(&mut self) {
        self.lcd.clear();
    }

    fn power_down(&mut self) -> Result<(), Fault> {
        sync(self.lcd.disable(&mut self.sys), Fault::DisplaySync)
    }
}

impl Speaker for Stm32Board {
    fn play_tone(&mut self, tone: Option<Hertz>, duration: Milliseconds) {
        if let Some(buzzer) = self.buzzer.take() {
            self.buzzer = Some(buzzer.play(tone, duration));
        }
    }
}

impl Led for Stm32Board {
    // No LED fitted
    fn set_led(&mut self, _: u8, _: u8) {}
}

impl Battery for Stm32Board {
    fn battery_millivolts(&mut self) -> Option<u16> {
        self.adc.calibrate(&mut self.rtc).ok()?;
        self.adc.supply_millivolts(&self.rtc).ok()
    }
}

impl BackupRegisters for Stm32Board {
    fn count(&self) -> usize {
        ADC_CALIBRATION_REGISTER
    }

    fn read_raw(&self, index: usize) -> u32 {
        self.rtc.read_backup(index)
    }

    fn write_raw(&mut self, index: usize, value: u32) {
        self.rtc.write_backup(index, value);
    }
}

impl WakeHardware for Stm32Board {
    fn wake_enabled(&self) -> bool {
        self.tamper_on
    }

    fn disable_wake(&mut self) {
        self.tamper = self.rtc.tamper_config();
        self.rtc.disable_tamper();
        self.tamper_on = false;
    }

    fn enable_wake(&mut self) {
        self.rtc.set_tamper_config(self.tamper);
        self.tamper_on = true;
    }

    fn wake_synced(&self) -> bool {
        if self.tamper_on {
            self.rtc.tamper_config() == self.tamper
        } else {
            self.rtc.tamper_idle()
        }
    }

    fn wake_config(&self) -> u32 {
        self.tamper
    }

    fn write_wake_config(&mut self, config: u32) {
        self.tamper = config;
    }

    fn channel_fields(&self, input: WakeInput) -> Option<ChannelFields> {
        match input {
            WakeInput::AlarmButton => Some(ChannelFields {
                action: TAMPER_1.action,
                level: TAMPER_1.level,
                debounce: TAMPER_1.filter,
            }),
            WakeInput::A2 => Some(ChannelFields {
                action: TAMPER_2.action,
                level: TAMPER_2.level,
                debounce: TAMPER_2.filter,
            }),
            // RTC_TAMP3 is not bonded out on this package
            WakeInput::A4 => None,
        }
    }

    fn take_wake_flags(&mut self) -> u8 {
        wake_mask(self.rtc.take_flags())
    }
}

impl PowerControl for Stm32Board {
    fn disable_peripheral(&mut self, peripheral: Peripheral) {
        match peripheral {
            Peripheral::Timers => self.sys.disable_timers(),
            Peripheral::Adc => self.sys.disable_adc(),
            Peripheral::Serial => self.sys.disable_serial(),
            Peripheral::ExternalInterrupts => {
                self.sys.disable_external_interrupts(&mut self.exti, RTC_EXTI_LINES)
            }
        }
    }

    fn mask_brownout(&mut self) {
        self.sys.mask_voltage_detector(&mut self.exti);
    }

    fn disable_pins_except(&mut self, armed: u8) {
        let mut keep = PinMask::default();

        if armed & WakeInput::AlarmButton.mask() != 0 {
            keep.c |= 1 << ALARM_BUTTON.1;
        }
        if armed & WakeInput::A2.mask() != 0 {
            keep.a |= 1 << AUX_WAKE_PIN.1;
        }
        // A farewell message stays on the glass
        if self.lcd.is_enabled() {
            keep.a |= lcd::PINS.a;
            keep.b |= lcd::PINS.b;
            keep.c |= lcd::PINS.c;
        }

        self.sys
            .park_pins(keep, &mut self.gpioa, &mut self.gpiob, &mut self.gpioc);
    }

    fn sleep(&mut self, depth: SleepDepth) {
        match depth {
            SleepDepth::Stop => self.sys.stop(),
            SleepDepth::Standby | SleepDepth::Backup => self.sys.standby(),
        }
    }

    fn reset(&mut self) {
        self.sys.reset()
    }
}

impl Board for Stm32Board {
    fn wait_for_interrupt(&mut self, flags: &InterruptFlags) {
        // With interrupts masked a pending one still ends the WFI, and is then serviced on the
        // way out of the critical section
        cortex_m::interrupt::free(|_| {
            if !flags.any_pending() {
                self.sys.stop();
            }
        });
    }
}

/// Body of the RTC interrupt handler
pub fn on_rtc_interrupt(flags: &InterruptFlags, wake: &WakeSources) {
    let fired = Rtc::take_flags_from_interrupt();
    system::take_exti_pending(RTC_EXTI_LINES);

    if fired.wakeup_timer {
        flags.tick();
    }
    if fired.alarm_a {
        flags.minute();
    }
    if fired.alarm_b {
        flags.fast_tick();
    }
    let inputs = wake_mask(fired);
    if inputs != 0 {
        wake.dispatch(inputs);
    }
}

fn wake_mask(fired: rtc::Flags) -> u8 {
    let mut inputs = 0;
    if fired.tamper_1 {
        inputs |= WakeInput::AlarmButton.mask();
    }
    if fired.tamper_2 {
        inputs |= WakeInput::A2.mask();
    }
    inputs
}

/// Body of the button interrupt handlers
///
/// Each edge is turned into a press or a release by the level the pin has settled at.
pub fn on_button_interrupt(flags: &InterruptFlags) {
    let pending = system::take_exti_pending(BUTTON_EXTI_LINES);

    for button in Button::ALL {
        let pin = button_pin(button);
        if pending & (1 << pin.1) == 0 {
            continue;
        }

        if system::pin_is_high(pin) {
            flags.press(button);
        } else {
            flags.release(button);
        }
    }
}
