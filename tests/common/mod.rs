//! A board that records every hardware call
#![allow(dead_code)]

use core::cell::RefCell;
use embedded_time::duration::Milliseconds;
use embedded_time::rate::Hertz;
use movement::backup::{BackupRegisters, RamRegisters};
use movement::board::{Battery, Board, Clock, Indicator, Led, Screen, Speaker, Ticker};
use movement::chime::Snapshot;
use movement::face::default_loop_handler;
use movement::irq::InterruptFlags;
use movement::power::{Peripheral, PowerControl, SleepDepth};
use movement::wake::{ChannelFields, WakeHardware, WakeInput};
use movement::{Button, DateTime, Event, EventKind, Face, FaceContext, Fault, Gesture, Movement};
use std::rc::Rc;

pub const DIGITS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetTime(DateTime),
    Tick(u32),
    DisableTick,
    StartFastTick,
    StopFastTick,
    EnableMinuteAlarm,
    DisableMinuteAlarm,
    Show(usize, String),
    Clear,
    PowerDown,
    Tone(Option<u32>, u32),
    Led(u8, u8),
    DisablePeripheral(Peripheral),
    MaskBrownout,
    ParkPins(u8),
    Sleep(SleepDepth),
    Reset,
    Wait,
}

pub struct MockBoard {
    pub now: DateTime,
    pub calls: Vec<Call>,
    pub backup: RamRegisters<8>,
    pub display: [char; DIGITS],
    pub indicators: Vec<(Indicator, bool)>,
    pub colon: bool,
    pub battery: Option<u16>,
    pub wake_on: bool,
    pub wake_config: u32,
    pub wake_fired: u8,
    /// Inputs with a wake channel, as [`WakeInput::mask`] bits
    pub wake_supported: u8,
    /// The wake hardware never acknowledges a change
    pub stuck_wake: bool,
    /// Seconds the clock advances on every wait
    pub seconds_per_wait: u8,
}

impl MockBoard {
    pub fn new() -> Self {
        Self {
            now: DateTime::new(6, 3, 14, 10, 15, 0),
            calls: Vec::new(),
            backup: RamRegisters::new(),
            display: [' '; DIGITS],
            indicators: Vec::new(),
            colon: false,
            battery: Some(3000),
            wake_on: false,
            wake_config: 0,
            wake_fired: 0,
            wake_supported: 0b111,
            stuck_wake: false,
            seconds_per_wait: 0,
        }
    }

    pub fn text(&self) -> String {
        self.display.iter().collect()
    }

    pub fn indicator(&self, indicator: Indicator) -> bool {
        self.indicators
            .iter()
            .rev()
            .find(|(which, _)| *which == indicator)
            .is_some_and(|(_, on)| *on)
    }

    /// Calls made since the last [`MockBoard::forget`]
    pub fn forget(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn advance(&mut self, seconds: u32) {
        let total = self.now.hour as u32 * 3600
            + self.now.minute as u32 * 60
            + self.now.second as u32
            + seconds;
        self.now.second = (total % 60) as u8;
        self.now.minute = (total / 60 % 60) as u8;
        self.now.hour = (total / 3600 % 24) as u8;
    }

    pub fn wake_armed(&self, input: WakeInput) -> bool {
        let fields = self.channel_fields(input);
        self.wake_on && fields.is_some_and(|f| self.wake_config & f.action == f.action)
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockBoard {
    fn now(&self) -> DateTime {
        self.now
    }

    fn set_now(&mut self, now: DateTime) {
        self.now = now;
        self.calls.push(Call::SetTime(now));
    }
}

impl Ticker for MockBoard {
    fn set_tick_frequency(&mut self, hz: Hertz) -> Result<(), Fault> {
        self.calls.push(Call::Tick(hz.0));
        Ok(())
    }

    fn disable_tick(&mut self) -> Result<(), Fault> {
        self.calls.push(Call::DisableTick);
        Ok(())
    }

    fn start_fast_tick(&mut self) -> Result<(), Fault> {
        self.calls.push(Call::StartFastTick);
        Ok(())
    }

    fn stop_fast_tick(&mut self) -> Result<(), Fault> {
        self.calls.push(Call::StopFastTick);
        Ok(())
    }

    fn enable_minute_alarm(&mut self) -> Result<(), Fault> {
        self.calls.push(Call::EnableMinuteAlarm);
        Ok(())
    }

    fn disable_minute_alarm(&mut self) -> Result<(), Fault> {
        self.calls.push(Call::DisableMinuteAlarm);
        Ok(())
    }
}

impl Screen for MockBoard {
    fn show(&mut self, position: usize, text: &str) {
        for (digit, ch) in (position..DIGITS).zip(text.chars()) {
            self.display[digit] = ch;
        }
        self.calls.push(Call::Show(position, text.to_owned()));
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        self.indicators.push((indicator, on));
    }

    fn set_colon(&mut self, on: bool) {
        self.colon = on;
    }

    fn clear(&mut self) {
        self.display = [' '; DIGITS];
        self.calls.push(Call::Clear);
    }

    fn power_down(&mut self) -> Result<(), Fault> {
        self.calls.push(Call::PowerDown);
        Ok(())
    }
}

impl Speaker for MockBoard {
    fn play_tone(&mut self, tone: Option<Hertz>, duration: Milliseconds) {
        self.calls.push(Call::Tone(tone.map(|hz| hz.0), duration.0));
    }
}

impl Led for MockBoard {
    fn set_led(&mut self, red: u8, green: u8) {
        self.calls.push(Call::Led(red, green));
    }
}

impl Battery for MockBoard {
    fn battery_millivolts(&mut self) -> Option<u16> {
        self.battery
    }
}

impl BackupRegisters for MockBoard {
    fn count(&self) -> usize {
        self.backup.count()
    }

    fn read_raw(&self, index: usize) -> u32 {
        self.backup.read_raw(index)
    }

    fn write_raw(&mut self, index: usize, value: u32) {
        self.backup.write_raw(index, value);
    }
}

impl WakeHardware for MockBoard {
    fn wake_enabled(&self) -> bool {
        self.wake_on
    }

    fn disable_wake(&mut self) {
        self.wake_on = false;
    }

    fn enable_wake(&mut self) {
        self.wake_on = true;
    }

    fn wake_synced(&self) -> bool {
        !self.stuck_wake
    }

    fn wake_config(&self) -> u32 {
        self.wake_config
    }

    fn write_wake_config(&mut self, config: u32) {
        assert!(!self.wake_on, "wake configuration written while detecting");
        self.wake_config = config;
    }

    fn channel_fields(&self, input: WakeInput) -> Option<ChannelFields> {
        let ch = input.channel() as u32;
        (self.wake_supported & input.mask() != 0).then_some(ChannelFields {
            action: 0b01 << (ch * 2),
            level: 1 << (16 + ch),
            debounce: 1 << (24 + ch),
        })
    }

    fn take_wake_flags(&mut self) -> u8 {
        std::mem::take(&mut self.wake_fired)
    }
}

impl PowerControl for MockBoard {
    fn disable_peripheral(&mut self, peripheral: Peripheral) {
        self.calls.push(Call::DisablePeripheral(peripheral));
    }

    fn mask_brownout(&mut self) {
        self.calls.push(Call::MaskBrownout);
    }

    fn disable_pins_except(&mut self, armed: u8) {
        self.calls.push(Call::ParkPins(armed));
    }

    fn sleep(&mut self, depth: SleepDepth) {
        self.calls.push(Call::Sleep(depth));
    }

    fn reset(&mut self) {
        self.calls.push(Call::Reset);
    }
}

impl Board for MockBoard {
    fn wait_for_interrupt(&mut self, _flags: &InterruptFlags) {
        self.calls.push(Call::Wait);
        let seconds = self.seconds_per_wait as u32;
        self.advance(seconds);
    }
}

/// Shared record of everything the probe faces saw
pub type Log = Rc<RefCell<Vec<String>>>;

/// A face that logs its calls and otherwise behaves like a plain face
///
/// Alarm longer press asks for deep sleep, Light longer press for backup.
pub struct Probe {
    id: usize,
    log: Log,
    pub wants_background: bool,
    pub keep_awake: bool,
}

impl Probe {
    pub fn new(id: usize, log: &Log) -> Self {
        Self {
            id,
            log: log.clone(),
            wants_background: false,
            keep_awake: false,
        }
    }

    pub fn row<const N: usize>(log: &Log) -> [Probe; N] {
        core::array::from_fn(|id| Probe::new(id, log))
    }

    fn record(&self, what: String) {
        self.log.borrow_mut().push(what);
    }
}

impl Face for Probe {
    fn activate(&mut self, _: &mut FaceContext<'_>) {
        self.record(format!("{} activate", self.id));
    }

    fn handle(&mut self, event: Event, ctx: &mut FaceContext<'_>) -> bool {
        self.record(format!("{} {:?}", self.id, event.kind));

        match event.kind {
            EventKind::Button(Button::Alarm, Gesture::LongerPress) => {
                ctx.enter_deep_sleep(Some("BYE"))
            }
            EventKind::Button(Button::Light, Gesture::LongerPress) => ctx.enter_backup(),
            _ => {
                default_loop_handler(event, ctx);
            }
        }

        !self.keep_awake
    }

    fn resign(&mut self, _: &mut FaceContext<'_>) {
        self.record(format!("{} resign", self.id));
    }

    fn wants_background_task(&self, _: &Snapshot<'_>) -> bool {
        self.wants_background
    }
}

/// Log entries other than ticks, draining the log
pub fn events(log: &Log) -> Vec<String> {
    log.borrow_mut()
        .drain(..)
        .filter(|entry| !entry.ends_with(" Tick"))
        .collect()
}

/// Press and release `button` within one pass of the loop
pub fn click<const N: usize>(
    movement: &mut Movement<'_, MockBoard, N>,
    flags: &InterruptFlags,
    button: Button,
) {
    flags.press(button);
    flags.release(button);
    movement.step().unwrap();
}

/// Hold `button` for `fast_ticks` ticks of the hold timer without releasing it
pub fn hold<const N: usize>(
    movement: &mut Movement<'_, MockBoard, N>,
    flags: &InterruptFlags,
    button: Button,
    fast_ticks: u16,
) {
    flags.press(button);
    movement.step().unwrap();
    for _ in 0..fast_ticks {
        flags.fast_tick();
    }
    movement.step().unwrap();
}

/// Let `seconds` go by, one tick a second
pub fn run_seconds<const N: usize>(
    movement: &mut Movement<'_, MockBoard, N>,
    flags: &InterruptFlags,
    seconds: u32,
) {
    for _ in 0..seconds {
        movement.board_mut().advance(1);
        flags.tick();
        movement.step().unwrap();
    }
}
