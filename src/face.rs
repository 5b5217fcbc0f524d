//! Watch faces and what they can ask of the kernel.
//!
//! A face owns its own state. The dispatcher calls into it with a [`FaceContext`] that lends
//! out the settings and the hardware for the duration of the call; anything that changes the
//! dispatcher itself (switching faces, tick rate, sleeping) is recorded as a request and acted
//! on after the face returns.

use crate::backup::{BackupStore, LOCATION_SLOT, SETTINGS_SLOT};
use crate::board::{Board, Indicator};
use crate::chime::{Snapshot, SunTimes};
use crate::event::{Button, Event, EventKind, Gesture};
use crate::settings::{Location, Settings};
use crate::time::DateTime;
use embedded_time::duration::Milliseconds;
use embedded_time::rate::Hertz;

/// C7, the button beep
pub const BEEP_TONE: Hertz = Hertz(2093);
/// C8, the signal tune
pub const SIGNAL_TONE: Hertz = Hertz(4186);

/// Fastest tick a face may ask for
pub const MAX_TICK_HZ: u8 = 64;

pub trait Face {
    /// Called once per boot, before the first activation
    fn setup(&mut self, _settings: &mut Settings, _index: usize) {}

    /// The face is about to become active. Forget anything cached about the display.
    fn activate(&mut self, ctx: &mut FaceContext<'_>);

    /// Handle one event. Returning `false` keeps the watch awake, for example while an LED or
    /// buzzer sequence is running.
    fn handle(&mut self, event: Event, ctx: &mut FaceContext<'_>) -> bool;

    /// The face is being switched away from. Persist anything that should survive a reset.
    fn resign(&mut self, _ctx: &mut FaceContext<'_>) {}

    /// Whether the face has background work due
    ///
    /// Polled on a schedule of its own, so it must not change any state.
    fn wants_background_task(&self, _snapshot: &Snapshot<'_>) -> bool {
        false
    }
}

/// Which face to switch to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Switch {
    Next,
    To(usize),
}

/// Requests a face made during a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requests {
    pub switch: Option<Switch>,
    pub tick_hz: Option<u8>,
    pub sleep: Option<SleepRequest>,
    pub wake: bool,
    pub led: bool,
    /// The clock was set
    pub clock_set: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepRequest {
    /// STANDBY, with an optional message left on the display
    Deep(Option<&'static str>),
    /// Lowest power, display off
    Backup,
}

/// A face's view of the kernel
pub struct FaceContext<'a> {
    pub settings: &'a mut Settings,
    board: &'a mut dyn Board,
    sun: &'a dyn SunTimes,
    requests: Requests,
    index: usize,
    secondary: Option<usize>,
}

impl<'a> FaceContext<'a> {
    pub fn new(
        settings: &'a mut Settings,
        board: &'a mut dyn Board,
        sun: &'a dyn SunTimes,
        index: usize,
        secondary: Option<usize>,
    ) -> Self {
        Self {
            settings,
            board,
            sun,
            requests: Requests::default(),
            index,
            secondary,
        }
    }

    /// Index of the face being called
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn requests(&self) -> Requests {
        self.requests
    }

    pub fn now(&self) -> DateTime {
        self.board.now()
    }

    pub fn set_now(&mut self, now: DateTime) {
        self.board.set_now(now);
        self.requests.clock_set = true;
    }

    pub fn location(&self) -> Location {
        Location::from_bits(self.board.load(LOCATION_SLOT))
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            settings: &*self.settings,
            now: self.now(),
            location: self.location(),
            sun: self.sun,
        }
    }

    pub fn show(&mut self, position: usize, text: &str) {
        self.board.show(position, text);
    }

    pub fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        self.board.set_indicator(indicator, on);
    }

    pub fn set_colon(&mut self, on: bool) {
        self.board.set_colon(on);
    }

    pub fn clear_display(&mut self) {
        self.board.clear();
    }

    /// Blocking
    pub fn play(&mut self, tone: Option<Hertz>, duration: Milliseconds) {
        self.board.play_tone(tone, duration);
    }

    /// Blocking two note chime
    pub fn play_signal(&mut self) {
        self.play(Some(SIGNAL_TONE), Milliseconds(75));
        self.play(None, Milliseconds(100));
        self.play(Some(SIGNAL_TONE), Milliseconds(100));
    }

    pub fn battery_millivolts(&mut self) -> Option<u16> {
        self.board.battery_millivolts()
    }

    pub fn store(&mut self, slot: usize, value: u32) {
        self.board.store(slot, value);
    }

    pub fn load(&self, slot: usize) -> u32 {
        self.board.load(slot)
    }

    /// Write the settings to their backup slot
    pub fn persist_settings(&mut self) {
        let bits = self.settings.bits();
        self.board.store(SETTINGS_SLOT, bits);
    }

    pub fn move_to_next_face(&mut self) {
        self.requests.switch = Some(Switch::Next);
    }

    pub fn move_to_face(&mut self, index: usize) {
        self.requests.switch = Some(Switch::To(index));
    }

    /// Ask for `hz` ticks a second
    ///
    /// Clamped to 1..=[`MAX_TICK_HZ`] and rounded down to a power of two. Takes effect the next
    /// time the watch idles.
    pub fn request_tick_frequency(&mut self, hz: u8) {
        let hz = hz.clamp(1, MAX_TICK_HZ);
        self.requests.tick_hz = Some(1 << (7 - hz.leading_zeros()));
    }

    /// Shut down to STANDBY. The watch comes back through a reset.
    pub fn enter_deep_sleep(&mut self, farewell: Option<&'static str>) {
        self.requests.sleep = Some(SleepRequest::Deep(farewell));
    }

    /// Shut down to the lowest power state. The watch comes back through a reset.
    pub fn enter_backup(&mut self) {
        self.requests.sleep = Some(SleepRequest::Backup);
    }

    /// Leave low energy mode
    pub fn request_wake(&mut self) {
        self.requests.wake = true;
    }

    /// Light the LED for the configured duration
    pub fn illuminate_led(&mut self) {
        self.requests.led = true;
    }
}

/// Behaviour shared by every face for events it doesn't handle itself
pub fn default_loop_handler(event: Event, ctx: &mut FaceContext<'_>) -> bool {
    match event.kind {
        EventKind::Button(Button::Mode, Gesture::Down) => {
            if ctx.settings.button_should_sound() {
                ctx.play(Some(BEEP_TONE), Milliseconds(50));
            }
        }
        EventKind::Button(Button::Mode, Gesture::Up) => ctx.move_to_next_face(),
        EventKind::Button(Button::Mode, Gesture::LongPress) => match ctx.secondary {
            Some(secondary) if ctx.index == 0 => ctx.move_to_face(secondary),
            _ => ctx.move_to_face(0),
        },
        EventKind::Button(Button::Light, Gesture::Down) => ctx.illuminate_led(),
        EventKind::Button(Button::Alarm, Gesture::Up) if ctx.settings.clock_mode_toggle() => {
            let mode = ctx.settings.clock_mode_24h();
            ctx.settings.set_clock_mode_24h(!mode);
        }
        EventKind::Timeout if ctx.index != 0 => ctx.move_to_face(0),
        _ => {}
    }

    true
}
