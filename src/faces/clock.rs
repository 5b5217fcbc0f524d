use crate::board::Indicator;
use crate::chime::{chime_due, Snapshot};
use crate::event::{Button, Event, EventKind, Gesture};
use crate::face::{default_loop_handler, Face, FaceContext};
use crate::settings::Settings;
use crate::time::DateTime;
use core::fmt::Write;
use heapless::String;

/// Below this the low battery indicator comes on
pub const LOW_BATTERY_MILLIVOLTS: u16 = 2200;

/// Hour as displayed and whether it is after noon
fn display_hour(settings: &Settings, hour: u8) -> (u8, bool) {
    if settings.clock_mode_24h() {
        return (hour, false);
    }

    let pm = hour >= 12;
    match hour % 12 {
        0 => (12, pm),
        hour => (hour, pm),
    }
}

/// The primary face: time of day, hourly chime and battery warning
///
/// Alarm long press toggles the hourly chime. Alarm up toggles 12/24 hour mode when the
/// settings allow it.
pub struct ClockFace {
    /// Last drawn time, `None` forces a full redraw
    previous: Option<DateTime>,
    last_battery_check: Option<u8>,
    time_signal: bool,
    battery_low: bool,
}

impl ClockFace {
    pub const fn new() -> Self {
        Self {
            previous: None,
            last_battery_check: None,
            time_signal: false,
            battery_low: false,
        }
    }

    pub fn time_signal(&self) -> bool {
        self.time_signal
    }

    pub fn set_time_signal(&mut self, on: bool) {
        self.time_signal = on;
    }

    pub fn battery_low(&self) -> bool {
        self.battery_low
    }

    fn draw(&mut self, ctx: &mut FaceContext<'_>, now: DateTime) {
        let mut text: String<6> = String::new();

        match self.previous.map(|previous| previous.pack()) {
            Some(previous) if previous >> 6 == now.pack() >> 6 => {
                let _ = write!(text, "{:02}", now.second);
                ctx.show(4, &text);
            }
            Some(previous) if previous >> 12 == now.pack() >> 12 => {
                let _ = write!(text, "{:02}{:02}", now.minute, now.second);
                ctx.show(2, &text);
            }
            _ => {
                let (hour, pm) = display_hour(ctx.settings, now.hour);
                let _ = write!(text, "{:2}{:02}{:02}", hour, now.minute, now.second);
                ctx.show(0, &text);
                ctx.set_indicator(Indicator::Pm, pm);
            }
        }

        self.previous = Some(now);
    }

    fn draw_low_energy(&mut self, ctx: &mut FaceContext<'_>, now: DateTime) {
        let mut text: String<6> = String::new();
        let (hour, pm) = display_hour(ctx.settings, now.hour);
        let _ = write!(text, "{:2}{:02}  ", hour, now.minute);

        ctx.show(0, &text);
        ctx.set_indicator(Indicator::Pm, pm);
        self.previous = None;
    }

    /// Measure the battery once a day
    fn check_battery(&mut self, ctx: &mut FaceContext<'_>, now: DateTime) {
        if self.last_battery_check == Some(now.day) {
            return;
        }
        self.last_battery_check = Some(now.day);

        if let Some(millivolts) = ctx.battery_millivolts() {
            debug!("battery {} mV", millivolts);
            self.battery_low = millivolts < LOW_BATTERY_MILLIVOLTS;
        }
        ctx.set_indicator(Indicator::Lap, self.battery_low);
    }

    fn show_indicators(&self, ctx: &mut FaceContext<'_>) {
        let alarm = ctx.settings.alarm_enabled();
        let h24 = ctx.settings.clock_mode_24h();

        ctx.set_indicator(Indicator::Bell, self.time_signal);
        ctx.set_indicator(Indicator::Signal, alarm);
        ctx.set_indicator(Indicator::H24, h24);
        ctx.set_indicator(Indicator::Lap, self.battery_low);
    }
}

impl Default for ClockFace {
    fn default() -> Self {
        Self::new()
    }
}

impl Face for ClockFace {
    fn activate(&mut self, ctx: &mut FaceContext<'_>) {
        self.previous = None;
        self.show_indicators(ctx);
        ctx.set_colon(true);
    }

    fn handle(&mut self, event: Event, ctx: &mut FaceContext<'_>) -> bool {
        match event.kind {
            EventKind::Activate | EventKind::Tick => {
                let now = ctx.now();
                self.draw(ctx, now);
                self.check_battery(ctx, now);
            }
            EventKind::LowEnergyUpdate => {
                let now = ctx.now();
                self.draw_low_energy(ctx, now);
            }
            EventKind::Button(Button::Alarm, Gesture::LongPress) => {
                self.time_signal = !self.time_signal;
                ctx.set_indicator(Indicator::Bell, self.time_signal);
            }
            EventKind::Button(Button::Alarm, Gesture::Up) if ctx.settings.clock_mode_toggle() => {
                let h24 = !ctx.settings.clock_mode_24h();
                ctx.settings.set_clock_mode_24h(h24);
                ctx.set_indicator(Indicator::H24, h24);

                self.previous = None;
                let now = ctx.now();
                self.draw(ctx, now);
            }
            EventKind::BackgroundTask => ctx.play_signal(),
            _ => return default_loop_handler(event, ctx),
        }

        true
    }

    fn wants_background_task(&self, snapshot: &Snapshot<'_>) -> bool {
        self.time_signal && chime_due(snapshot)
    }
}
