use crate::board::Indicator;
use crate::event::{Button, Event, EventKind, Gesture};
use crate::face::{default_loop_handler, Face, FaceContext};
use crate::time::{days_in_month, TIME_ZONE_OFFSETS};
use core::fmt::Write;
use heapless::String;

/// Tick rate while the face is on screen
const TICK_HZ: u8 = 4;
/// Tick rate while the alarm button is held, one increment per tick
const QUICK_TICK_HZ: u8 = 8;

/// Years past 2020 the calendar goes up to
const YEARS: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Hour,
    Minute,
    Second,
    Year,
    Month,
    Day,
    Zone,
}

impl Page {
    const ALL: [Page; 7] = [
        Page::Hour,
        Page::Minute,
        Page::Second,
        Page::Year,
        Page::Month,
        Page::Day,
        Page::Zone,
    ];

    fn title(self) -> &'static str {
        match self {
            Page::Hour => "HR",
            Page::Minute => "M1",
            Page::Second => "SE",
            Page::Year => "YR",
            Page::Month => "MO",
            Page::Day => "DA",
            Page::Zone => "Z",
        }
    }
}

/// Sets the clock and the time zone
///
/// Light steps through the pages, Alarm increments the value on the current page and holding
/// Alarm keeps incrementing. The settings are written back when the face is left.
pub struct SetTimeFace {
    page: usize,
    quick_ticks: bool,
}

impl SetTimeFace {
    pub const fn new() -> Self {
        Self {
            page: 0,
            quick_ticks: false,
        }
    }

    fn page(&self) -> Page {
        Page::ALL[self.page % Page::ALL.len()]
    }

    fn increment(&mut self, ctx: &mut FaceContext<'_>) {
        let mut now = ctx.now();

        match self.page() {
            Page::Hour => now.hour = (now.hour + 1) % 24,
            Page::Minute => now.minute = (now.minute + 1) % 60,
            Page::Second => now.second = 0,
            Page::Year => now.year = (now.year + 1) % YEARS,
            Page::Month => now.month = now.month % 12 + 1,
            Page::Day => now.day = now.day % days_in_month(now.month, now.full_year()) + 1,
            Page::Zone => {
                let zone = (ctx.settings.time_zone() as usize + 1) % TIME_ZONE_OFFSETS.len();
                ctx.settings.set_time_zone(zone as u8);
                return;
            }
        }

        now.day = now.day.min(days_in_month(now.month, now.full_year()));
        ctx.set_now(now);
    }

    fn draw(&self, ctx: &mut FaceContext<'_>, subsecond: u8) {
        let now = ctx.now();
        let page = self.page();
        let mut value: String<5> = String::new();

        let pm = match page {
            Page::Hour | Page::Minute => {
                let hour = if ctx.settings.clock_mode_24h() {
                    now.hour
                } else {
                    match now.hour % 12 {
                        0 => 12,
                        hour => hour,
                    }
                };
                let _ = write!(value, "{:2}{:02}", hour, now.minute);
                !ctx.settings.clock_mode_24h() && now.hour >= 12
            }
            Page::Second => {
                let _ = write!(value, "  {:02}", now.second);
                false
            }
            Page::Year => {
                let _ = write!(value, "{}", now.full_year());
                false
            }
            Page::Month => {
                let _ = write!(value, "  {:02}", now.month);
                false
            }
            Page::Day => {
                let _ = write!(value, "  {:02}", now.day);
                false
            }
            Page::Zone => {
                let offset = ctx.settings.zone_offset_minutes();
                let sign = if offset < 0 { '-' } else { ' ' };
                let offset = offset.unsigned_abs();
                let _ = write!(value, "{}{:02}{:02}", sign, offset / 60, offset % 60);
                false
            }
        };

        let mut text: String<6> = String::new();
        let _ = text.push_str(page.title());
        let _ = text.push_str(&value);

        // Blink the value being edited, unless it is being scrolled
        if subsecond % 2 == 1 && !self.quick_ticks {
            text.truncate(page.title().len());
            while text.push(' ').is_ok() {}
        }

        ctx.clear_display();
        ctx.show(0, &text);
        ctx.set_indicator(Indicator::Pm, pm);
    }
}

impl Default for SetTimeFace {
    fn default() -> Self {
        Self::new()
    }
}

impl Face for SetTimeFace {
    fn activate(&mut self, ctx: &mut FaceContext<'_>) {
        self.page = 0;
        self.quick_ticks = false;
        ctx.set_colon(false);
        ctx.request_tick_frequency(TICK_HZ);
    }

    fn handle(&mut self, event: Event, ctx: &mut FaceContext<'_>) -> bool {
        match event.kind {
            EventKind::Activate => {}
            EventKind::Tick => {
                if self.quick_ticks {
                    self.increment(ctx);
                }
            }
            EventKind::Button(Button::Light, Gesture::Down) => {
                self.page = (self.page + 1) % Page::ALL.len();
            }
            EventKind::Button(Button::Alarm, Gesture::Up) => self.increment(ctx),
            EventKind::Button(Button::Alarm, Gesture::LongPress) => {
                self.quick_ticks = true;
                ctx.request_tick_frequency(QUICK_TICK_HZ);
            }
            EventKind::Button(Button::Alarm, Gesture::LongUp) => {
                self.quick_ticks = false;
                ctx.request_tick_frequency(TICK_HZ);
            }
            _ => return default_loop_handler(event, ctx),
        }

        self.draw(ctx, event.subsecond);
        true
    }

    fn resign(&mut self, ctx: &mut FaceContext<'_>) {
        self.page = 0;
        self.quick_ticks = false;
        ctx.persist_settings();
    }
}
