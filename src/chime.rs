//! Hourly chime window.
//!
//! The chime sounds at the top of each hour from the start hour up to, but not including, the
//! end hour. Either bound can follow the sun; an automatic bound with no stored location, or a
//! day the sun doesn't rise or set, leaves that side of the window open.

use crate::settings::{Location, Settings, CHIME_AUTOMATIC, HOURLY_CHIME_END, HOURLY_CHIME_START};
use crate::time::DateTime;

/// Sunrise and sunset calculation
pub trait SunTimes {
    /// Sunrise and sunset in fractional UTC hours for the given UTC date, `None` during polar
    /// day or night. Coordinates are in degrees, east and north positive.
    fn rise_set(&self, year: u16, month: u8, day: u8, longitude: f32, latitude: f32)
        -> Option<(f32, f32)>;
}

/// For boards without an almanac; automatic bounds stay open
pub struct NoSunTimes;

impl SunTimes for NoSunTimes {
    fn rise_set(&self, _: u16, _: u8, _: u8, _: f32, _: f32) -> Option<(f32, f32)> {
        None
    }
}

/// Everything a background task predicate may look at
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    pub settings: &'a Settings,
    /// Local time
    pub now: DateTime,
    pub location: Location,
    pub sun: &'a dyn SunTimes,
}

/// Chiming hours, `None` for an open bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChimeWindow {
    /// First hour that chimes, 1-24 with midnight as 24
    pub start: Option<u8>,
    /// First hour that doesn't, 1-24 with midnight as 24
    pub end: Option<u8>,
}

impl ChimeWindow {
    pub fn contains(&self, hour: u8) -> bool {
        !(self.start.is_some_and(|start| hour < start) || self.end.is_some_and(|end| hour >= end))
    }
}

/// Local hour for a UTC time of day. `round_up` moves anything past the hour to the next one.
///
/// A time that isn't a number gives no hour.
fn local_hour(utc_hours: f32, zone_hours: f32, round_up: bool) -> Option<u8> {
    let time = utc_hours + zone_hours;
    if !time.is_finite() {
        return None;
    }

    let mut time = time % 24.0;
    if time < 0.0 {
        time += 24.0;
    }
    if time >= 24.0 {
        time = 0.0;
    }

    let hour = time as u8;
    let minutes = (time - hour as f32) * 60.0;
    if round_up && minutes >= 0.5 {
        Some((hour + 1) % 24)
    } else {
        Some(hour)
    }
}

pub fn chime_window(snapshot: &Snapshot<'_>) -> ChimeWindow {
    let settings = snapshot.settings;
    let fixed = |index: u8, table: &[u8]| {
        (index != CHIME_AUTOMATIC).then(|| table[index as usize])
    };

    let mut window = ChimeWindow {
        start: fixed(settings.hourly_chime_start(), &HOURLY_CHIME_START),
        end: fixed(settings.hourly_chime_end(), &HOURLY_CHIME_END),
    };

    let automatic = settings.hourly_chime_start() == CHIME_AUTOMATIC
        || settings.hourly_chime_end() == CHIME_AUTOMATIC;

    if automatic && snapshot.location.is_set() {
        let offset = settings.zone_offset_minutes();
        let utc = snapshot.now.to_utc(offset);
        let latitude = snapshot.location.latitude() as f32 / 100.0;
        let longitude = snapshot.location.longitude() as f32 / 100.0;

        if let Some((rise, set)) =
            snapshot
                .sun
                .rise_set(utc.full_year(), utc.month, utc.day, longitude, latitude)
        {
            let zone_hours = offset as f32 / 60.0;
            if settings.hourly_chime_start() == CHIME_AUTOMATIC {
                window.start = local_hour(rise, zone_hours, true);
            }
            if settings.hourly_chime_end() == CHIME_AUTOMATIC {
                window.end = local_hour(set, zone_hours, false);
            }
        }
    }

    // Midnight sorts after every other hour
    window.start = window.start.map(|hour| if hour == 0 { 24 } else { hour });
    window.end = window.end.map(|hour| if hour == 0 { 24 } else { hour });
    window
}

/// Whether the hourly chime is due at `snapshot.now`
///
/// Polled once a minute, so only the minute is compared.
pub fn chime_due(snapshot: &Snapshot<'_>) -> bool {
    if snapshot.now.minute != 0 {
        return false;
    }

    if snapshot.settings.hourly_chime_always() {
        return true;
    }

    chime_window(snapshot).contains(snapshot.now.hour)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSun(f32, f32);

    impl SunTimes for FixedSun {
        fn rise_set(&self, _: u16, _: u8, _: u8, _: f32, _: f32) -> Option<(f32, f32)> {
            Some((self.0, self.1))
        }
    }

    fn snapshot<'a>(settings: &'a Settings, hour: u8, minute: u8, sun: &'a dyn SunTimes) -> Snapshot<'a> {
        Snapshot {
            settings,
            now: DateTime::new(4, 6, 21, hour, minute, 0),
            location: Location::new(5150, -12),
            sun,
        }
    }

    #[test]
    fn fixed_window() {
        let mut settings = Settings::from_bits(0);
        settings.set_hourly_chime_start(1); // 08
        settings.set_hourly_chime_end(0); // 21

        assert!(!chime_due(&snapshot(&settings, 7, 0, &NoSunTimes)));
        assert!(chime_due(&snapshot(&settings, 8, 0, &NoSunTimes)));
        assert!(chime_due(&snapshot(&settings, 20, 0, &NoSunTimes)));
        assert!(!chime_due(&snapshot(&settings, 21, 0, &NoSunTimes)));
        assert!(!chime_due(&snapshot(&settings, 12, 1, &NoSunTimes)));
    }

    #[test]
    fn always_ignores_window() {
        let mut settings = Settings::from_bits(0);
        settings.set_hourly_chime_always(true);

        for hour in 0..24 {
            assert!(chime_due(&snapshot(&settings, hour, 0, &NoSunTimes)));
            assert!(!chime_due(&snapshot(&settings, hour, 30, &NoSunTimes)));
        }
    }

    #[test]
    fn automatic_follows_the_sun() {
        let mut settings = Settings::from_bits(0);
        settings.set_hourly_chime_start(CHIME_AUTOMATIC);
        settings.set_hourly_chime_end(CHIME_AUTOMATIC);
        // UTC+1
        settings.set_time_zone(1);

        // Rise 04:43 UTC is 05:43 local, rounded up to 06. Set 20:21 UTC is 21:21, 21.
        let sun = FixedSun(4.72, 20.35);
        let window = chime_window(&snapshot(&settings, 12, 0, &sun));
        assert_eq!(window, ChimeWindow { start: Some(6), end: Some(21) });
    }

    #[test]
    fn automatic_without_location_is_open() {
        let mut settings = Settings::from_bits(0);
        settings.set_hourly_chime_start(CHIME_AUTOMATIC);
        settings.set_hourly_chime_end(2); // 23

        let sun = FixedSun(6.0, 18.0);
        let mut snap = snapshot(&settings, 3, 0, &sun);
        snap.location = Location::default();

        assert_eq!(chime_window(&snap), ChimeWindow { start: None, end: Some(23) });
        assert!(chime_due(&snap));
    }

    #[test]
    fn midnight_end_sorts_last() {
        assert_eq!(local_hour(23.0, 1.0, false), Some(0));
        let window = ChimeWindow { start: Some(7), end: Some(24) };
        assert!(window.contains(23));
    }

    #[test]
    fn unusable_sun_times_leave_the_window_open() {
        let mut settings = Settings::from_bits(0);
        settings.set_hourly_chime_start(CHIME_AUTOMATIC);
        settings.set_hourly_chime_end(CHIME_AUTOMATIC);

        for sun in [
            FixedSun(f32::INFINITY, f32::NEG_INFINITY),
            FixedSun(f32::NAN, f32::NAN),
        ] {
            let window = chime_window(&snapshot(&settings, 12, 0, &sun));
            assert_eq!(window, ChimeWindow { start: None, end: None });
        }

        assert_eq!(local_hour(1.0e30, 0.0, false).map(|hour| hour < 24), Some(true));
        assert_eq!(local_hour(-30.0, 0.0, false), Some(18));
    }
}
