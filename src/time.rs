//! Wall clock time as the RTC keeps it.
//!
//! The RTC holds local time. UTC is only needed for astronomical calculations and is derived
//! from the time zone selected in [`Settings`](crate::settings::Settings).

/// Years are stored as an offset from this year
pub const REFERENCE_YEAR: u16 = 2020;

/// UTC offsets in minutes, indexed by `Settings::time_zone`
pub const TIME_ZONE_OFFSETS: [i16; 40] = [
    0, 60, 120, 180, 210, 240, 270, 300, 330, 345, 360, 390, 420, 480, 525, 540, 570, 600, 630,
    660, 720, 765, 780, 825, 840, -60, -120, -150, -180, -210, -240, -300, -360, -420, -480, -540,
    -570, -600, -660, -720,
];

/// Offset from UTC in minutes for a time zone index. Unknown zones are UTC.
pub fn zone_offset_minutes(zone: u8) -> i16 {
    TIME_ZONE_OFFSETS.get(zone as usize).copied().unwrap_or(0)
}

pub fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Days in `month` (1-12) of the full calendar `year`
pub fn days_in_month(month: u8, year: u16) -> u8 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// A calendar date and time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    /// years since [`REFERENCE_YEAR`] (0-63)
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

impl DateTime {
    pub const fn new(year: u8, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Pack into a single word, most significant field first.
    ///
    /// Two packed values compare the same way the times do, and shifting out the low bits drops
    /// the seconds (`>> 6`) or the minutes and seconds (`>> 12`).
    pub const fn pack(&self) -> u32 {
        (self.second as u32 & 0x3F)
            | (self.minute as u32 & 0x3F) << 6
            | (self.hour as u32 & 0x1F) << 12
            | (self.day as u32 & 0x1F) << 17
            | (self.month as u32 & 0x0F) << 22
            | (self.year as u32 & 0x3F) << 26
    }

    pub const fn unpack(word: u32) -> Self {
        Self {
            second: (word & 0x3F) as u8,
            minute: (word >> 6 & 0x3F) as u8,
            hour: (word >> 12 & 0x1F) as u8,
            day: (word >> 17 & 0x1F) as u8,
            month: (word >> 22 & 0x0F) as u8,
            year: (word >> 26 & 0x3F) as u8,
        }
    }

    pub fn full_year(&self) -> u16 {
        REFERENCE_YEAR + self.year as u16
    }

    /// `HH:00:00`
    pub fn is_top_of_hour(&self) -> bool {
        self.minute == 0 && self.second == 0
    }

    /// Convert local time at `offset_minutes` east of UTC to UTC
    pub fn to_utc(self, offset_minutes: i16) -> Self {
        let mut minutes = self.hour as i32 * 60 + self.minute as i32 - offset_minutes as i32;
        let mut date = self;

        while minutes < 0 {
            minutes += 24 * 60;
            date = date.previous_day();
        }
        while minutes >= 24 * 60 {
            minutes -= 24 * 60;
            date = date.next_day();
        }

        date.hour = (minutes / 60) as u8;
        date.minute = (minutes % 60) as u8;
        date
    }

    fn next_day(mut self) -> Self {
        if self.day >= days_in_month(self.month, self.full_year()) {
            self.day = 1;
            if self.month >= 12 {
                self.month = 1;
                self.year = self.year.wrapping_add(1);
            } else {
                self.month += 1;
            }
        } else {
            self.day += 1;
        }
        self
    }

    fn previous_day(mut self) -> Self {
        if self.day <= 1 {
            if self.month <= 1 {
                self.month = 12;
                self.year = self.year.saturating_sub(1);
            } else {
                self.month -= 1;
            }
            self.day = days_in_month(self.month, self.full_year());
        } else {
            self.day -= 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_preserves_fields() {
        let dt = DateTime::new(5, 12, 31, 23, 59, 58);
        assert_eq!(DateTime::unpack(dt.pack()), dt);
    }

    #[test]
    fn packed_seconds_are_the_low_bits() {
        let a = DateTime::new(4, 3, 2, 10, 15, 0);
        let b = DateTime::new(4, 3, 2, 10, 15, 42);
        assert_eq!(a.pack() >> 6, b.pack() >> 6);
        assert!(a.pack() < b.pack());
    }

    #[test]
    fn utc_conversion_crosses_midnight() {
        // 01:30 on 1 March 2024 in UTC+2 is 23:30 on 29 February
        let local = DateTime::new(4, 3, 1, 1, 30, 0);
        let utc = local.to_utc(120);
        assert_eq!(utc, DateTime::new(4, 2, 29, 23, 30, 0));

        // 22:00 on 31 December in UTC-5 is 03:00 on 1 January
        let local = DateTime::new(4, 12, 31, 22, 0, 0);
        assert_eq!(local.to_utc(-300), DateTime::new(5, 1, 1, 3, 0, 0));
    }

    #[test]
    fn unknown_zone_is_utc() {
        assert_eq!(zone_offset_minutes(8), 330);
        assert_eq!(zone_offset_minutes(63), 0);
    }
}
