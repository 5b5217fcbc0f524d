//! Persisted user configuration.
//!
//! Every value here is a plain 32 bit word that lives in a backup register. There is no
//! checksum or version, so any bit pattern must decode to something usable; each field's
//! accessor is total over its bit width and the lookup tables cover every index.

/// Timeout before a secondary face gives way to the primary one, indexed by `to_interval`
pub const TIMEOUT_SECONDS: [u32; 4] = [60, 120, 300, 1800];

/// Inactivity before low energy mode, indexed by `le_interval`. Zero means never.
pub const LOW_ENERGY_SECONDS: [u32; 8] = [
    0,
    10 * 60,
    60 * 60,
    2 * 60 * 60,
    6 * 60 * 60,
    12 * 60 * 60,
    24 * 60 * 60,
    7 * 24 * 60 * 60,
];

/// First chiming hour, indexed by `hourly_chime_start`. Index 3 follows sunrise.
pub const HOURLY_CHIME_START: [u8; 3] = [7, 8, 9];

/// First silent hour, indexed by `hourly_chime_end`. Index 3 follows sunset.
pub const HOURLY_CHIME_END: [u8; 3] = [21, 22, 23];

/// Chime window index that tracks the sun
pub const CHIME_AUTOMATIC: u8 = 3;

macro_rules! flags {
    ($( $(#[$doc:meta])* $get:ident, $set:ident = $bit:literal; )*) => {
        $(
            $(#[$doc])*
            pub const fn $get(&self) -> bool {
                self.0 & (1 << $bit) != 0
            }

            pub fn $set(&mut self, value: bool) {
                if value {
                    self.0 |= 1 << $bit;
                } else {
                    self.0 &= !(1 << $bit);
                }
            }
        )*
    };
}

macro_rules! fields {
    ($( $(#[$doc:meta])* $get:ident, $set:ident = $shift:literal, $width:literal; )*) => {
        $(
            $(#[$doc])*
            pub const fn $get(&self) -> u8 {
                ((self.0 >> $shift) & ((1 << $width) - 1)) as u8
            }

            /// Bits beyond the field width are dropped
            pub fn $set(&mut self, value: u8) {
                let mask: u32 = ((1 << $width) - 1) << $shift;
                self.0 = (self.0 & !mask) | ((value as u32) << $shift & mask);
            }
        )*
    };
}

/// Global watch settings, backup slot 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings(u32);

impl Settings {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    flags! {
        /// Beep on Mode button presses
        button_should_sound, set_button_should_sound = 0;
        /// Deliver timeouts to the primary face too
        to_always, set_to_always = 3;
        clock_mode_24h, set_clock_mode_24h = 24;
        /// Alarm button up on a clock face toggles 12/24 h
        clock_mode_toggle, set_clock_mode_toggle = 25;
        alarm_enabled, set_alarm_enabled = 26;
        /// Chime every hour regardless of the chime window
        hourly_chime_always, set_hourly_chime_always = 31;
    }

    fields! {
        /// Index into [`TIMEOUT_SECONDS`]
        to_interval, set_to_interval = 1, 2;
        /// Index into [`LOW_ENERGY_SECONDS`]
        le_interval, set_le_interval = 4, 3;
        /// LED on time in seconds, 0 disables the LED
        led_duration, set_led_duration = 7, 3;
        led_red, set_led_red = 10, 4;
        led_green, set_led_green = 14, 4;
        /// Index into [`TIME_ZONE_OFFSETS`](crate::time::TIME_ZONE_OFFSETS)
        time_zone, set_time_zone = 18, 6;
        /// Index into [`HOURLY_CHIME_START`] or [`CHIME_AUTOMATIC`]
        hourly_chime_start, set_hourly_chime_start = 27, 2;
        /// Index into [`HOURLY_CHIME_END`] or [`CHIME_AUTOMATIC`]
        hourly_chime_end, set_hourly_chime_end = 29, 2;
    }

    pub fn timeout_seconds(&self) -> u32 {
        TIMEOUT_SECONDS[self.to_interval() as usize]
    }

    /// `None` when low energy mode is disabled
    pub fn low_energy_seconds(&self) -> Option<u32> {
        match LOW_ENERGY_SECONDS[self.le_interval() as usize] {
            0 => None,
            seconds => Some(seconds),
        }
    }

    /// UTC offset of the selected zone in minutes
    pub fn zone_offset_minutes(&self) -> i16 {
        crate::time::zone_offset_minutes(self.time_zone())
    }
}

impl Default for Settings {
    /// Used on first boot, when slot 0 reads zero
    fn default() -> Self {
        let mut settings = Settings(0);
        settings.set_button_should_sound(true);
        settings.set_to_interval(1);
        settings.set_le_interval(2);
        settings.set_led_duration(1);
        settings.set_led_green(0xF);
        settings.set_clock_mode_toggle(true);
        settings.set_hourly_chime_start(0);
        settings.set_hourly_chime_end(1);
        settings
    }
}

/// Observer location for sunrise and sunset, backup slot 1
///
/// Latitude in the high half, longitude in the low half, both in hundredths of a degree. Zero
/// means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Location(u32);

impl Location {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn new(latitude: i16, longitude: i16) -> Self {
        Self((latitude as u16 as u32) << 16 | longitude as u16 as u32)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_set(&self) -> bool {
        self.0 != 0
    }

    /// Hundredths of a degree, north positive
    pub const fn latitude(&self) -> i16 {
        (self.0 >> 16) as u16 as i16
    }

    /// Hundredths of a degree, east positive
    pub const fn longitude(&self) -> i16 {
        self.0 as u16 as i16
    }
}

/// A remembered calendar date, backup slot 2
///
/// Faces use this to mark a special occasion. Zero means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReferenceDate(u32);

impl ReferenceDate {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self((year as u32) << 16 | (month as u32) << 8 | day as u32)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn year(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn month(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn day(&self) -> u8 {
        self.0 as u8
    }
}
