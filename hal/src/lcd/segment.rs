//! https://www.sensorwatch.net/docs/wig/display/
//!
//! Each of the six seven segment digits is made from segments `A` through `G`:
//!
//! ```txt
//!  AAA
//! F   B
//!  GGG
//! E   C
//!  DDD
//! ```
//!
//! On digits 0 and 2 the `A` and `D` segments share an LCD pin, so lighting one lights both.

/// The segments are stored in a 96 bit integer, 32 bits for each common line
///
/// # Memory map
///
/// ```txt
///       ----------
/// 0x60 | u32 COM2 |
///      | u32 COM1 |
/// 0x00 | u32 COM0 |
///       ----------
/// ```
pub type Segments = u128;

/// Convert an LCD segment pin number to an MCU LCD segment number
const fn lcd_to_mcu(seg: usize) -> usize {
    match seg {
        0 => 16,
        1 => 9,
        2 => 8,
        3 => 7,
        4 => 17,
        5 => 2,
        6 => 15,
        7 => 14,
        13 => 13,
        17 => 12,
        18 => 11,
        19 => 10,
        20 => 6,
        21 => 5,
        22 => 4,
        23 => 3,
        _ => panic!("Invalid segment number"),
    }
}

/// Create a segment from an LCD common and segment line
const fn build_segment(com: usize, seg: usize) -> Segments {
    1 << (lcd_to_mcu(seg) + (com * 32))
}

macro_rules! digits {
    ($($name:ident => [$(($com:literal, $seg:literal)),*]),*) => {
        $(
            const $name: [Segments; 7] = [$(build_segment($com, $seg)),*];
        )*
    };
}

/// Turn off all segments
pub const BLANK: Segments = 0;

/// Number of digits on the display
pub const DIGITS: usize = 6;

// 7 segment displays are numbered left (hours) to right (seconds), 0 to 5. Segments are listed
// A through G.
digits! {
    D0 => [(1, 5), (0, 4), (2, 4), (1, 5), (2, 5), (0, 5), (1, 4)],
    D1 => [(0, 3), (0, 2), (1, 2), (2, 2), (2, 3), (1, 6), (1, 3)],
    D2 => [(2, 1), (0, 0), (2, 0), (2, 1), (1, 1), (0, 1), (1, 0)],
    D3 => [(0, 22), (0, 13), (2, 22), (2, 23), (1, 23), (0, 23), (1, 22)],
    D4 => [(0, 21), (0, 20), (2, 19), (2, 20), (2, 21), (1, 21), (1, 20)],
    D5 => [(0, 19), (0, 18), (1, 17), (2, 17), (2, 18), (1, 19), (1, 18)]
}

const DIGIT_SEGMENTS: [[Segments; 7]; DIGITS] = [D0, D1, D2, D3, D4, D5];

/// Segments lit for a character, bit 0 is `A` through bit 6 `G`
const fn pattern(ch: char) -> u8 {
    match ch {
        '0' | 'O' => 0b011_1111,
        '1' => 0b000_0110,
        '2' => 0b101_1011,
        '3' => 0b100_1111,
        '4' => 0b110_0110,
        '5' | 'S' => 0b110_1101,
        '6' => 0b111_1101,
        '7' => 0b000_0111,
        '8' => 0b111_1111,
        '9' => 0b110_1111,
        '-' => 0b100_0000,
        'A' => 0b111_0111,
        'B' | 'b' => 0b111_1100,
        'C' => 0b011_1001,
        'D' | 'd' => 0b101_1110,
        'E' => 0b111_1001,
        'F' => 0b111_0001,
        'H' => 0b111_0110,
        'I' => 0b000_0110,
        'L' => 0b011_1000,
        // No diagonal segments, M reads as n
        'M' | 'N' | 'n' => 0b101_0100,
        'P' => 0b111_0011,
        'R' | 'r' => 0b101_0000,
        'T' | 't' => 0b111_1000,
        'U' => 0b011_1110,
        'Y' => 0b110_1110,
        'Z' => 0b101_1011,
        _ => 0,
    }
}

/// The segments for `ch` on digit `digit`. Unknown characters and digits are blank.
pub const fn glyph(digit: usize, ch: char) -> Segments {
    if digit >= DIGITS {
        return BLANK;
    }

    let bits = pattern(ch);
    let mut segments = BLANK;
    let mut seg = 0;
    while seg < 7 {
        if bits & (1 << seg) != 0 {
            segments |= DIGIT_SEGMENTS[digit][seg];
        }
        seg += 1;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_lights_two_segments() {
        assert_eq!(glyph(1, '1').count_ones(), 2);
    }

    #[test]
    fn unknown_is_blank() {
        assert_eq!(glyph(3, '?'), BLANK);
        assert_eq!(glyph(DIGITS, '8'), BLANK);
    }
}
