pub mod segment;

use crate::system::{PinMask, System};
use crate::{wait_for, Timeout};
use self::segment::{glyph, Segments, BLANK, DIGITS};
use stm32l0::stm32l0x3::{GPIOA, GPIOB, LCD, SYSCFG};

/// Pins driven by the LCD controller: COM0-2 on PA8-10, the segments on the rest
pub const PINS: PinMask = PinMask {
    a: (1 << 3) | (1 << 6) | (1 << 7) | (1 << 8) | (1 << 9) | (1 << 10) | (1 << 15),
    b: (1 << 0)
        | (1 << 1)
        | (1 << 2)
        | (1 << 3)
        | (1 << 4)
        | (1 << 5)
        | (1 << 8)
        | (0b11_1111 << 10),
    c: 0,
};

// LCD_SR
const SR_ENS: u32 = 1 << 0;

/// Liquid crystal display
///
/// Keeps a copy of the displayed frame so individual digits can be rewritten without clobbering
/// the rest.
pub struct Lcd {
    lcd: LCD,
    frame: Segments,
}

impl Lcd {
    /// Configure the LCD
    pub fn configure(
        lcd: LCD,
        sys: &mut System,
        syscfg: &mut SYSCFG,
        gpioa: &mut GPIOA,
        gpiob: &mut GPIOB,
    ) -> Self {
        sys.enable_lcd_clk();

        // Configure comm pins
        gpioa
            .afrh
            .modify(|_, w| w.afsel8().af1().afsel9().af1().afsel10().af1());

        // Configure segment pins
        gpioa
            .afrl
            .modify(|_, w| w.afsel3().af1().afsel6().af1().afsel7().af1());

        gpioa.afrh.modify(|_, w| w.afsel15().af1());

        gpiob.afrl.modify(|_, w| {
            w.afsel0()
                .af1()
                .afsel1()
                .af1()
                .afsel3()
                .af1()
                .afsel4()
                .af1()
                .afsel5()
                .af1()
        });

        gpiob.afrh.modify(|_, w| {
            w.afsel8()
                .af1()
                .afsel10()
                .af1()
                .afsel11()
                .af1()
                .afsel12()
                .af1()
                .afsel13()
                .af1()
                .afsel14()
                .af1()
                .afsel15()
                .af1()
        });

        // Enable VLCD2 decouple capacitor on PB2
        syscfg
            .cfgr2
            .modify(|r, w| unsafe { w.bits((r.bits() & !(0x1F << 1)) | (1 << 1)) });

        // Configure the LCD frame control register
        //
        // * Set the frame rate to 31.03 Hz
        // * Set the LCD voltage to 3.12v
        // * Set pulse duration to 1/clk_pos
        lcd.fcr
            .write(|w| unsafe { w.ps().bits(4).div().bits(6).cc().bits(4).pon().bits(1) });

        // Configure the LCD control register
        //
        // * Set bias to 1/2
        // * Set duty to 1/3
        // * Use internal voltage source
        // * Enable LCD module
        lcd.cr.write(|w| unsafe {
            w.bias()
                .bits(0b001)
                .duty()
                .bits(0b010)
                .vsel()
                .clear_bit()
                .lcden()
                .set_bit()
        });

        Self { lcd, frame: BLANK }
    }

    /// Write segments to the LCD
    pub fn write(&mut self, seg: Segments) {
        const MASK: u128 = u32::MAX as u128;

        self.frame = seg;

        // This is safe assuming that Segments has been correctly created
        unsafe {
            self.lcd.ram_com0.as_ptr().write((seg & MASK) as u32);
            self.lcd.ram_com1.as_ptr().write((seg >> 32 & MASK) as u32);
            self.lcd.ram_com2.as_ptr().write((seg >> 64 & MASK) as u32);
        }

        // Trigger a display update
        self.lcd.sr.modify(|_, w| w.udr().set_bit());
    }

    /// Render `text` starting at `digit`, one character per digit. Characters past the last digit
    /// are dropped.
    pub fn show(&mut self, digit: usize, text: &str) {
        let mut frame = self.frame;

        for (position, ch) in (digit..DIGITS).zip(text.chars()) {
            frame &= !glyph(position, '8');
            frame |= glyph(position, ch);
        }

        self.write(frame);
    }

    /// Blank every segment
    pub fn clear(&mut self) {
        self.write(BLANK);
    }

    /// Whether the controller is driving the glass
    pub fn is_enabled(&self) -> bool {
        self.lcd.sr.read().bits() & SR_ENS != 0
    }

    /// Switch the controller off and gate its clock
    pub fn disable(&mut self, sys: &mut System) -> Result<(), Timeout> {
        self.lcd.cr.modify(|_, w| w.lcden().clear_bit());
        wait_for(|| self.lcd.sr.read().bits() & SR_ENS == 0)?;

        sys.disable_lcd_clk();

        Ok(())
    }
}
