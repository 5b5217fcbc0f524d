//! Backup Persistence Store
//!
//! A handful of 32 bit registers that survive reset, STOP and STANDBY but not the cell being
//! pulled. Slot roles are fixed:
//!
//! | slot | contents |
//! |------|----------|
//! | 0 | [`Settings`](crate::settings::Settings) |
//! | 1 | [`Location`](crate::settings::Location) |
//! | 2 | [`ReferenceDate`](crate::settings::ReferenceDate) |
//! | 3 | free |
//!
//! Slot indices are checked on every access. Stores outside the register file are dropped and
//! loads read zero.

pub const SETTINGS_SLOT: usize = 0;
pub const LOCATION_SLOT: usize = 1;
pub const REFERENCE_DATE_SLOT: usize = 2;

/// Raw access to battery backed registers
///
/// Implementations may assume `index < self.count()`.
pub trait BackupRegisters {
    /// Number of registers available to the kernel
    fn count(&self) -> usize;
    fn read_raw(&self, index: usize) -> u32;
    fn write_raw(&mut self, index: usize, value: u32);
}

/// Bounds checked slot access, available on every [`BackupRegisters`]
pub trait BackupStore: BackupRegisters {
    /// Write `value` to `slot`. Out of range slots are ignored.
    fn store(&mut self, slot: usize, value: u32) {
        if slot < self.count() {
            self.write_raw(slot, value);
        } else {
            warn!("store to missing backup slot {}", slot);
        }
    }

    /// Read `slot`. Out of range slots read as zero.
    fn load(&self, slot: usize) -> u32 {
        if slot < self.count() {
            self.read_raw(slot)
        } else {
            0
        }
    }
}

impl<T: BackupRegisters + ?Sized> BackupStore for T {}

/// Registers held in RAM
///
/// Stands in for the RTC domain where there is none, so nothing here survives a real reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamRegisters<const N: usize>([u32; N]);

impl<const N: usize> RamRegisters<N> {
    pub const fn new() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> Default for RamRegisters<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BackupRegisters for RamRegisters<N> {
    fn count(&self) -> usize {
        N
    }

    fn read_raw(&self, index: usize) -> u32 {
        self.0[index]
    }

    fn write_raw(&mut self, index: usize, value: u32) {
        self.0[index] = value;
    }
}
