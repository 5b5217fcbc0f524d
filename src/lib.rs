//! # Movement
//!
//! The kernel of a low power watch: a cooperative scheduler that hands events to a ring of
//! watch faces, and the power management underneath it.
//!
//! ---
//!
//! Everything runs on one thread. Interrupts only set flags in [`irq::InterruptFlags`]; the
//! [`Movement`] loop picks them up, turns them into [`Event`]s for the active [`Face`] and goes
//! back to sleep. Faces never run in interrupt context.
//!
//! The deepest power states lose RAM and come back through a reset, so anything that must
//! survive lives in the battery backed registers behind [`backup::BackupStore`], and
//! [`Movement::boot`] rebuilds the kernel from them on every start.
//!
//! The hardware is reached through the traits in [`board`]. With the `firmware` feature the
//! crate also builds the STM32L0 board on top of `watch-hal` and the firmware binary.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod backup;
pub mod background;
pub mod board;
pub mod chime;
pub mod error;
pub mod event;
pub mod face;
pub mod faces;
pub mod irq;
pub mod movement;
pub mod power;
pub mod settings;
pub mod time;
pub mod wake;

#[cfg(feature = "firmware")]
pub mod stm32;

pub use board::Board;
pub use error::Fault;
pub use event::{Button, Event, EventKind, Gesture};
pub use face::{Face, FaceContext};
pub use movement::{Config, Movement};
pub use settings::Settings;
pub use time::DateTime;
