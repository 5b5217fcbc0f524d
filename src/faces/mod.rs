//! Faces that ship with the kernel.

mod clock;
mod set_time;

pub use clock::{ClockFace, LOW_BATTERY_MILLIVOLTS};
pub use set_time::SetTimeFace;
