use core::fmt;

/// Conditions the kernel cannot recover from in-band.
///
/// Every fault ends in a reset, see [`crate::movement::fatal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// The RTC never acknowledged being disabled or re-enabled around a wake source change
    WakeSync,
    /// The tick or alarm hardware never acknowledged a reconfiguration
    TickSync,
    /// The display controller never acknowledged being powered down
    DisplaySync,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::WakeSync => write!(f, "wake source configuration did not synchronise"),
            Fault::TickSync => write!(f, "tick source did not synchronise"),
            Fault::DisplaySync => write!(f, "display did not power down"),
        }
    }
}

/// Upper bound on polls of a hardware acknowledgement before it is treated as stuck
pub const SYNC_SPIN_LIMIT: u32 = 100_000;

/// Poll `ready` until it holds, failing with `fault` after [`SYNC_SPIN_LIMIT`] attempts
pub(crate) fn spin_until(mut ready: impl FnMut() -> bool, fault: Fault) -> Result<(), Fault> {
    for _ in 0..SYNC_SPIN_LIMIT {
        if ready() {
            return Ok(());
        }
    }

    Err(fault)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuck_hardware_faults() {
        assert_eq!(spin_until(|| false, Fault::WakeSync), Err(Fault::WakeSync));
    }

    #[test]
    fn late_acknowledgement_is_accepted() {
        let mut polls = 0;
        let result = spin_until(
            || {
                polls += 1;
                polls == 10
            },
            Fault::TickSync,
        );
        assert_eq!(result, Ok(()));
        assert_eq!(polls, 10);
    }
}
