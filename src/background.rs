//! Background Task Coordinator
//!
//! Runs at the top of every minute. In active mode only the face on screen is asked whether it
//! has work due; in low energy mode every face is asked, in registry order, and each one that
//! answers yes gets its own `BackgroundTask` event.

use crate::chime::Snapshot;
use crate::face::Face;
use crate::power::PowerMode;
use heapless::Vec;

/// Indices of the faces with background work due, in the order they should run
pub fn due<const N: usize>(
    faces: &[&mut dyn Face; N],
    active: usize,
    mode: PowerMode,
    snapshot: &Snapshot<'_>,
) -> Vec<usize, N> {
    let mut due = Vec::new();

    match mode {
        PowerMode::LowEnergy => {
            for (index, face) in faces.iter().enumerate() {
                if face.wants_background_task(snapshot) {
                    // Capacity is N, one slot per face
                    let _ = due.push(index);
                }
            }
        }
        _ => {
            if let Some(face) = faces.get(active) {
                if face.wants_background_task(snapshot) {
                    let _ = due.push(active);
                }
            }
        }
    }

    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chime::NoSunTimes;
    use crate::event::Event;
    use crate::face::FaceContext;
    use crate::settings::{Location, Settings};
    use crate::time::DateTime;

    struct Wants(bool);

    impl Face for Wants {
        fn activate(&mut self, _: &mut FaceContext<'_>) {}

        fn handle(&mut self, _: Event, _: &mut FaceContext<'_>) -> bool {
            true
        }

        fn wants_background_task(&self, _: &Snapshot<'_>) -> bool {
            self.0
        }
    }

    struct Silent;

    impl Face for Silent {
        fn activate(&mut self, _: &mut FaceContext<'_>) {}

        fn handle(&mut self, _: Event, _: &mut FaceContext<'_>) -> bool {
            true
        }
    }

    #[test]
    fn active_mode_polls_only_the_active_face() {
        let settings = Settings::default();
        let snapshot = Snapshot {
            settings: &settings,
            now: DateTime::new(4, 1, 1, 12, 0, 0),
            location: Location::default(),
            sun: &NoSunTimes,
        };
        let (mut a, mut b, mut c) = (Wants(true), Silent, Wants(true));
        let faces: [&mut dyn Face; 3] = [&mut a, &mut b, &mut c];

        assert_eq!(due(&faces, 1, PowerMode::Active, &snapshot).as_slice(), &[] as &[usize]);
        assert_eq!(due(&faces, 2, PowerMode::Active, &snapshot).as_slice(), &[2]);
        assert_eq!(due(&faces, 0, PowerMode::LowEnergy, &snapshot).as_slice(), &[0, 2]);
    }
}
