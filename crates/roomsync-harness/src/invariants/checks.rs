//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use roomsync_core::TargetTemperature;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// Every target is in range and on the half-degree grid.
pub struct TargetInRange;

impl Invariant for TargetInRange {
    fn name(&self) -> &'static str {
        "TargetInRange"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for room in &state.rooms {
            let in_range =
                (TargetTemperature::MIN..=TargetTemperature::MAX).contains(&room.target);
            let on_grid = (room.target / TargetTemperature::STEP).fract() == 0.0;
            if !in_range || !on_grid {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("room {}: target {} off the grid", room.id, room.target),
                });
            }
        }
        Ok(())
    }
}

/// The list view shows every stored room exactly once, in store order.
///
/// Catches duplicated or reordered rows after reconnects.
pub struct ViewMatchesStore;

impl Invariant for ViewMatchesStore {
    fn name(&self) -> &'static str {
        "ViewMatchesStore"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let stored: Vec<_> = state.rooms.iter().map(|room| &room.id).collect();
        let shown: Vec<_> = state.view_order.iter().collect();
        if stored != shown {
            return Err(Violation {
                invariant: self.name(),
                message: format!("store order {stored:?} but view order {shown:?}"),
            });
        }

        let unique: HashSet<_> = shown.iter().collect();
        if unique.len() != shown.len() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("duplicated rows in {shown:?}"),
            });
        }
        Ok(())
    }
}

/// The AC toggle is disabled exactly when the room is in auto mode, in the
/// list and in the detail view.
pub struct AcLockedInAuto;

impl Invariant for AcLockedInAuto {
    fn name(&self) -> &'static str {
        "AcLockedInAuto"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for room in &state.rooms {
            if let Some(enabled) = room.ac_enabled {
                if enabled == room.auto_mode {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "room {}: auto_mode={} but AC toggle enabled={enabled}",
                            room.id, room.auto_mode
                        ),
                    });
                }
            }
        }

        if let Some(detail) = &state.detail {
            let auto_mode = state.room(&detail.room_id).map_or(detail.auto_mode, |r| r.auto_mode);
            if detail.ac_enabled == auto_mode {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "detail {}: auto_mode={auto_mode} but AC toggle enabled={}",
                        detail.room_id, detail.ac_enabled
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Sensor timestamps never decrease while a sensor stays present.
///
/// A full snapshot may clear a sensor; the next reading after that starts a
/// fresh history and is not compared with the cleared one.
pub struct SensorMonotonicity;

impl Invariant for SensorMonotonicity {
    fn name(&self) -> &'static str {
        "SensorMonotonicity"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (room_id, history) in &state.timestamp_history {
            for window in history.windows(2) {
                for (slot, (before, after)) in window[0].iter().zip(window[1].iter()).enumerate() {
                    let regressed = matches!((before, after), (Some(b), Some(a)) if a < b);
                    if regressed {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "room {room_id} sensor {slot}: timestamp {before:?} → {after:?}"
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use roomsync_core::RoomId;

    use super::*;
    use crate::invariants::RoomObservation;

    fn observation(id: &str, target: f64, auto_mode: bool, ac_enabled: bool) -> RoomObservation {
        RoomObservation {
            id: RoomId::from(id),
            target,
            ac_active: false,
            auto_mode,
            ac_enabled: Some(ac_enabled),
            timestamps: [None; 3],
        }
    }

    #[test]
    fn target_off_grid_detected() {
        let state = SystemSnapshot {
            rooms: vec![observation("a", 21.3, false, true)],
            ..SystemSnapshot::empty()
        };
        assert!(TargetInRange.check(&state).is_err());
    }

    #[test]
    fn duplicated_rows_detected() {
        let state = SystemSnapshot {
            rooms: vec![observation("a", 21.0, false, true)],
            view_order: vec![RoomId::from("a"), RoomId::from("a")],
            ..SystemSnapshot::empty()
        };
        assert!(ViewMatchesStore.check(&state).is_err());
    }

    #[test]
    fn enabled_ac_in_auto_detected() {
        let state = SystemSnapshot {
            rooms: vec![observation("a", 21.0, true, true)],
            view_order: vec![RoomId::from("a")],
            ..SystemSnapshot::empty()
        };
        assert!(AcLockedInAuto.check(&state).is_err());
    }

    #[test]
    fn timestamp_regression_detected() {
        let mut history = HashMap::new();
        history.insert(RoomId::from("a"), vec![[Some(1000), None, None], [Some(900), None, None]]);
        let state = SystemSnapshot::empty().with_history(history);

        assert!(SensorMonotonicity.check(&state).is_err());
    }

    #[test]
    fn cleared_sensor_is_not_a_regression() {
        let mut history = HashMap::new();
        history.insert(RoomId::from("a"), vec![
            [Some(1000), Some(1000), None],
            [None, Some(1000), None],
            [Some(900), Some(1100), None],
        ]);
        let state = SystemSnapshot::empty().with_history(history);

        assert!(SensorMonotonicity.check(&state).is_ok());
    }
}
