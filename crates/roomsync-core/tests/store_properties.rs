//! Property-based tests for the room store merge policy.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use proptest::prelude::*;
use roomsync_core::{
    RoomId, RoomPatch, RoomSnapshot, RoomStateStore, SensorKind, SensorReading, TargetTemperature,
    Update,
};

const ROOMS: [&str; 4] = ["lounge", "kitchen", "office", "attic"];

fn reading_strategy() -> impl Strategy<Value = Option<(f64, u64)>> {
    prop::option::of((-20.0f64..50.0, 0u64..100))
}

fn snapshot_strategy() -> impl Strategy<Value = (usize, RoomSnapshot)> {
    (
        0..ROOMS.len(),
        reading_strategy(),
        reading_strategy(),
        reading_strategy(),
        10.0f64..35.0,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(room, temperature, humidity, pressure, target, ac_active, auto_mode)| {
            let reading = |r: Option<(f64, u64)>, unit: &str| {
                r.map(|(value, ts)| SensorReading::new(value, unit, ts))
            };
            (
                room,
                RoomSnapshot {
                    temperature: reading(temperature, "°C"),
                    humidity: reading(humidity, "%"),
                    pressure: reading(pressure, "hPa"),
                    target_temperature: TargetTemperature::new(target),
                    ac_active,
                    auto_mode,
                },
            )
        })
}

proptest! {
    /// With every snapshot carrying every sensor, the stored reading is the
    /// last one among those sharing the greatest timestamp.
    #[test]
    fn prop_sensor_keeps_greatest_timestamp(
        readings in prop::collection::vec((0..ROOMS.len(), -20.0f64..50.0, 0u64..50), 1..40)
    ) {
        let mut store = RoomStateStore::new();
        let mut expected: HashMap<usize, (u64, f64)> = HashMap::new();

        for (room, value, ts) in readings {
            let snapshot = RoomSnapshot {
                temperature: Some(SensorReading::new(value, "°C", ts)),
                humidity: None,
                pressure: None,
                target_temperature: TargetTemperature::DEFAULT,
                ac_active: false,
                auto_mode: false,
            };
            store.apply_full(RoomId::from(ROOMS[room]), snapshot);

            let entry = expected.entry(room).or_insert((ts, value));
            if ts >= entry.0 {
                *entry = (ts, value);
            }
        }

        for (room, (ts, value)) in expected {
            let stored = store.get(ROOMS[room]).and_then(|r| r.sensor(SensorKind::Temperature).cloned());
            prop_assert_eq!(stored.map(|r| (r.timestamp, r.value)), Some((ts, value)));
        }
    }

    /// Timestamps never go backwards, whatever mix of full and partial
    /// updates arrives.
    #[test]
    fn prop_timestamps_monotonic(
        updates in prop::collection::vec((snapshot_strategy(), any::<bool>()), 1..40)
    ) {
        let mut store = RoomStateStore::new();

        for ((room, snapshot), partial) in updates {
            let id = RoomId::from(ROOMS[room]);
            let before = store.get(id.as_str()).cloned();

            let update = if partial && before.is_some() {
                Update::Partial(RoomPatch {
                    temperature: snapshot.temperature.clone(),
                    humidity: snapshot.humidity.clone(),
                    pressure: snapshot.pressure.clone(),
                    ..RoomPatch::default()
                })
            } else {
                Update::Full(snapshot.clone())
            };
            store.apply_snapshot(id.clone(), update).unwrap();

            let after = store.get(id.as_str()).unwrap();
            if let Some(before) = before {
                for kind in SensorKind::ALL {
                    let incoming = match kind {
                        SensorKind::Temperature => &snapshot.temperature,
                        SensorKind::Humidity => &snapshot.humidity,
                        SensorKind::Pressure => &snapshot.pressure,
                    };
                    // Only a full snapshot without the sensor may clear it.
                    if let (Some(old), Some(new)) = (before.sensor(kind), after.sensor(kind)) {
                        prop_assert!(new.timestamp >= old.timestamp);
                    }
                    if partial && incoming.is_none() {
                        prop_assert_eq!(before.sensor(kind), after.sensor(kind));
                    }
                }
            }
        }
    }

    /// Display order is first-appearance order, no duplicates, no reordering.
    #[test]
    fn prop_order_is_first_appearance(
        snapshots in prop::collection::vec(snapshot_strategy(), 1..40)
    ) {
        let mut store = RoomStateStore::new();
        let mut first_seen: Vec<&str> = Vec::new();

        for (room, snapshot) in snapshots {
            if !first_seen.contains(&ROOMS[room]) {
                first_seen.push(ROOMS[room]);
            }
            store.apply_full(RoomId::from(ROOMS[room]), snapshot);

            let all = store.get_all();
            let ids: Vec<&str> = all.ids().iter().map(RoomId::as_str).collect();
            prop_assert_eq!(&ids, &first_seen);
        }
    }

    /// Controllable fields always mirror the latest full snapshot.
    #[test]
    fn prop_controls_follow_latest_snapshot(
        snapshots in prop::collection::vec(snapshot_strategy(), 1..20)
    ) {
        let mut store = RoomStateStore::new();
        let mut latest: HashMap<usize, RoomSnapshot> = HashMap::new();

        for (room, snapshot) in snapshots {
            store.apply_full(RoomId::from(ROOMS[room]), snapshot.clone());
            latest.insert(room, snapshot);
        }

        for (room, snapshot) in latest {
            let stored = store.get(ROOMS[room]).unwrap();
            prop_assert_eq!(stored.target_temperature, snapshot.target_temperature);
            prop_assert_eq!(stored.ac_active, snapshot.ac_active);
            prop_assert_eq!(stored.auto_mode, snapshot.auto_mode);
        }
    }
}
