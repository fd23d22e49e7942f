//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture what the store holds and what the views show at a
//! point in time. Invariants operate on snapshots rather than live state to
//! ensure consistent, atomic checks.

use std::collections::HashMap;

use roomsync_app::App;
use roomsync_core::{RoomId, SensorKind, Timepoint};

/// Newest timestamp per sensor, in [`SensorKind::ALL`] order.
pub type SensorTimestamps = [Option<u64>; 3];

/// Snapshot of the whole client.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Rooms in store order.
    pub rooms: Vec<RoomObservation>,
    /// Room ids of the list view, in display order.
    pub view_order: Vec<RoomId>,
    /// Open detail view, if any.
    pub detail: Option<DetailObservation>,
    /// Sensor timestamps observed over time, per room (for monotonicity
    /// checks).
    pub timestamp_history: HashMap<RoomId, Vec<SensorTimestamps>>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no rooms).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the observable state of `app`.
    pub fn from_app<I: Timepoint>(app: &App<I>) -> Self {
        let views = app.views();
        let rooms = app
            .store()
            .get_all()
            .iter()
            .map(|room| RoomObservation {
                id: room.id.clone(),
                target: room.target_temperature.celsius(),
                ac_active: room.ac_active,
                auto_mode: room.auto_mode,
                ac_enabled: views.row(&room.id).map(|row| row.ac.enabled),
                timestamps: SensorKind::ALL.map(|kind| room.sensor(kind).map(|r| r.timestamp)),
            })
            .collect();
        let detail = views.detail().map(|detail| DetailObservation {
            room_id: detail.room_id.clone(),
            ac_enabled: detail.ac.enabled,
            auto_mode: detail.auto_mode.on,
        });

        Self {
            rooms,
            view_order: views.rows().iter().map(|row| row.room_id.clone()).collect(),
            detail,
            timestamp_history: HashMap::new(),
        }
    }

    /// Attach the timestamp history gathered so far.
    #[must_use]
    pub fn with_history(mut self, history: HashMap<RoomId, Vec<SensorTimestamps>>) -> Self {
        self.timestamp_history = history;
        self
    }

    /// Room by id.
    pub fn room(&self, id: &RoomId) -> Option<&RoomObservation> {
        self.rooms.iter().find(|room| &room.id == id)
    }
}

/// Observable state of one room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomObservation {
    /// Room id.
    pub id: RoomId,
    /// Target in °C.
    pub target: f64,
    /// AC running.
    pub ac_active: bool,
    /// Auto mode on.
    pub auto_mode: bool,
    /// Whether the list row lets the user flip the AC. `None` if the room has
    /// no row yet.
    pub ac_enabled: Option<bool>,
    /// Newest sensor timestamps.
    pub timestamps: SensorTimestamps,
}

/// Observable state of the open detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailObservation {
    /// Room shown.
    pub room_id: RoomId,
    /// Whether the AC toggle is enabled.
    pub ac_enabled: bool,
    /// Auto mode as shown.
    pub auto_mode: bool,
}
