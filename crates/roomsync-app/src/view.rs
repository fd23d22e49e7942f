//! View models bound to the room store.
//!
//! [`ViewBinder`] subscribes to store changes and keeps one [`RoomView`] per
//! room for the list, an optional [`DetailView`] for the open room, and the
//! [`DashboardStats`] header. Frontends draw these models; they never read
//! the store directly.
//!
//! # Invariants
//!
//! - A room's `view_id` is assigned on first appearance and never changes.
//! - Only rooms named in a change notification are re-rendered.
//! - The AC toggle is disabled whenever the room is in auto mode, on every
//!   rendering path.

use std::collections::HashMap;

use roomsync_core::{ChangeSet, RoomId, RoomState, RoomStateStore, SensorKind, SensorReading};
use tokio::sync::mpsc;

/// Placeholder for a missing reading.
pub const MISSING_VALUE: &str = "N/A";

/// Placeholder for a mean over zero rooms.
pub const MISSING_MEAN: &str = "--";

/// Shown when a room has never reported.
pub const NEVER_UPDATED: &str = "never";

/// State of an on/off control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleView {
    /// Current value.
    pub on: bool,
    /// Whether the user may flip it.
    pub enabled: bool,
}

/// One row of the room list.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomView {
    /// Stable identity of this row.
    pub view_id: u64,
    /// Room shown.
    pub room_id: RoomId,
    /// Display title.
    pub title: String,
    /// Formatted temperature or [`MISSING_VALUE`].
    pub temperature: String,
    /// Formatted humidity or [`MISSING_VALUE`].
    pub humidity: String,
    /// Formatted pressure; `None` hides the row.
    pub pressure: Option<String>,
    /// Formatted target.
    pub target: String,
    /// Air-conditioning toggle.
    pub ac: ToggleView,
    /// Auto-mode toggle.
    pub auto_mode: ToggleView,
    /// Time of the newest reading, or [`NEVER_UPDATED`].
    pub last_update: String,
    /// Times this row was rendered.
    pub revision: u64,
}

/// One sensor line of the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorLine {
    /// Sensor label.
    pub label: &'static str,
    /// Formatted value or [`MISSING_VALUE`].
    pub value: String,
    /// Time of the reading, or [`NEVER_UPDATED`].
    pub updated: String,
}

/// Expanded view of a single room.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    /// Room shown.
    pub room_id: RoomId,
    /// Display title.
    pub title: String,
    /// Sensor lines; pressure only if the room has it.
    pub sensors: Vec<SensorLine>,
    /// Formatted target.
    pub target: String,
    /// Air-conditioning toggle.
    pub ac: ToggleView,
    /// Auto-mode toggle.
    pub auto_mode: ToggleView,
    /// Times this detail was rendered.
    pub revision: u64,
}

/// Aggregates across all rooms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DashboardStats {
    /// Number of rooms.
    pub room_count: usize,
    /// Rooms with AC running.
    pub ac_active_count: usize,
    /// Mean temperature over rooms reporting one.
    pub mean_temperature: Option<f64>,
}

impl DashboardStats {
    /// Compute from the whole store.
    pub fn from_store(store: &RoomStateStore) -> Self {
        let rooms = store.get_all();
        let temperatures: Vec<f64> =
            rooms.iter().filter_map(|room| room.temperature.as_ref().map(|t| t.value)).collect();
        let mean_temperature = (!temperatures.is_empty())
            .then(|| temperatures.iter().sum::<f64>() / temperatures.len() as f64);

        Self {
            room_count: rooms.len(),
            ac_active_count: rooms.iter().filter(|room| room.ac_active).count(),
            mean_temperature,
        }
    }

    /// Mean formatted to one decimal, or [`MISSING_MEAN`].
    pub fn mean_label(&self) -> String {
        self.mean_temperature.map_or_else(|| MISSING_MEAN.to_owned(), |t| format!("{t:.1}°C"))
    }
}

/// What one [`ViewBinder::sync`] call re-rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Rows created, in order.
    pub created: Vec<RoomId>,
    /// Rows updated in place.
    pub updated: Vec<RoomId>,
    /// Whether the detail view was re-rendered.
    pub detail_rendered: bool,
}

impl RenderReport {
    /// Whether nothing was rendered.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && !self.detail_rendered
    }
}

/// Keeps view models in step with the store.
#[derive(Debug)]
pub struct ViewBinder {
    changes: mpsc::UnboundedReceiver<ChangeSet>,
    rows: Vec<RoomView>,
    index: HashMap<RoomId, usize>,
    next_view_id: u64,
    detail: Option<DetailView>,
    stats: DashboardStats,
}

impl ViewBinder {
    /// Subscribe to `store` and start with an empty view.
    pub fn attach(store: &mut RoomStateStore) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        store.subscribe(move |changes: &ChangeSet| {
            // Receiver dropped means the binder is gone; nothing to do.
            let _ = tx.send(changes.clone());
        });

        Self {
            changes: rx,
            rows: Vec::new(),
            index: HashMap::new(),
            next_view_id: 1,
            detail: None,
            stats: DashboardStats::default(),
        }
    }

    /// Re-render everything the store reported as changed since the last
    /// call.
    pub fn sync(&mut self, store: &RoomStateStore) -> RenderReport {
        let mut changed = ChangeSet::new();
        while let Ok(changes) = self.changes.try_recv() {
            changed.extend(changes);
        }

        let mut report = RenderReport::default();
        if changed.is_empty() {
            return report;
        }

        for id in changed.iter() {
            let Some(room) = store.get(id.as_str()) else {
                continue;
            };
            match self.index.get(id) {
                Some(&position) => {
                    let row = &mut self.rows[position];
                    let revision = row.revision + 1;
                    *row = render_row(room, row.view_id, revision);
                    report.updated.push(id.clone());
                },
                None => {
                    let view_id = self.next_view_id;
                    self.next_view_id += 1;
                    self.index.insert(id.clone(), self.rows.len());
                    self.rows.push(render_row(room, view_id, 1));
                    report.created.push(id.clone());
                },
            }
        }

        if let Some(detail) = &mut self.detail {
            if changed.contains(detail.room_id.as_str()) {
                if let Some(room) = store.get(detail.room_id.as_str()) {
                    *detail = render_detail(room, detail.revision + 1);
                    report.detail_rendered = true;
                }
            }
        }

        self.stats = DashboardStats::from_store(store);
        report
    }

    /// Open the detail view for `room_id`. Returns false if the room is
    /// unknown.
    pub fn open_detail(&mut self, store: &RoomStateStore, room_id: &RoomId) -> bool {
        match store.get(room_id.as_str()) {
            Some(room) => {
                self.detail = Some(render_detail(room, 1));
                true
            },
            None => false,
        }
    }

    /// Close the detail view; later changes stop targeting it.
    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// Open detail view, if any.
    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    /// Room whose detail is open.
    pub fn selected_detail(&self) -> Option<&RoomId> {
        self.detail.as_ref().map(|detail| &detail.room_id)
    }

    /// List rows in display order.
    pub fn rows(&self) -> &[RoomView] {
        &self.rows
    }

    /// Row for `room_id`.
    pub fn row(&self, room_id: &RoomId) -> Option<&RoomView> {
        self.index.get(room_id).map(|&position| &self.rows[position])
    }

    /// Header statistics.
    pub fn stats(&self) -> DashboardStats {
        self.stats
    }
}

fn render_row(room: &RoomState, view_id: u64, revision: u64) -> RoomView {
    RoomView {
        view_id,
        room_id: room.id.clone(),
        title: room_title(&room.id),
        temperature: format_reading(room.temperature.as_ref()),
        humidity: format_reading(room.humidity.as_ref()),
        pressure: room.pressure.as_ref().map(|p| format_reading(Some(p))),
        target: room.target_temperature.to_string(),
        ac: ac_toggle(room),
        auto_mode: ToggleView { on: room.auto_mode, enabled: true },
        last_update: room.latest_timestamp().map_or_else(|| NEVER_UPDATED.to_owned(), format_clock),
        revision,
    }
}

fn render_detail(room: &RoomState, revision: u64) -> DetailView {
    let sensors = SensorKind::ALL
        .iter()
        .filter(|&&kind| kind != SensorKind::Pressure || room.pressure.is_some())
        .map(|&kind| {
            let reading = room.sensor(kind);
            SensorLine {
                label: kind.label(),
                value: format_reading(reading),
                updated: reading.map_or_else(|| NEVER_UPDATED.to_owned(), |r| format_clock(r.timestamp)),
            }
        })
        .collect();

    DetailView {
        room_id: room.id.clone(),
        title: room_title(&room.id),
        sensors,
        target: room.target_temperature.to_string(),
        ac: ac_toggle(room),
        auto_mode: ToggleView { on: room.auto_mode, enabled: true },
        revision,
    }
}

fn ac_toggle(room: &RoomState) -> ToggleView {
    ToggleView { on: room.ac_active, enabled: !room.ac_control_locked() }
}

/// `21.5°C`-style value, or [`MISSING_VALUE`].
pub fn format_reading(reading: Option<&SensorReading>) -> String {
    reading.map_or_else(|| MISSING_VALUE.to_owned(), |r| format!("{:.1}{}", r.value, r.unit))
}

/// Room id with its first letter capitalised.
pub fn room_title(id: &RoomId) -> String {
    let mut chars = id.as_str().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Epoch seconds as `HH:MM:SS` (UTC).
pub fn format_clock(timestamp: u64) -> String {
    let seconds = timestamp % 86_400;
    format!("{:02}:{:02}:{:02}", seconds / 3600, seconds % 3600 / 60, seconds % 60)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use roomsync_core::{FieldValue, RoomPatch, RoomSnapshot, TargetTemperature};

    use super::*;

    fn snapshot(temp: Option<f64>, ac: bool, auto: bool) -> RoomSnapshot {
        RoomSnapshot {
            temperature: temp.map(|v| SensorReading::new(v, "°C", 1000)),
            humidity: Some(SensorReading::new(45.0, "%", 1000)),
            pressure: None,
            target_temperature: TargetTemperature::new(21.0),
            ac_active: ac,
            auto_mode: auto,
        }
    }

    #[test]
    fn rows_created_once_then_updated_in_place() {
        let mut store = RoomStateStore::new();
        let mut views = ViewBinder::attach(&mut store);

        store.apply_full(RoomId::from("lounge"), snapshot(Some(21.5), false, false));
        let report = views.sync(&store);
        assert_eq!(report.created, vec![RoomId::from("lounge")]);
        let view_id = views.rows()[0].view_id;

        store
            .apply_patch(RoomId::from("lounge"), RoomPatch::from(FieldValue::AcActive(true)))
            .unwrap();
        let report = views.sync(&store);
        assert_eq!(report.updated, vec![RoomId::from("lounge")]);
        assert_eq!(views.rows().len(), 1);
        assert_eq!(views.rows()[0].view_id, view_id);
        assert_eq!(views.rows()[0].revision, 2);
        assert!(views.rows()[0].ac.on);
    }

    #[test]
    fn only_changed_rooms_render() {
        let mut store = RoomStateStore::new();
        let mut views = ViewBinder::attach(&mut store);
        store.apply_full(RoomId::from("a"), snapshot(None, false, false));
        store.apply_full(RoomId::from("b"), snapshot(None, false, false));
        views.sync(&store);

        store.apply_full(RoomId::from("b"), snapshot(Some(20.0), false, false));
        let report = views.sync(&store);

        assert_eq!(report.updated, vec![RoomId::from("b")]);
        assert_eq!(views.row(&RoomId::from("a")).map(|r| r.revision), Some(1));
        assert!(views.sync(&store).is_empty());
    }

    #[test]
    fn ac_toggle_disabled_in_auto_mode() {
        let mut store = RoomStateStore::new();
        let mut views = ViewBinder::attach(&mut store);
        store.apply_full(RoomId::from("a"), snapshot(None, true, true));
        views.sync(&store);
        assert!(views.open_detail(&store, &RoomId::from("a")));

        assert_eq!(views.rows()[0].ac, ToggleView { on: true, enabled: false });
        assert_eq!(views.detail().map(|d| d.ac), Some(ToggleView { on: true, enabled: false }));
    }

    #[test]
    fn detail_follows_its_room_until_closed() {
        let mut store = RoomStateStore::new();
        let mut views = ViewBinder::attach(&mut store);
        store.apply_full(RoomId::from("a"), snapshot(Some(20.0), false, false));
        store.apply_full(RoomId::from("b"), snapshot(Some(20.0), false, false));
        views.sync(&store);
        views.open_detail(&store, &RoomId::from("a"));

        store.apply_full(RoomId::from("b"), snapshot(Some(22.0), false, false));
        assert!(!views.sync(&store).detail_rendered);

        store.apply_full(RoomId::from("a"), snapshot(Some(23.0), false, false));
        assert!(views.sync(&store).detail_rendered);
        assert_eq!(views.detail().map(|d| d.sensors[0].value.clone()), Some("23.0°C".to_owned()));

        views.close_detail();
        store.apply_full(RoomId::from("a"), snapshot(Some(24.0), false, false));
        assert!(!views.sync(&store).detail_rendered);
        assert_eq!(views.selected_detail(), None);
    }

    #[test]
    fn stats_mean_over_reporting_rooms() {
        let mut store = RoomStateStore::new();
        let mut views = ViewBinder::attach(&mut store);
        assert_eq!(views.stats().mean_label(), "--");

        store.apply_full(RoomId::from("a"), snapshot(Some(20.0), true, false));
        store.apply_full(RoomId::from("b"), snapshot(Some(23.0), false, false));
        store.apply_full(RoomId::from("c"), snapshot(None, true, false));
        views.sync(&store);

        let stats = views.stats();
        assert_eq!(stats.room_count, 3);
        assert_eq!(stats.ac_active_count, 2);
        insta::assert_snapshot!(stats.mean_label(), @"21.5°C");
    }

    #[test]
    fn formatting() {
        insta::assert_snapshot!(format_reading(Some(&SensorReading::new(1013.25, "hPa", 0))), @"1013.2hPa");
        insta::assert_snapshot!(format_reading(None), @"N/A");
        insta::assert_snapshot!(room_title(&RoomId::from("salon")), @"Salon");
        insta::assert_snapshot!(format_clock(3_723), @"01:02:03");
    }

    #[test]
    fn pressure_hidden_when_absent() {
        let mut store = RoomStateStore::new();
        let mut views = ViewBinder::attach(&mut store);
        store.apply_full(RoomId::from("a"), snapshot(Some(20.0), false, false));
        views.sync(&store);
        views.open_detail(&store, &RoomId::from("a"));

        assert_eq!(views.rows()[0].pressure, None);
        let labels: Vec<_> = views.detail().map(|d| d.sensors.iter().map(|s| s.label).collect()).unwrap_or_default();
        assert_eq!(labels, ["Temperature", "Humidity"]);
    }
}
