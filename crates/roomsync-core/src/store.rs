//! Local mirror of server room state.
//!
//! # Merge policy
//!
//! - A sensor reading is replaced only when the incoming timestamp is greater
//!   than or equal to the stored one. Ties replace.
//! - A [`Update::Full`] snapshot clears sensors it does not carry. A
//!   [`Update::Partial`] patch never clears anything.
//! - Controllable fields (target, AC, auto mode) are overwritten verbatim.
//! - New ids are appended; existing ids never move.
//!
//! Listeners run synchronously inside the mutating call, after the mutation
//! is complete, and only when at least one room actually changed.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{
    error::StoreError,
    room::{RoomId, RoomState, SensorKind, SensorReading},
    snapshot::{CollectionSnapshot, RoomPatch, RoomSnapshot, Update},
};

/// Ordered `RoomId -> RoomState` collection.
///
/// Handed out behind an [`Arc`] by [`RoomStateStore::get_all`]; later store
/// mutations never show through an already obtained snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomCollection {
    order: Vec<RoomId>,
    rooms: HashMap<RoomId, RoomState>,
}

impl RoomCollection {
    /// Room by id.
    pub fn get(&self, id: &str) -> Option<&RoomState> {
        self.rooms.get(id)
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in display order.
    pub fn ids(&self) -> &[RoomId] {
        &self.order
    }

    /// Rooms in display order.
    pub fn iter(&self) -> impl Iterator<Item = &RoomState> {
        self.order.iter().filter_map(|id| self.rooms.get(id))
    }

    /// Position of `id` in display order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|existing| existing.as_str() == id)
    }

    fn entry(&mut self, id: RoomId) -> (&mut RoomState, bool) {
        let created = !self.rooms.contains_key(&id);
        if created {
            self.order.push(id.clone());
        }
        let room = self.rooms.entry(id.clone()).or_insert_with(|| RoomState::placeholder(id));
        (room, created)
    }
}

/// Rooms changed by one store operation, in the order they changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    ids: Vec<RoomId>,
}

impl ChangeSet {
    /// Empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change; duplicates are ignored.
    pub fn insert(&mut self, id: RoomId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Merge another change set into this one.
    pub fn extend(&mut self, other: ChangeSet) {
        for id in other.ids {
            self.insert(id);
        }
    }

    /// Whether `id` changed.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing.as_str() == id)
    }

    /// Number of changed rooms.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Changed ids.
    pub fn iter(&self) -> impl Iterator<Item = &RoomId> {
        self.ids.iter()
    }
}

/// Handle returned by [`RoomStateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&ChangeSet) + Send>;

/// The authoritative local room collection.
#[derive(Default)]
pub struct RoomStateStore {
    rooms: Arc<RoomCollection>,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for RoomStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomStateStore")
            .field("rooms", &self.rooms)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl RoomStateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Immutable snapshot of the current collection.
    pub fn get_all(&self) -> Arc<RoomCollection> {
        Arc::clone(&self.rooms)
    }

    /// Current state of one room.
    pub fn get(&self, id: &str) -> Option<&RoomState> {
        self.rooms.get(id)
    }

    /// Merge incoming data for one room.
    ///
    /// A full snapshot creates the room if absent.
    ///
    /// # Errors
    ///
    /// - `StoreError::UnknownRoom` if a partial patch targets an absent room.
    pub fn apply_snapshot(&mut self, id: RoomId, update: Update) -> Result<ChangeSet, StoreError> {
        let changes = self.merge(id, update)?;
        self.notify(&changes);
        Ok(changes)
    }

    /// Replace one room with a full snapshot.
    pub fn apply_full(&mut self, id: RoomId, snapshot: RoomSnapshot) -> ChangeSet {
        let changes = self.merge_full(id, snapshot);
        self.notify(&changes);
        changes
    }

    /// Merge a partial patch into an existing room.
    ///
    /// # Errors
    ///
    /// - `StoreError::UnknownRoom` if the room is absent.
    pub fn apply_patch(&mut self, id: RoomId, patch: RoomPatch) -> Result<ChangeSet, StoreError> {
        self.apply_snapshot(id, Update::Partial(patch))
    }

    /// Apply every room of a fetch or stream dump as a full snapshot.
    ///
    /// Listeners receive one notification for the whole batch. Rooms the
    /// dump does not mention are kept.
    pub fn apply_collection(&mut self, snapshot: CollectionSnapshot) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for (id, room) in snapshot {
            changes.extend(self.merge_full(id, room));
        }
        self.notify(&changes);
        changes
    }

    /// Insert a [`RoomState::placeholder`] unless the room already exists.
    pub fn insert_placeholder(&mut self, id: RoomId) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if !self.rooms.contains(id.as_str()) {
            debug!(room = %id, "inserting placeholder room");
            Arc::make_mut(&mut self.rooms).entry(id.clone());
            changes.insert(id);
        }
        self.notify(&changes);
        changes
    }

    /// Register a change listener.
    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&ChangeSet) + Send + 'static,
    {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((subscription, Box::new(listener)));
        subscription
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != subscription);
        self.listeners.len() != before
    }

    fn merge(&mut self, id: RoomId, update: Update) -> Result<ChangeSet, StoreError> {
        match update {
            Update::Full(snapshot) => Ok(self.merge_full(id, snapshot)),
            Update::Partial(patch) => self.merge_partial(id, patch),
        }
    }

    fn merge_full(&mut self, id: RoomId, snapshot: RoomSnapshot) -> ChangeSet {
        let collection = Arc::make_mut(&mut self.rooms);
        let (room, created) = collection.entry(id.clone());
        let before = room.clone();

        merge_sensor(room, SensorKind::Temperature, snapshot.temperature, true);
        merge_sensor(room, SensorKind::Humidity, snapshot.humidity, true);
        merge_sensor(room, SensorKind::Pressure, snapshot.pressure, true);
        room.target_temperature = snapshot.target_temperature;
        room.ac_active = snapshot.ac_active;
        room.auto_mode = snapshot.auto_mode;

        let mut changes = ChangeSet::new();
        if created || *room != before {
            debug!(room = %id, created, "room updated from snapshot");
            changes.insert(id);
        }
        changes
    }

    fn merge_partial(&mut self, id: RoomId, patch: RoomPatch) -> Result<ChangeSet, StoreError> {
        let collection = Arc::make_mut(&mut self.rooms);
        let Some(room) = collection.rooms.get_mut(&id) else {
            return Err(StoreError::UnknownRoom(id));
        };
        let before = room.clone();

        merge_sensor(room, SensorKind::Temperature, patch.temperature, false);
        merge_sensor(room, SensorKind::Humidity, patch.humidity, false);
        merge_sensor(room, SensorKind::Pressure, patch.pressure, false);
        if let Some(target) = patch.target_temperature {
            room.target_temperature = target;
        }
        if let Some(active) = patch.ac_active {
            room.ac_active = active;
        }
        if let Some(auto) = patch.auto_mode {
            room.auto_mode = auto;
        }

        let mut changes = ChangeSet::new();
        if *room != before {
            debug!(room = %id, "room patched");
            changes.insert(id);
        }
        Ok(changes)
    }

    fn notify(&mut self, changes: &ChangeSet) {
        if changes.is_empty() {
            return;
        }
        for (_, listener) in &mut self.listeners {
            listener(changes);
        }
    }
}

fn merge_sensor(
    room: &mut RoomState,
    kind: SensorKind,
    incoming: Option<SensorReading>,
    clear_absent: bool,
) {
    let slot = room.sensor_slot(kind);
    match incoming {
        Some(reading) => match slot.as_ref() {
            Some(current) if reading.timestamp < current.timestamp => {
                trace!(?kind, stored = current.timestamp, incoming = reading.timestamp, "stale reading ignored");
            },
            _ => *slot = Some(reading),
        },
        None if clear_absent => *slot = None,
        None => {},
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::room::{FieldValue, TargetTemperature};

    fn snapshot(temp: Option<(f64, u64)>) -> RoomSnapshot {
        RoomSnapshot {
            temperature: temp.map(|(v, ts)| SensorReading::new(v, "°C", ts)),
            humidity: None,
            pressure: None,
            target_temperature: TargetTemperature::new(21.0),
            ac_active: false,
            auto_mode: false,
        }
    }

    #[test]
    fn full_snapshot_creates_room() {
        let mut store = RoomStateStore::new();
        let changes = store.apply_full(RoomId::from("lounge"), snapshot(Some((21.5, 1000))));

        assert!(changes.contains("lounge"));
        let lounge = store.get("lounge").unwrap();
        assert_eq!(lounge.temperature.as_ref().map(|t| t.value), Some(21.5));
    }

    #[test]
    fn older_reading_is_ignored() {
        let mut store = RoomStateStore::new();
        store.apply_full(RoomId::from("lounge"), snapshot(Some((21.5, 1000))));
        let changes = store.apply_full(RoomId::from("lounge"), snapshot(Some((19.0, 900))));

        assert!(changes.is_empty());
        assert_eq!(store.get("lounge").unwrap().temperature.as_ref().map(|t| t.timestamp), Some(1000));
    }

    #[test]
    fn equal_timestamp_replaces() {
        let mut store = RoomStateStore::new();
        store.apply_full(RoomId::from("a"), snapshot(Some((21.5, 1000))));
        store.apply_full(RoomId::from("a"), snapshot(Some((22.0, 1000))));

        assert_eq!(store.get("a").unwrap().temperature.as_ref().map(|t| t.value), Some(22.0));
    }

    #[test]
    fn full_clears_absent_sensor_partial_does_not() {
        let mut store = RoomStateStore::new();
        store.apply_full(RoomId::from("a"), snapshot(Some((21.5, 1000))));

        store
            .apply_patch(RoomId::from("a"), RoomPatch::from(FieldValue::AcActive(true)))
            .unwrap();
        assert!(store.get("a").unwrap().temperature.is_some());
        assert!(store.get("a").unwrap().ac_active);

        store.apply_full(RoomId::from("a"), snapshot(None));
        assert!(store.get("a").unwrap().temperature.is_none());
        assert!(!store.get("a").unwrap().ac_active);
    }

    #[test]
    fn patch_on_unknown_room_fails() {
        let mut store = RoomStateStore::new();
        let result = store.apply_patch(RoomId::from("ghost"), RoomPatch::default());
        assert_eq!(result, Err(StoreError::UnknownRoom(RoomId::from("ghost"))));
    }

    #[test]
    fn order_is_insertion_order() {
        let mut store = RoomStateStore::new();
        for id in ["c", "a", "b"] {
            store.apply_full(RoomId::from(id), snapshot(None));
        }
        store.apply_full(RoomId::from("a"), snapshot(Some((20.0, 5))));

        let ids: Vec<_> = store.get_all().ids().iter().map(RoomId::to_string).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn get_all_is_a_snapshot() {
        let mut store = RoomStateStore::new();
        store.apply_full(RoomId::from("a"), snapshot(None));
        let before = store.get_all();
        store.apply_full(RoomId::from("b"), snapshot(None));

        assert_eq!(before.len(), 1);
        assert_eq!(store.get_all().len(), 2);
    }

    #[test]
    fn listeners_receive_batches_and_unsubscribe() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = RoomStateStore::new();
        let sink = Arc::clone(&seen);
        let subscription = store.subscribe(move |changes| {
            sink.lock().unwrap().push(changes.len());
        });

        let mut batch = CollectionSnapshot::new();
        batch.push("a", snapshot(None));
        batch.push("b", snapshot(None));
        store.apply_collection(batch.clone());
        // Identical dump: nothing changes, nobody is notified.
        store.apply_collection(batch);

        assert!(store.unsubscribe(subscription));
        assert!(!store.unsubscribe(subscription));
        store.apply_full(RoomId::from("c"), snapshot(None));

        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn placeholder_only_when_absent() {
        let mut store = RoomStateStore::new();
        store.apply_full(RoomId::from("Kitchen"), snapshot(Some((20.0, 1))));

        assert!(store.insert_placeholder(RoomId::from("Kitchen")).is_empty());
        assert!(!store.get("Kitchen").unwrap().auto_mode);

        assert!(store.insert_placeholder(RoomId::from("Office")).contains("Office"));
        assert!(store.get("Office").unwrap().auto_mode);
    }
}
