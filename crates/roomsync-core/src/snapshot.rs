//! Incoming room data, tagged with its merge semantics.
//!
//! Fetch and stream payloads are complete room dumps ([`RoomSnapshot`]):
//! a missing sensor means the room no longer has it. Command confirmations
//! and optimistic writes only carry the fields they touch ([`RoomPatch`]):
//! anything missing is left alone. The caller decides which one it holds by
//! wrapping it in [`Update`].

use roomsync_proto::{RoomPayload, RoomsPayload};

use crate::room::{FieldValue, RoomId, SensorReading, TargetTemperature};

/// Complete state of one room as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    /// Temperature reading.
    pub temperature: Option<SensorReading>,
    /// Humidity reading.
    pub humidity: Option<SensorReading>,
    /// Pressure reading.
    pub pressure: Option<SensorReading>,
    /// Target temperature, normalized onto the half-degree grid.
    pub target_temperature: TargetTemperature,
    /// Air conditioning running.
    pub ac_active: bool,
    /// Automatic mode.
    pub auto_mode: bool,
}

impl From<RoomPayload> for RoomSnapshot {
    fn from(payload: RoomPayload) -> Self {
        Self {
            temperature: payload.temperature.map(SensorReading::from),
            humidity: payload.humidite.map(SensorReading::from),
            pressure: payload.pression.map(SensorReading::from),
            target_temperature: TargetTemperature::new(payload.temperature_cible),
            ac_active: payload.climatisation_active,
            auto_mode: payload.mode_automatique,
        }
    }
}

/// Subset of a room's fields. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomPatch {
    /// Temperature reading.
    pub temperature: Option<SensorReading>,
    /// Humidity reading.
    pub humidity: Option<SensorReading>,
    /// Pressure reading.
    pub pressure: Option<SensorReading>,
    /// Target temperature.
    pub target_temperature: Option<TargetTemperature>,
    /// Air conditioning running.
    pub ac_active: Option<bool>,
    /// Automatic mode.
    pub auto_mode: Option<bool>,
}

impl RoomPatch {
    /// Whether the patch touches nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Add a field value to the patch.
    #[must_use]
    pub fn with(mut self, value: FieldValue) -> Self {
        match value {
            FieldValue::TargetTemperature(target) => self.target_temperature = Some(target),
            FieldValue::AcActive(active) => self.ac_active = Some(active),
            FieldValue::AutoMode(auto) => self.auto_mode = Some(auto),
        }
        self
    }
}

impl From<FieldValue> for RoomPatch {
    fn from(value: FieldValue) -> Self {
        Self::default().with(value)
    }
}

/// Incoming data for one room.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Replace the room; sensors absent here are cleared.
    Full(RoomSnapshot),
    /// Merge into the room; absent fields stay as they are.
    Partial(RoomPatch),
}

/// A full collection dump in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSnapshot {
    rooms: Vec<(RoomId, RoomSnapshot)>,
}

impl CollectionSnapshot {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a fetch or stream body.
    pub fn from_json(text: &str) -> roomsync_proto::Result<Self> {
        RoomsPayload::from_json(text).map(Self::from)
    }

    /// Decode raw bytes of a fetch or stream body.
    pub fn from_slice(bytes: &[u8]) -> roomsync_proto::Result<Self> {
        RoomsPayload::from_slice(bytes).map(Self::from)
    }

    /// Append a room. Used to build snapshots in tests and simulations.
    pub fn push(&mut self, id: impl Into<RoomId>, snapshot: RoomSnapshot) {
        self.rooms.push((id.into(), snapshot));
    }

    /// Whether the collection contains `id`.
    pub fn contains(&self, id: &RoomId) -> bool {
        self.rooms.iter().any(|(existing, _)| existing == id)
    }

    /// Snapshot for `id`.
    pub fn get(&self, id: &RoomId) -> Option<&RoomSnapshot> {
        self.rooms.iter().find(|(existing, _)| existing == id).map(|(_, room)| room)
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether there are no rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Rooms in server order.
    pub fn iter(&self) -> impl Iterator<Item = (&RoomId, &RoomSnapshot)> {
        self.rooms.iter().map(|(id, room)| (id, room))
    }
}

impl From<RoomsPayload> for CollectionSnapshot {
    fn from(payload: RoomsPayload) -> Self {
        Self {
            rooms: payload
                .into_iter()
                .map(|(id, room)| (RoomId::from(id), RoomSnapshot::from(room)))
                .collect(),
        }
    }
}

impl IntoIterator for CollectionSnapshot {
    type Item = (RoomId, RoomSnapshot);
    type IntoIter = std::vec::IntoIter<(RoomId, RoomSnapshot)>;

    fn into_iter(self) -> Self::IntoIter {
        self.rooms.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn payload_target_is_normalized() {
        let json = r#"{"a": {"temperature_cible": 33.3, "climatisation_active": true,
            "mode_automatique": false}}"#;
        let snapshot = CollectionSnapshot::from_json(json).unwrap();
        let room = snapshot.get(&RoomId::from("a")).unwrap();

        assert_eq!(room.target_temperature.celsius(), 30.0);
        assert!(room.ac_active);
    }

    #[test]
    fn patch_from_field() {
        let patch = RoomPatch::from(FieldValue::AutoMode(true));
        assert_eq!(patch.auto_mode, Some(true));
        assert_eq!(patch.ac_active, None);
        assert!(!patch.is_empty());
        assert!(RoomPatch::default().is_empty());
    }
}
