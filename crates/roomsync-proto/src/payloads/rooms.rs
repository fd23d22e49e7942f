//! Room state payloads (`GET /api/pieces` and every `/api/stream` event).

use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::errors::{ProtocolError, Result};

/// One sensor reading as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPayload {
    /// Measured value.
    pub valeur: f64,
    /// Display unit (`°C`, `%`, `hPa`).
    #[serde(default)]
    pub unite: String,
    /// Seconds since the Unix epoch.
    ///
    /// The backend emits float seconds; they are floored on decode.
    #[serde(deserialize_with = "epoch_seconds")]
    pub timestamp: u64,
}

/// Full reported state of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPayload {
    /// Echo of the map key. Optional, ignored by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Temperature sensor, `None` when absent or `null`.
    #[serde(default)]
    pub temperature: Option<SensorPayload>,
    /// Humidity sensor.
    #[serde(default)]
    pub humidite: Option<SensorPayload>,
    /// Pressure sensor, missing for most rooms.
    #[serde(default)]
    pub pression: Option<SensorPayload>,
    /// Target temperature in °C.
    pub temperature_cible: f64,
    /// Air conditioning running.
    pub climatisation_active: bool,
    /// Server-driven automatic mode.
    pub mode_automatique: bool,
}

/// Ordered `RoomId -> RoomPayload` map.
///
/// JSON objects are unordered in principle, but the backend emits rooms in
/// creation order and the dashboard displays them that way, so decoding keeps
/// key order. A duplicated key keeps its first position and its last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomsPayload {
    rooms: Vec<(String, RoomPayload)>,
}

impl RoomsPayload {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode from a JSON object.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode as a JSON object, preserving order.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::JsonEncode(e.to_string()))
    }

    /// Insert or replace a room. New ids are appended.
    pub fn insert(&mut self, id: impl Into<String>, room: RoomPayload) {
        let id = id.into();
        match self.rooms.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = room,
            None => self.rooms.push((id, room)),
        }
    }

    /// Room by id.
    pub fn get(&self, id: &str) -> Option<&RoomPayload> {
        self.rooms.iter().find(|(existing, _)| existing == id).map(|(_, room)| room)
    }

    /// Mutable room by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut RoomPayload> {
        self.rooms.iter_mut().find(|(existing, _)| existing == id).map(|(_, room)| room)
    }

    /// Mutable room by id, appending `default()` first if it is missing.
    pub fn get_or_insert_with(
        &mut self,
        id: &str,
        default: impl FnOnce() -> RoomPayload,
    ) -> &mut RoomPayload {
        let position = match self.rooms.iter().position(|(existing, _)| existing == id) {
            Some(position) => position,
            None => {
                self.rooms.push((id.to_owned(), default()));
                self.rooms.len() - 1
            },
        };
        &mut self.rooms[position].1
    }

    /// Whether the map contains `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Rooms in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoomPayload)> {
        self.rooms.iter().map(|(id, room)| (id.as_str(), room))
    }
}

impl IntoIterator for RoomsPayload {
    type Item = (String, RoomPayload);
    type IntoIter = std::vec::IntoIter<(String, RoomPayload)>;

    fn into_iter(self) -> Self::IntoIter {
        self.rooms.into_iter()
    }
}

impl FromIterator<(String, RoomPayload)> for RoomsPayload {
    fn from_iter<T: IntoIterator<Item = (String, RoomPayload)>>(iter: T) -> Self {
        let mut payload = Self::new();
        for (id, room) in iter {
            payload.insert(id, room);
        }
        payload
    }
}

impl Serialize for RoomsPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rooms.len()))?;
        for (id, room) in &self.rooms {
            map.serialize_entry(id, room)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RoomsPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedRooms;

        impl<'de> Visitor<'de> for OrderedRooms {
            type Value = RoomsPayload;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of room id to room state")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut payload = RoomsPayload {
                    rooms: Vec::with_capacity(access.size_hint().unwrap_or(0)),
                };
                while let Some((id, room)) = access.next_entry::<String, RoomPayload>()? {
                    payload.insert(id, room);
                }
                Ok(payload)
            }
        }

        deserializer.deserialize_map(OrderedRooms)
    }
}

fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(de::Error::custom(format!("invalid timestamp {raw}")));
    }
    Ok(raw.floor() as u64)
}
