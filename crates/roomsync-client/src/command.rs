//! Control commands and reply interpretation.
//!
//! A [`Command`] knows its route, its request body and how to read the
//! backend's answer. Only the status code decides success; a 2xx reply with
//! an unreadable body is still a success, just without a confirmed payload.

use roomsync_core::{FieldValue, RoomId, RoomPatch, TargetTemperature, ValidationError};
use roomsync_proto::{
    AcRequest, AutoModeRequest, CommandReply, CreateRoomReply, CreateRoomRequest, ErrorReply,
    ProtocolError, Route, TargetTemperatureRequest,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    backend::{Request, Response},
    error::{CommandError, TransportError},
};

/// One control operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set the target temperature. Always in range by construction.
    SetTargetTemperature {
        /// Room to control
        room_id: RoomId,
        /// New target
        temperature: TargetTemperature,
    },
    /// Switch the air conditioning.
    SetAcActive {
        /// Room to control
        room_id: RoomId,
        /// New state
        active: bool,
    },
    /// Switch automatic mode.
    SetAutoMode {
        /// Room to control
        room_id: RoomId,
        /// New mode
        auto: bool,
    },
    /// Create a room. Build with [`Command::create_room`].
    CreateRoom {
        /// Trimmed, non-empty name
        name: String,
    },
    /// Start the simulated sensors of a room.
    StartSensors {
        /// Room to control
        room_id: RoomId,
    },
    /// Stop the simulated sensors of a room.
    StopSensors {
        /// Room to control
        room_id: RoomId,
    },
}

/// Successful command result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    /// Fields the backend echoed back, to merge into the store.
    pub confirmed: Option<RoomPatch>,
    /// Id of a newly created room.
    pub created: Option<RoomId>,
    /// Backend message, if any.
    pub message: Option<String>,
}

impl Command {
    /// Validated room creation.
    ///
    /// # Errors
    ///
    /// - `ValidationError::EmptyRoomName` if `name` is blank.
    pub fn create_room(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyRoomName);
        }
        Ok(Self::CreateRoom { name: name.to_owned() })
    }

    /// Command that writes `value` to `room_id`.
    pub fn set_field(room_id: RoomId, value: FieldValue) -> Self {
        match value {
            FieldValue::TargetTemperature(temperature) => {
                Self::SetTargetTemperature { room_id, temperature }
            },
            FieldValue::AcActive(active) => Self::SetAcActive { room_id, active },
            FieldValue::AutoMode(auto) => Self::SetAutoMode { room_id, auto },
        }
    }

    /// Backend route.
    pub fn route(&self) -> Route {
        match self {
            Self::SetTargetTemperature { room_id, .. } => {
                Route::TargetTemperature(room_id.to_string())
            },
            Self::SetAcActive { room_id, .. } => Route::AirConditioning(room_id.to_string()),
            Self::SetAutoMode { room_id, .. } => Route::AutoMode(room_id.to_string()),
            Self::CreateRoom { .. } => Route::CreateRoom,
            Self::StartSensors { room_id } => Route::StartSensors(room_id.to_string()),
            Self::StopSensors { room_id } => Route::StopSensors(room_id.to_string()),
        }
    }

    /// Request to send.
    ///
    /// # Errors
    ///
    /// - `TransportError::Payload` if the body cannot be encoded.
    pub fn request(&self) -> Result<Request, TransportError> {
        let body = match self {
            Self::SetTargetTemperature { temperature, .. } => {
                Some(encode(&TargetTemperatureRequest { temperature: temperature.celsius() })?)
            },
            Self::SetAcActive { active, .. } => Some(encode(&AcRequest { active: *active })?),
            Self::SetAutoMode { auto, .. } => Some(encode(&AutoModeRequest { auto: *auto })?),
            Self::CreateRoom { name } => {
                Some(encode(&CreateRoomRequest { nom_piece: name.clone() })?)
            },
            Self::StartSensors { .. } | Self::StopSensors { .. } => None,
        };
        Ok(Request::new(&self.route(), body))
    }

    /// Short description for logs and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SetTargetTemperature { .. } => "set target temperature",
            Self::SetAcActive { .. } => "switch air conditioning",
            Self::SetAutoMode { .. } => "switch automatic mode",
            Self::CreateRoom { .. } => "create room",
            Self::StartSensors { .. } => "start sensors",
            Self::StopSensors { .. } => "stop sensors",
        }
    }

    /// Room the command targets. `None` for room creation.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::SetTargetTemperature { room_id, .. }
            | Self::SetAcActive { room_id, .. }
            | Self::SetAutoMode { room_id, .. }
            | Self::StartSensors { room_id }
            | Self::StopSensors { room_id } => Some(room_id),
            Self::CreateRoom { .. } => None,
        }
    }

    /// Field value the command writes, if it writes one.
    pub fn field_value(&self) -> Option<FieldValue> {
        match self {
            Self::SetTargetTemperature { temperature, .. } => {
                Some(FieldValue::TargetTemperature(*temperature))
            },
            Self::SetAcActive { active, .. } => Some(FieldValue::AcActive(*active)),
            Self::SetAutoMode { auto, .. } => Some(FieldValue::AutoMode(*auto)),
            Self::CreateRoom { .. } | Self::StartSensors { .. } | Self::StopSensors { .. } => None,
        }
    }

    /// Turn the backend's answer into an outcome.
    ///
    /// # Errors
    ///
    /// - `CommandError::Rejected` for any non-2xx status.
    pub fn interpret(&self, response: Response) -> Result<CommandOutcome, CommandError> {
        if !response.is_success() {
            let reason = serde_json::from_slice::<ErrorReply>(&response.body)
                .map(|reply| reply.erreur)
                .unwrap_or_else(|_| format!("{} failed with status {}", self.label(), response.status));
            return Err(CommandError::Rejected { status: response.status, reason });
        }

        if let Self::CreateRoom { name } = self {
            let reply = lenient::<CreateRoomReply>(&response.body);
            let created = reply
                .piece_id
                .filter(|id| !id.trim().is_empty())
                .map_or_else(|| RoomId::from(name.as_str()), RoomId::from);
            return Ok(CommandOutcome {
                confirmed: None,
                created: Some(created),
                message: reply.message,
            });
        }

        let reply = lenient::<CommandReply>(&response.body);
        let mut patch = RoomPatch::default();
        if let Some(target) = reply.temperature_cible {
            patch = patch.with(FieldValue::TargetTemperature(TargetTemperature::new(target)));
        }
        if let Some(active) = reply.climatisation_active {
            patch = patch.with(FieldValue::AcActive(active));
        }
        if let Some(auto) = reply.mode_automatique {
            patch = patch.with(FieldValue::AutoMode(auto));
        }

        Ok(CommandOutcome {
            confirmed: (!patch.is_empty()).then_some(patch),
            created: None,
            message: reply.message,
        })
    }
}

fn encode<T: Serialize>(body: &T) -> Result<serde_json::Value, TransportError> {
    serde_json::to_value(body).map_err(|e| ProtocolError::JsonEncode(e.to_string()).into())
}

fn lenient<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> T {
    if body.is_empty() {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!(error = %e, "unreadable success reply, ignoring body");
        T::default()
    })
}
