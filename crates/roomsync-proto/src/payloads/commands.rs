//! Control endpoint bodies and replies.
//!
//! Replies are decoded leniently: every field is optional so that an older or
//! newer backend still yields a usable value. Only the HTTP status decides
//! success; the body merely enriches it.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/pieces/{id}/temperature-cible`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetTemperatureRequest {
    /// Requested target in °C.
    pub temperature: f64,
}

/// Body of `POST /api/pieces/{id}/climatisation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcRequest {
    /// Requested air-conditioning state.
    pub active: bool,
}

/// Body of `POST /api/pieces/{id}/mode-automatique`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoModeRequest {
    /// Requested automatic mode.
    pub auto: bool,
}

/// Body of `POST /api/capteurs/pieces`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    /// Name of the new room.
    pub nom_piece: String,
}

/// Successful reply of a control endpoint.
///
/// The backend echoes the field it just stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    /// Success flag.
    #[serde(default)]
    pub succes: bool,
    /// Stored target temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_cible: Option<f64>,
    /// Stored air-conditioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climatisation_active: Option<bool>,
    /// Stored automatic mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_automatique: Option<bool>,
    /// Free-form message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Successful reply of `POST /api/capteurs/pieces`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomReply {
    /// Success flag.
    #[serde(default)]
    pub succes: bool,
    /// Id assigned to the new room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece_id: Option<String>,
    /// Free-form message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Whether the backend started the room's sensors.
    #[serde(default)]
    pub capteurs_demarres: bool,
}

/// Failure reply of any endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Human-readable reason.
    pub erreur: String,
}
