//! Error types for the store and local validation.

use thiserror::Error;

use crate::room::RoomId;

/// Errors raised by [`crate::RoomStateStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A partial update targeted a room the store has never seen.
    ///
    /// Partial payloads carry no sensor or baseline data, so they cannot
    /// create a room on their own.
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),
}

/// Input rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Room name is empty after trimming whitespace.
    #[error("room name must not be empty")]
    EmptyRoomName,
}
