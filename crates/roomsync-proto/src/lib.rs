//! Roomsync wire format
//!
//! Everything the dashboard client exchanges with the backend: JSON room
//! payloads, control request/reply bodies, the HTTP route table and an
//! incremental decoder for the `text/event-stream` push channel.
//!
//! The crate is pure data: no sockets, no runtime. Higher layers convert the
//! payloads here into domain types (see `roomsync-core`).
//!
//! # Components
//!
//! - [`RoomsPayload`]: ordered `RoomId -> room fields` map (fetch and stream)
//! - [`payloads::commands`]: request bodies and replies of control endpoints
//! - [`Route`]: method + path for every backend operation
//! - [`EventStreamDecoder`]: byte chunks in, [`ServerEvent`]s out

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod payloads;
pub mod route;
pub mod sse;

pub use errors::{ProtocolError, Result};
pub use payloads::{
    commands::{
        AcRequest, AutoModeRequest, CommandReply, CreateRoomReply, CreateRoomRequest,
        ErrorReply, TargetTemperatureRequest,
    },
    rooms::{RoomPayload, RoomsPayload, SensorPayload},
};
pub use route::{Method, Route};
pub use sse::{EventStreamDecoder, ServerEvent};
