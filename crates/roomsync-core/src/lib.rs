//! Roomsync core
//!
//! Domain model of the room dashboard and the local mirror of server state.
//! Pure data: no network, no rendering. Callers feed snapshots in and observe
//! change notifications out.
//!
//! # Components
//!
//! - [`RoomState`]: one room's sensors and climate controls
//! - [`TargetTemperature`]: a target that is always within range and on the
//!   half-degree grid
//! - [`RoomSnapshot`] / [`RoomPatch`]: full replacement vs. partial merge
//! - [`RoomStateStore`]: ordered collection with timestamp-monotonic sensor
//!   merge and change subscriptions
//! - [`Environment`]: time abstraction so reconnect timing is testable

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod room;
pub mod snapshot;
pub mod store;

pub use env::{Environment, SystemEnv, Timepoint};
pub use error::{StoreError, ValidationError};
pub use room::{Field, FieldValue, RoomId, RoomState, SensorKind, SensorReading, TargetTemperature};
pub use snapshot::{CollectionSnapshot, RoomPatch, RoomSnapshot, Update};
pub use store::{ChangeSet, RoomCollection, RoomStateStore, Subscription};
