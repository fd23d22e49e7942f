//! Application input events.
//!
//! This module defines [`AppEvent`], the inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two sources:
//! - User interactions (keyboard, resize) and the periodic tick.
//! - Network results: room list fetches, push channel signals and command
//!   outcomes.

use roomsync_client::{CommandError, CommandOutcome, StreamSignal, TransportError};
use roomsync_core::{CollectionSnapshot, RoomId};

use crate::{KeyInput, Ticket};

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Result of the initial room list fetch.
    RoomsLoaded(Result<CollectionSnapshot, TransportError>),

    /// Result of a room list re-fetch.
    RoomsRefreshed {
        /// Room whose creation requested the refresh.
        created: Option<RoomId>,
        /// Fetched rooms.
        result: Result<CollectionSnapshot, TransportError>,
    },

    /// Push channel signal.
    Stream(StreamSignal),

    /// A dispatched command finished.
    CommandCompleted {
        /// Ticket from the [`crate::Dispatch`].
        ticket: Ticket,
        /// Outcome reported by the client.
        result: Result<CommandOutcome, CommandError>,
    },
}
