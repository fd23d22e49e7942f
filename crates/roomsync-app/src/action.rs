//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use roomsync_core::RoomId;

use crate::Dispatch;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Open the push channel.
    OpenStream,

    /// Close the push channel.
    CloseStream,

    /// Re-fetch the full room list.
    RefreshRooms {
        /// Room just created, if the refresh finishes a creation.
        created: Option<RoomId>,
    },

    /// Send a command; its result comes back as
    /// [`crate::AppEvent::CommandCompleted`] under the same ticket.
    Dispatch(Dispatch),
}
