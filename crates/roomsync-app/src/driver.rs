//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use roomsync_client::TransportError;
use roomsync_core::{CollectionSnapshot, RoomId, Timepoint};

use crate::{App, AppEvent, Dispatch};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the terminal frontend and in
/// simulation.
///
/// Network work started through [`dispatch`](Driver::dispatch),
/// [`refresh_rooms`](Driver::refresh_rooms) and
/// [`open_stream`](Driver::open_stream) never blocks the loop: results come
/// back later as [`AppEvent`]s from [`poll_event`](Driver::poll_event), in
/// whatever order the backend produces them.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, reqwest for HTTP
/// - **Simulation**: in-memory backend with a virtual clock
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Timepoint;

    /// Poll for the next input event.
    ///
    /// Returns the next event, or `None` if no events are ready.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Fetch the full room list, waiting for the answer.
    fn fetch_rooms(
        &mut self,
    ) -> impl Future<Output = Result<CollectionSnapshot, TransportError>> + Send;

    /// Start a room list re-fetch; reported as
    /// [`AppEvent::RoomsRefreshed`].
    fn refresh_rooms(&mut self, created: Option<RoomId>);

    /// Start executing a command; reported as
    /// [`AppEvent::CommandCompleted`].
    fn dispatch(&mut self, dispatch: Dispatch);

    /// Open the push channel; signals are reported as [`AppEvent::Stream`].
    fn open_stream(&mut self);

    /// Close the push channel. Signals from it stop arriving.
    fn close_stream(&mut self);

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App<Self::Instant>) -> Result<(), Self::Error>;

    /// Stop all I/O and clean up resources.
    fn stop(&mut self);
}
