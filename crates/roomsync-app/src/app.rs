//! Application state machine.
//!
//! This module defines the [`App`] state machine, which owns the room store,
//! the view models and every controller, completely decoupled from I/O.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//! Views are re-synced after every event, so a render never observes a
//! half-applied mutation.
//!
//! # Responsibilities
//!
//! - Applies fetched and pushed snapshots to the store.
//! - Turns key presses into optimistic control changes.
//! - Reconciles command results and surfaces failures as status messages.
//! - Drives the push channel reconnect machine from ticks and signals.

use std::time::Duration;

use roomsync_client::{
    Command, StreamAction, StreamEvent, StreamState, TransportError, UpdateStream,
};
use roomsync_core::{CollectionSnapshot, RoomId, RoomStateStore, Timepoint};
use tracing::{debug, warn};

use crate::{
    AppAction, AppEvent, ControlError, Dispatch, KeyInput, OptimisticController, Resolution,
    ViewBinder,
};

/// Progress of the initial room list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Fetch in flight.
    Loading,
    /// Rooms loaded.
    Ready,
    /// Fetch failed; not retried.
    Failed(String),
}

/// What keystrokes currently mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Navigating and operating controls.
    Browse,
    /// Typing the name of a new room.
    NamingRoom(String),
}

/// Application state machine.
///
/// Pure state machine that processes events and produces actions. Generic
/// over the time source so simulation can drive it with virtual time.
#[derive(Debug)]
pub struct App<I> {
    /// Authoritative client-side room state.
    store: RoomStateStore,
    /// View models derived from the store.
    views: ViewBinder,
    /// Pending optimistic changes and in-flight commands.
    controller: OptimisticController<I>,
    /// Push channel reconnect machine.
    stream: UpdateStream<I>,
    /// Initial fetch progress.
    load: LoadState,
    /// Current input mode.
    mode: InputMode,
    /// Selected row in the room list.
    cursor: usize,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Latest notification. `None` if nothing to report.
    status_message: Option<String>,
}

impl<I: Timepoint> App<I> {
    /// Create an App that waits for the initial room list.
    pub fn new(reconnect_delay: Duration) -> Self {
        let mut store = RoomStateStore::new();
        let views = ViewBinder::attach(&mut store);
        Self {
            store,
            views,
            controller: OptimisticController::new(),
            stream: UpdateStream::new(reconnect_delay),
            load: LoadState::Loading,
            mode: InputMode::Browse,
            cursor: 0,
            terminal_size: (80, 24),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent, now: I) -> Vec<AppAction> {
        let actions = match event {
            AppEvent::Key(key) => self.handle_key(key, now),
            AppEvent::Tick => {
                let mut actions = self.drive_stream(StreamEvent::Tick, now);
                if matches!(self.stream.state(), StreamState::ReconnectPending { .. }) {
                    actions.push(AppAction::Render);
                }
                actions
            },
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::RoomsLoaded(Ok(snapshot)) => {
                debug!(rooms = snapshot.len(), "initial room list loaded");
                self.store.apply_collection(snapshot);
                self.load = LoadState::Ready;
                let mut actions = self.drive_stream(StreamEvent::Start, now);
                actions.push(AppAction::Render);
                actions
            },
            AppEvent::RoomsLoaded(Err(err)) => {
                warn!(error = %err, "initial room list fetch failed");
                self.load = LoadState::Failed(err.to_string());
                let mut notice = format!("Failed to load rooms: {err}");
                if err.is_transient() {
                    notice.push_str("; restart once the server is reachable");
                }
                self.status_message = Some(notice);
                vec![AppAction::Render]
            },
            AppEvent::RoomsRefreshed { created, result } => {
                self.handle_refresh(created, result);
                vec![AppAction::Render]
            },
            AppEvent::Stream(signal) => {
                let mut actions = self.drive_stream(StreamEvent::Signal(signal), now);
                actions.push(AppAction::Render);
                actions
            },
            AppEvent::CommandCompleted { ticket, result } => {
                let resolution = self.controller.resolve(&mut self.store, ticket, result);
                let mut actions = self.handle_resolution(resolution);
                actions.push(AppAction::Render);
                actions
            },
        };

        self.views.sync(&self.store);
        self.clamp_cursor();
        actions
    }

    fn handle_key(&mut self, key: KeyInput, now: I) -> Vec<AppAction> {
        if let InputMode::NamingRoom(name) = &mut self.mode {
            match key {
                KeyInput::Char(c) => name.push(c),
                KeyInput::Backspace => {
                    name.pop();
                },
                KeyInput::Esc => self.mode = InputMode::Browse,
                KeyInput::Enter => {
                    let name = std::mem::take(name);
                    self.mode = InputMode::Browse;
                    return self.create_room(&name);
                },
                _ => return vec![],
            }
            return vec![AppAction::Render];
        }

        match key {
            KeyInput::Char('q') => self.quit(),
            KeyInput::Esc => {
                if self.views.detail().is_some() {
                    self.close_detail()
                } else {
                    self.quit()
                }
            },
            KeyInput::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                vec![AppAction::Render]
            },
            KeyInput::Down => {
                if self.cursor + 1 < self.views.rows().len() {
                    self.cursor += 1;
                }
                vec![AppAction::Render]
            },
            KeyInput::Home => {
                self.cursor = 0;
                vec![AppAction::Render]
            },
            KeyInput::End => {
                self.cursor = self.views.rows().len().saturating_sub(1);
                vec![AppAction::Render]
            },
            KeyInput::Enter => match self.cursor_room() {
                Some(room_id) => self.open_detail(&room_id),
                None => vec![],
            },
            KeyInput::Char('+' | '=') => self.step_target(true, now),
            KeyInput::Char('-') => self.step_target(false, now),
            KeyInput::Char('a') => self.toggle_ac(now),
            KeyInput::Char('m') => self.toggle_auto_mode(now),
            KeyInput::Char('s') => self.sensor_command(true),
            KeyInput::Char('x') => self.sensor_command(false),
            KeyInput::Char('n') => {
                self.mode = InputMode::NamingRoom(String::new());
                vec![AppAction::Render]
            },
            _ => vec![],
        }
    }

    fn handle_refresh(
        &mut self,
        created: Option<RoomId>,
        result: Result<CollectionSnapshot, TransportError>,
    ) {
        match (created, result) {
            (Some(room_id), result) => {
                let refreshed = result
                    .map_err(|err| warn!(error = %err, "refresh after creation failed"))
                    .ok();
                self.controller.finish_create(&mut self.store, &room_id, refreshed);
                self.status_message = Some(format!("Room {room_id} created"));
            },
            (None, Ok(snapshot)) => {
                self.store.apply_collection(snapshot);
            },
            (None, Err(err)) => {
                warn!(error = %err, "room list refresh failed");
                self.status_message = Some(format!("Failed to refresh rooms: {err}"));
            },
        }
    }

    fn handle_resolution(&mut self, resolution: Resolution) -> Vec<AppAction> {
        match resolution {
            Resolution::Confirmed { .. } | Resolution::Superseded { .. } | Resolution::Unknown => {
                vec![]
            },
            Resolution::Reverted { room_id, field, reason, retryable } => {
                let notice = format!("Could not change {} of {room_id}: {reason}", field.label());
                self.status_message = Some(failure_notice(notice, retryable));
                vec![]
            },
            Resolution::RoomCreated { room_id, materialize } => {
                self.status_message = Some(format!("Setting up room {room_id}..."));
                vec![AppAction::Dispatch(materialize)]
            },
            Resolution::Materialized { room_id } => {
                vec![AppAction::RefreshRooms { created: Some(room_id) }]
            },
            Resolution::CreateFailed { reason, retryable } => {
                let notice = format!("Could not create room: {reason}");
                self.status_message = Some(failure_notice(notice, retryable));
                vec![]
            },
            Resolution::Completed { label, message } => {
                self.status_message = Some(message.unwrap_or_else(|| format!("{label}: done")));
                vec![]
            },
            Resolution::Failed { label, reason, retryable } => {
                let notice = format!("{label} failed: {reason}");
                self.status_message = Some(failure_notice(notice, retryable));
                vec![]
            },
        }
    }

    fn drive_stream(&mut self, event: StreamEvent, now: I) -> Vec<AppAction> {
        let mut actions = Vec::new();
        for action in self.stream.handle(event, now) {
            match action {
                StreamAction::Connect => actions.push(AppAction::OpenStream),
                StreamAction::Close => actions.push(AppAction::CloseStream),
                StreamAction::Apply(snapshot) => {
                    self.store.apply_collection(snapshot);
                },
            }
        }
        actions
    }

    fn control(&mut self, result: Result<Dispatch, ControlError>) -> Vec<AppAction> {
        // Operations may be called outside `handle`; keep views current.
        self.views.sync(&self.store);
        match result {
            Ok(dispatch) => vec![AppAction::Dispatch(dispatch), AppAction::Render],
            Err(err) => {
                debug!(error = %err, "control refused");
                self.status_message = Some(err.to_string());
                vec![AppAction::Render]
            },
        }
    }

    /// Room the controls act on: the open detail, otherwise the cursor row.
    pub fn target_room(&self) -> Option<RoomId> {
        self.views.selected_detail().cloned().or_else(|| self.cursor_room())
    }

    fn cursor_room(&self) -> Option<RoomId> {
        self.views.rows().get(self.cursor).map(|row| row.room_id.clone())
    }

    fn clamp_cursor(&mut self) {
        let rows = self.views.rows().len();
        if self.cursor >= rows {
            self.cursor = rows.saturating_sub(1);
        }
    }

    /// Raise or lower the target of the target room by one step.
    pub fn step_target(&mut self, up: bool, now: I) -> Vec<AppAction> {
        let Some(room_id) = self.target_room() else {
            return vec![];
        };
        let result = self.controller.step_target(&mut self.store, &room_id, up, now);
        self.control(result)
    }

    /// Set the target of `room_id`, clamped and rounded.
    pub fn set_target(&mut self, room_id: &RoomId, celsius: f64, now: I) -> Vec<AppAction> {
        let result = self.controller.set_target(&mut self.store, room_id, celsius, now);
        self.control(result)
    }

    /// Flip the AC of the target room.
    pub fn toggle_ac(&mut self, now: I) -> Vec<AppAction> {
        let Some(room_id) = self.target_room() else {
            return vec![];
        };
        let active = self.store.get(room_id.as_str()).is_some_and(|room| room.ac_active);
        let result = self.controller.set_ac_active(&mut self.store, &room_id, !active, now);
        self.control(result)
    }

    /// Flip auto mode of the target room.
    pub fn toggle_auto_mode(&mut self, now: I) -> Vec<AppAction> {
        let Some(room_id) = self.target_room() else {
            return vec![];
        };
        let auto = self.store.get(room_id.as_str()).is_some_and(|room| room.auto_mode);
        let result = self.controller.set_auto_mode(&mut self.store, &room_id, !auto, now);
        self.control(result)
    }

    fn sensor_command(&mut self, start: bool) -> Vec<AppAction> {
        let Some(room_id) = self.target_room() else {
            return vec![];
        };
        let command = if start {
            Command::StartSensors { room_id }
        } else {
            Command::StopSensors { room_id }
        };
        let dispatch = self.controller.plain(command);
        vec![AppAction::Dispatch(dispatch), AppAction::Render]
    }

    /// Create a room named `name` (trimmed).
    pub fn create_room(&mut self, name: &str) -> Vec<AppAction> {
        match self.controller.begin_create_room(name) {
            Ok(dispatch) => {
                self.status_message = Some(format!("Creating room {}...", name.trim()));
                vec![AppAction::Dispatch(dispatch), AppAction::Render]
            },
            Err(err) => {
                self.status_message = Some(err.to_string());
                vec![AppAction::Render]
            },
        }
    }

    /// Open the detail view of `room_id`.
    pub fn open_detail(&mut self, room_id: &RoomId) -> Vec<AppAction> {
        if !self.views.open_detail(&self.store, room_id) {
            return vec![];
        }
        if let Some(position) = self.views.rows().iter().position(|row| &row.room_id == room_id) {
            self.cursor = position;
        }
        vec![AppAction::Render]
    }

    /// Close the detail view.
    pub fn close_detail(&mut self) -> Vec<AppAction> {
        self.views.close_detail();
        vec![AppAction::Render]
    }

    /// Stop the push channel and cancel any pending reconnect.
    pub fn stop_stream(&mut self, now: I) -> Vec<AppAction> {
        self.drive_stream(StreamEvent::Stop, now)
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Push channel state as shown in the status bar.
    pub fn stream_status(&self, now: I) -> String {
        match self.stream.state() {
            StreamState::Disconnected => "Disconnected".to_owned(),
            StreamState::Connecting => "Connecting".to_owned(),
            StreamState::Connected => "Connected".to_owned(),
            StreamState::ReconnectPending { .. } => {
                let remaining = self.stream.time_until_reconnect(now).unwrap_or_default();
                let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                format!("Reconnecting in {secs}s")
            },
        }
    }

    /// Room store.
    pub fn store(&self) -> &RoomStateStore {
        &self.store
    }

    /// View models.
    pub fn views(&self) -> &ViewBinder {
        &self.views
    }

    /// Optimistic controller.
    pub fn controller(&self) -> &OptimisticController<I> {
        &self.controller
    }

    /// Push channel machine.
    pub fn stream(&self) -> &UpdateStream<I> {
        &self.stream
    }

    /// Initial fetch progress.
    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    /// Current input mode.
    pub fn input_mode(&self) -> &InputMode {
        &self.mode
    }

    /// Selected row index.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Latest notification.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}

fn failure_notice(mut notice: String, retryable: bool) -> String {
    if retryable {
        notice.push_str("; try again");
    }
    notice
}
