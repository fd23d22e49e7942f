//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as `TerminalDriver` but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`roomsync_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Nothing happens behind the test's back: dispatched commands and refreshes
//! queue up until the test delivers them, stream signals are injected
//! explicitly and time only moves through the shared [`SimEnv`]. That makes
//! response reordering and mid-flight disconnects easy to stage.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::Arc,
};

use roomsync_app::{App, AppEvent, Dispatch, Driver, KeyInput};
use roomsync_client::{CommandClient, StreamSignal, TransportError};
use roomsync_core::{CollectionSnapshot, Environment, RoomId, SensorKind};
use thiserror::Error;
use tracing::trace;

use crate::{
    invariants::{InvariantRegistry, SensorTimestamps, SystemSnapshot},
    sim_backend::SimBackend,
    sim_env::{SimEnv, SimInstant},
};

/// Error type for simulation driver.
#[derive(Error, Debug, Clone)]
pub enum SimDriverError {
    /// A registered invariant failed after a render.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] trait so the same [`roomsync_app::Runtime`]
/// orchestration code runs in both production TUI and simulation tests.
pub struct SimDriver {
    env: SimEnv,
    client: CommandClient<Arc<SimBackend>>,
    events: VecDeque<AppEvent>,
    commands: VecDeque<Dispatch>,
    refreshes: VecDeque<Option<RoomId>>,
    stream_open: bool,
    stream_opens: u64,
    renders: u64,
    stopped: bool,
    history: HashMap<RoomId, Vec<SensorTimestamps>>,
    invariants: Option<InvariantRegistry>,
}

impl SimDriver {
    /// Create a driver talking to `backend` on the clock of `env`.
    pub fn new(backend: Arc<SimBackend>, env: SimEnv) -> Self {
        Self {
            env,
            client: CommandClient::new(backend),
            events: VecDeque::new(),
            commands: VecDeque::new(),
            refreshes: VecDeque::new(),
            stream_open: false,
            stream_opens: 0,
            renders: 0,
            stopped: false,
            history: HashMap::new(),
            invariants: None,
        }
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&mut self, event: AppEvent) {
        self.events.push_back(event);
    }

    /// Inject a key press.
    pub fn inject_key(&mut self, key: KeyInput) {
        self.events.push_back(AppEvent::Key(key));
    }

    /// Inject one key press per character of `text`.
    pub fn inject_text(&mut self, text: &str) {
        self.events.extend(text.chars().map(|c| AppEvent::Key(KeyInput::Char(c))));
    }

    /// Inject a tick event.
    pub fn inject_tick(&mut self) {
        self.events.push_back(AppEvent::Tick);
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: std::time::Duration) {
        self.env.advance(duration);
    }

    /// Check if there are pending events to process.
    pub fn has_pending(&self) -> bool {
        !self.events.is_empty()
    }

    /// Whether commands or refreshes are waiting for delivery.
    pub fn has_inflight(&self) -> bool {
        !self.commands.is_empty() || !self.refreshes.is_empty()
    }

    /// Commands dispatched but not yet delivered, oldest first.
    pub fn pending_commands(&self) -> impl Iterator<Item = &Dispatch> {
        self.commands.iter()
    }

    /// Execute every queued command against the backend, oldest first, and
    /// queue their results. Returns how many were delivered.
    pub async fn deliver_commands(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(dispatch) = self.commands.pop_front() {
            self.complete(dispatch).await;
            delivered += 1;
        }
        delivered
    }

    /// Execute the queued command at `index` only. Returns false if there is
    /// none.
    pub async fn deliver_command(&mut self, index: usize) -> bool {
        match self.commands.remove(index) {
            Some(dispatch) => {
                self.complete(dispatch).await;
                true
            },
            None => false,
        }
    }

    /// Execute every queued refresh and queue the results.
    pub async fn deliver_refreshes(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(created) = self.refreshes.pop_front() {
            let result = self.client.fetch_rooms().await;
            self.events.push_back(AppEvent::RoomsRefreshed { created, result });
            delivered += 1;
        }
        delivered
    }

    /// Queue a push event carrying the backend's current rooms. Returns
    /// false if no channel is open.
    pub fn push_stream_update(&mut self) -> bool {
        let message = self.client.backend().stream_message();
        self.push_stream_message(message)
    }

    /// Queue a raw push event body. Returns false if no channel is open.
    pub fn push_stream_message(&mut self, message: String) -> bool {
        if !self.stream_open {
            return false;
        }
        self.events.push_back(AppEvent::Stream(StreamSignal::Message(message)));
        true
    }

    /// Drop the open channel with an error.
    pub fn fail_stream(&mut self, reason: &str) -> bool {
        if !self.stream_open {
            return false;
        }
        self.stream_open = false;
        self.events.push_back(AppEvent::Stream(StreamSignal::Failed(reason.to_owned())));
        true
    }

    /// Whether a push channel is open.
    pub fn stream_open(&self) -> bool {
        self.stream_open
    }

    /// How many times a channel was opened.
    pub fn stream_opens(&self) -> u64 {
        self.stream_opens
    }

    /// Number of renders so far.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Whether the runtime stopped the driver.
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Backend model.
    pub fn backend(&self) -> &SimBackend {
        self.client.backend()
    }

    /// Check invariants against App state.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` listing every violation.
    pub fn check_invariants(&self, app: &App<SimInstant>) -> Result<(), SimDriverError> {
        let Some(registry) = &self.invariants else {
            return Ok(());
        };
        let snapshot = SystemSnapshot::from_app(app).with_history(self.history.clone());
        registry.check_all(&snapshot).map_err(|violations| {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            SimDriverError::Invariant(messages.join("; "))
        })
    }

    async fn complete(&mut self, dispatch: Dispatch) {
        trace!(ticket = %dispatch.ticket, "delivering command");
        let result = self.client.execute(dispatch.command).await;
        self.events.push_back(AppEvent::CommandCompleted { ticket: dispatch.ticket, result });
    }

    fn record_history(&mut self, app: &App<SimInstant>) {
        for room in app.store().get_all().iter() {
            let timestamps = SensorKind::ALL.map(|kind| room.sensor(kind).map(|r| r.timestamp));
            let history = self.history.entry(room.id.clone()).or_default();
            if history.last() != Some(&timestamps) {
                history.push(timestamps);
            }
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send {
        std::future::ready(Ok(self.events.pop_front()))
    }

    fn fetch_rooms(
        &mut self,
    ) -> impl Future<Output = Result<CollectionSnapshot, TransportError>> + Send {
        self.client.fetch_rooms()
    }

    fn refresh_rooms(&mut self, created: Option<RoomId>) {
        self.refreshes.push_back(created);
    }

    fn dispatch(&mut self, dispatch: Dispatch) {
        self.commands.push_back(dispatch);
    }

    fn open_stream(&mut self) {
        self.stream_open = true;
        self.stream_opens += 1;
        self.events.push_back(AppEvent::Stream(StreamSignal::Opened));
    }

    fn close_stream(&mut self) {
        self.stream_open = false;
        self.events.retain(|event| !matches!(event, AppEvent::Stream(_)));
    }

    fn now(&self) -> SimInstant {
        self.env.now()
    }

    fn render(&mut self, app: &App<SimInstant>) -> Result<(), Self::Error> {
        self.renders += 1;
        self.record_history(app);
        self.check_invariants(app)
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.stream_open = false;
    }
}
