//! Push-channel lifecycle.
//!
//! Uses the action pattern: the driver feeds [`StreamEvent`]s together with
//! the current time and executes the returned [`StreamAction`]s. The machine
//! never opens sockets or sleeps itself.
//!
//! # State Machine
//!
//! ```text
//!                start             Opened
//! ┌──────────────┐────────>┌────────────┐────────>┌───────────┐
//! │ Disconnected │         │ Connecting │         │ Connected │
//! └──────────────┘         └────────────┘         └───────────┘
//!        ^                    ^      │ Failed/Closed    │ Failed/Closed
//!        │ stop (any state)   │      ↓                  ↓
//!        │                    │  ┌──────────────────────────┐
//!        │                    └──│ ReconnectPending         │
//!        │       deadline passed │ (deadline = now + delay) │
//!                                └──────────────────────────┘
//! ```
//!
//! The delay is fixed and attempts are unlimited: a long-running dashboard
//! must eventually reconnect.

use std::time::Duration;

use roomsync_core::{CollectionSnapshot, Timepoint};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_RECONNECT_DELAY;

/// Something that happened on the underlying channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// Channel established.
    Opened,
    /// One event payload.
    Message(String),
    /// Channel failed.
    Failed(String),
    /// Server closed the channel.
    Closed,
}

/// Input to [`UpdateStream::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Open the channel.
    Start,
    /// Close the channel and cancel any pending reconnect.
    Stop,
    /// Time passed; fires a due reconnect.
    Tick,
    /// Channel activity.
    Signal(StreamSignal),
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState<I> {
    /// Not started, or stopped.
    Disconnected,
    /// Connect issued, channel not yet open.
    Connecting,
    /// Channel open.
    Connected,
    /// Waiting to reconnect.
    ReconnectPending {
        /// When the next attempt fires.
        deadline: I,
    },
}

/// Work for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamAction {
    /// Open a new channel to the streaming endpoint.
    Connect,
    /// Close the current channel.
    Close,
    /// Apply a decoded full collection snapshot to the store.
    Apply(CollectionSnapshot),
}

/// Reconnecting push-stream state machine.
#[derive(Debug, Clone)]
pub struct UpdateStream<I> {
    state: StreamState<I>,
    reconnect_delay: Duration,
    reconnect_attempts: u64,
    dropped_messages: u64,
}

impl<I: Timepoint> Default for UpdateStream<I> {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}

impl<I: Timepoint> UpdateStream<I> {
    /// Disconnected stream with the given reconnect delay.
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: StreamState::Disconnected,
            reconnect_delay,
            reconnect_attempts: 0,
            dropped_messages: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> StreamState<I> {
        self.state
    }

    /// Whether the channel is open.
    pub fn is_connected(&self) -> bool {
        self.state == StreamState::Connected
    }

    /// Reconnect attempts made so far.
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts
    }

    /// Messages dropped because they failed to decode.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages
    }

    /// Configured reconnect delay.
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Remaining wait before the next attempt. `None` unless pending.
    pub fn time_until_reconnect(&self, now: I) -> Option<Duration> {
        match self.state {
            StreamState::ReconnectPending { deadline } if deadline > now => Some(deadline - now),
            StreamState::ReconnectPending { .. } => Some(Duration::ZERO),
            _ => None,
        }
    }

    /// Process one event.
    pub fn handle(&mut self, event: StreamEvent, now: I) -> Vec<StreamAction> {
        match event {
            StreamEvent::Start => self.start(),
            StreamEvent::Stop => self.stop(),
            StreamEvent::Tick => self.tick(now),
            StreamEvent::Signal(signal) => self.signal(signal, now),
        }
    }

    /// Open the channel. No-op unless disconnected.
    pub fn start(&mut self) -> Vec<StreamAction> {
        if self.state != StreamState::Disconnected {
            return Vec::new();
        }
        info!("opening update stream");
        self.state = StreamState::Connecting;
        vec![StreamAction::Connect]
    }

    /// Close the channel and cancel a pending reconnect. Idempotent.
    pub fn stop(&mut self) -> Vec<StreamAction> {
        let previous = std::mem::replace(&mut self.state, StreamState::Disconnected);
        match previous {
            StreamState::Connecting | StreamState::Connected => {
                info!("update stream stopped");
                vec![StreamAction::Close]
            },
            StreamState::ReconnectPending { .. } => {
                debug!("pending reconnect cancelled");
                Vec::new()
            },
            StreamState::Disconnected => Vec::new(),
        }
    }

    fn tick(&mut self, now: I) -> Vec<StreamAction> {
        match self.state {
            StreamState::ReconnectPending { deadline } if now >= deadline => {
                self.reconnect_attempts += 1;
                info!(attempt = self.reconnect_attempts, "reconnecting update stream");
                self.state = StreamState::Connecting;
                vec![StreamAction::Connect]
            },
            _ => Vec::new(),
        }
    }

    fn signal(&mut self, signal: StreamSignal, now: I) -> Vec<StreamAction> {
        match (self.state, signal) {
            (StreamState::Connecting, StreamSignal::Opened) => {
                info!("update stream connected");
                self.state = StreamState::Connected;
                Vec::new()
            },
            (StreamState::Connecting | StreamState::Connected, StreamSignal::Message(data)) => {
                // Data proves the channel is open even if `Opened` was missed.
                self.state = StreamState::Connected;
                self.decode(&data)
            },
            (StreamState::Connecting | StreamState::Connected, StreamSignal::Failed(reason)) => {
                warn!(%reason, delay = ?self.reconnect_delay, "update stream failed");
                self.schedule_reconnect(now)
            },
            (StreamState::Connecting | StreamState::Connected, StreamSignal::Closed) => {
                warn!(delay = ?self.reconnect_delay, "update stream closed by server");
                self.schedule_reconnect(now)
            },
            (state, signal) => {
                debug!(?state, ?signal, "ignoring signal from a stale channel");
                Vec::new()
            },
        }
    }

    fn schedule_reconnect(&mut self, now: I) -> Vec<StreamAction> {
        self.state = StreamState::ReconnectPending { deadline: now + self.reconnect_delay };
        vec![StreamAction::Close]
    }

    fn decode(&mut self, data: &str) -> Vec<StreamAction> {
        match CollectionSnapshot::from_json(data) {
            Ok(snapshot) => vec![StreamAction::Apply(snapshot)],
            Err(err) => {
                self.dropped_messages += 1;
                warn!(error = %err, "dropping undecodable stream message");
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOMS: &str = r#"{"lounge": {"temperature_cible": 21, "climatisation_active": false,
        "mode_automatique": false}}"#;

    fn at(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    #[test]
    fn start_connect_open() {
        let mut stream = UpdateStream::<Duration>::default();

        assert_eq!(stream.handle(StreamEvent::Start, at(0)), vec![StreamAction::Connect]);
        assert_eq!(stream.state(), StreamState::Connecting);
        assert!(stream.handle(StreamEvent::Start, at(0)).is_empty());

        stream.handle(StreamEvent::Signal(StreamSignal::Opened), at(0));
        assert!(stream.is_connected());
    }

    #[test]
    fn message_decodes_to_apply() {
        let mut stream = UpdateStream::<Duration>::default();
        stream.start();
        stream.handle(StreamEvent::Signal(StreamSignal::Opened), at(0));

        let actions = stream.handle(StreamEvent::Signal(StreamSignal::Message(ROOMS.into())), at(1));
        assert!(matches!(actions.as_slice(), [StreamAction::Apply(s)] if s.len() == 1));
    }

    #[test]
    fn bad_message_is_dropped_connection_kept() {
        let mut stream = UpdateStream::<Duration>::default();
        stream.start();
        stream.handle(StreamEvent::Signal(StreamSignal::Opened), at(0));

        let actions = stream.handle(StreamEvent::Signal(StreamSignal::Message("{oops".into())), at(1));
        assert!(actions.is_empty());
        assert!(stream.is_connected());
        assert_eq!(stream.dropped_messages(), 1);
    }

    #[test]
    fn failure_reconnects_after_fixed_delay() {
        let mut stream = UpdateStream::<Duration>::default();
        stream.start();
        stream.handle(StreamEvent::Signal(StreamSignal::Opened), at(0));

        let actions = stream.handle(StreamEvent::Signal(StreamSignal::Failed("reset".into())), at(10));
        assert_eq!(actions, vec![StreamAction::Close]);
        assert_eq!(stream.state(), StreamState::ReconnectPending { deadline: at(15) });
        assert_eq!(stream.time_until_reconnect(at(12)), Some(at(3)));

        assert!(stream.handle(StreamEvent::Tick, at(14)).is_empty());
        assert_eq!(stream.handle(StreamEvent::Tick, at(15)), vec![StreamAction::Connect]);
        assert_eq!(stream.reconnect_attempts(), 1);

        // Delay does not grow.
        stream.handle(StreamEvent::Signal(StreamSignal::Closed), at(16));
        assert_eq!(stream.state(), StreamState::ReconnectPending { deadline: at(21) });
    }

    #[test]
    fn stop_cancels_pending_reconnect() {
        let mut stream = UpdateStream::<Duration>::default();
        stream.start();
        stream.handle(StreamEvent::Signal(StreamSignal::Failed("refused".into())), at(0));

        assert!(stream.stop().is_empty());
        assert_eq!(stream.state(), StreamState::Disconnected);
        assert!(stream.handle(StreamEvent::Tick, at(60)).is_empty());
        assert!(stream.stop().is_empty());
    }

    #[test]
    fn stop_closes_open_channel() {
        let mut stream = UpdateStream::<Duration>::default();
        stream.start();
        assert_eq!(stream.handle(StreamEvent::Stop, at(0)), vec![StreamAction::Close]);
    }

    #[test]
    fn stale_signals_are_ignored() {
        let mut stream = UpdateStream::<Duration>::default();
        let message = StreamEvent::Signal(StreamSignal::Message(ROOMS.into()));
        assert!(stream.handle(message.clone(), at(0)).is_empty());

        stream.start();
        stream.handle(StreamEvent::Signal(StreamSignal::Closed), at(0));
        assert!(stream.handle(message, at(1)).is_empty());
        assert!(stream.handle(StreamEvent::Signal(StreamSignal::Failed("late".into())), at(1)).is_empty());
        assert_eq!(stream.state(), StreamState::ReconnectPending { deadline: at(5) });
    }
}
