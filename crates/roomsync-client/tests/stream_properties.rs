//! Property-based tests for the update stream state machine.

use std::time::Duration;

use proptest::prelude::*;
use roomsync_client::{StreamAction, StreamEvent, StreamSignal, StreamState, UpdateStream};

const SNAPSHOT: &str = r#"{"a": {"temperature_cible": 21, "climatisation_active": false,
    "mode_automatique": true}}"#;

fn event_strategy() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        2 => Just(StreamEvent::Start),
        1 => Just(StreamEvent::Stop),
        3 => Just(StreamEvent::Tick),
        2 => Just(StreamEvent::Signal(StreamSignal::Opened)),
        3 => Just(StreamEvent::Signal(StreamSignal::Message(SNAPSHOT.into()))),
        1 => Just(StreamEvent::Signal(StreamSignal::Message("not json".into()))),
        1 => Just(StreamEvent::Signal(StreamSignal::Failed("reset".into()))),
        1 => Just(StreamEvent::Signal(StreamSignal::Closed)),
    ]
}

proptest! {
    /// At most one channel is ever open, and snapshots are only applied
    /// while one is.
    #[test]
    fn prop_single_channel(
        steps in prop::collection::vec((event_strategy(), 0u64..4), 0..80)
    ) {
        let mut stream = UpdateStream::<Duration>::new(Duration::from_secs(5));
        let mut now = Duration::ZERO;
        let mut open = false;

        for (event, advance) in steps {
            now += Duration::from_secs(advance);
            for action in stream.handle(event, now) {
                match action {
                    StreamAction::Connect => {
                        prop_assert!(!open, "connect while a channel is open");
                        open = true;
                    },
                    StreamAction::Close => {
                        prop_assert!(open, "close without an open channel");
                        open = false;
                    },
                    StreamAction::Apply(snapshot) => {
                        prop_assert!(open);
                        prop_assert!(stream.is_connected());
                        prop_assert_eq!(snapshot.len(), 1);
                    },
                }
            }

            let expect_open = matches!(stream.state(), StreamState::Connecting | StreamState::Connected);
            prop_assert_eq!(open, expect_open);
        }
    }

    /// A reconnect never fires before the fixed delay has elapsed.
    #[test]
    fn prop_reconnect_waits_full_delay(
        steps in prop::collection::vec((event_strategy(), 0u64..4), 0..80)
    ) {
        let delay = Duration::from_secs(5);
        let mut stream = UpdateStream::<Duration>::new(delay);
        let mut now = Duration::ZERO;
        let mut failed_at: Option<Duration> = None;

        for (event, advance) in steps {
            now += Duration::from_secs(advance);
            let was_pending = matches!(stream.state(), StreamState::ReconnectPending { .. });
            let actions = stream.handle(event, now);

            if let StreamState::ReconnectPending { deadline } = stream.state() {
                if !was_pending {
                    failed_at = Some(now);
                    prop_assert_eq!(deadline, now + delay);
                }
            }
            if was_pending && actions.contains(&StreamAction::Connect) {
                let since = failed_at.map(|t| now - t).unwrap_or_default();
                prop_assert!(since >= delay);
            }
        }
    }
}
