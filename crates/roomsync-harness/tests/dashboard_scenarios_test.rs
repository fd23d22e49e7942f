//! End-to-end dashboard scenarios.
//!
//! # Test Strategy
//!
//! Each test drives the real Runtime the way a user would:
//! 1. Start against an in-memory backend holding known rooms
//! 2. Press keys or call App operations
//! 3. Let the backend answer (or fail) in a chosen order
//! 4. Verify what the views show
//!
//! Standard invariants run on every render, so each step also checks target
//! range, row order, AC locking and sensor monotonicity.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use roomsync_app::{InputMode, KeyInput, LoadState};
use roomsync_core::{Field, RoomId, SensorKind};
use roomsync_harness::{Fault, SimBackend, Simulation, room, sensor};
use roomsync_proto::Route;

fn lounge() -> RoomId {
    RoomId::from("lounge")
}

fn lounge_backend() -> SimBackend {
    let mut lounge = room(21.0, false, false);
    lounge.temperature = Some(sensor(21.5, "°C", 1000));
    SimBackend::new().with_room("lounge", lounge)
}

async fn started() -> Simulation {
    Simulation::start(lounge_backend()).await.unwrap()
}

#[tokio::test]
async fn initial_fetch_renders_lounge() {
    let sim = started().await;

    let row = sim.app().views().row(&lounge()).unwrap();
    assert_eq!(row.temperature, "21.5°C");
    assert_eq!(row.target, "21.0°C");
    assert!(!row.ac.on);
    assert!(row.ac.enabled);
    assert_eq!(sim.app().load_state(), &LoadState::Ready);
    assert_eq!(sim.app().stream_status(sim.now()), "Connected");
}

#[tokio::test]
async fn step_up_shows_immediately_and_survives_confirmation() {
    let mut sim = started().await;

    sim.key(KeyInput::Char('+')).await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "21.5°C");
    assert_eq!(sim.backend().requests_to(&Route::TargetTemperature("lounge".into())), 0);

    sim.settle().await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "21.5°C");
    assert_eq!(sim.backend().room("lounge").unwrap().temperature_cible, 21.5);
    assert_eq!(sim.app().controller().pending_count(), 0);
}

#[tokio::test]
async fn rejected_step_restores_previous_target() {
    let mut sim = started().await;
    sim.backend().reject_next("Valeur de température invalide");

    sim.key(KeyInput::Char('+')).await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "21.5°C");

    sim.settle().await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "21.0°C");
    assert_eq!(
        sim.app().status_message(),
        Some("Could not change target temperature of lounge: Valeur de température invalide")
    );
}

#[tokio::test]
async fn unreachable_backend_reverts_too() {
    let mut sim = started().await;
    sim.backend().fail_next(Fault::Unreachable);

    sim.key(KeyInput::Char('-')).await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "20.5°C");
    sim.settle().await.unwrap();

    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "21.0°C");
    assert!(sim.app().status_message().is_some_and(|m| m.ends_with("; try again")));
}

#[tokio::test]
async fn stale_result_does_not_revert_newer_value() {
    let mut sim = started().await;

    sim.key(KeyInput::Char('+')).await.unwrap();
    sim.key(KeyInput::Char('+')).await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "22.0°C");

    // Newer command answers first; the older one then fails.
    assert!(sim.driver_mut().deliver_command(1).await);
    sim.process().await.unwrap();
    sim.backend().reject_next("late failure");
    assert!(sim.deliver_one().await.unwrap());

    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "22.0°C");
    assert!(sim.app().controller().pending(&lounge(), Field::TargetTemperature).is_none());
}

#[tokio::test]
async fn older_sensor_reading_is_ignored() {
    let mut sim = started().await;
    sim.backend().record_reading("lounge", SensorKind::Temperature, 19.0, "°C", 900);

    assert!(sim.push_update().await.unwrap());

    let row = sim.app().views().row(&lounge()).unwrap();
    assert_eq!(row.temperature, "21.5°C");
    assert_eq!(
        sim.app().store().get("lounge").and_then(|r| r.temperature.as_ref()).map(|t| t.timestamp),
        Some(1000)
    );
}

#[tokio::test]
async fn null_sensor_in_full_update_clears_reading() {
    let mut sim = started().await;
    sim.key(KeyInput::Enter).await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().temperature, "21.5°C");

    // Serialized with "temperature": null.
    sim.backend().insert_room("lounge", room(21.0, false, false));
    assert!(sim.push_update().await.unwrap());

    assert!(sim.app().store().get("lounge").unwrap().temperature.is_none());
    assert_eq!(sim.app().views().row(&lounge()).unwrap().temperature, "N/A");
    assert_eq!(sim.app().views().detail().unwrap().room_id, lounge());

    // A later reading starts over, even with an older timestamp.
    sim.backend().record_reading("lounge", SensorKind::Temperature, 20.0, "°C", 900);
    sim.push_update().await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().temperature, "20.0°C");
}

#[tokio::test]
async fn sensor_missing_from_full_update_clears_reading() {
    let mut sim = started().await;

    sim.push_message(
        r#"{"lounge": {"temperature_cible": 21.0, "climatisation_active": false, "mode_automatique": false}}"#,
    )
    .await
    .unwrap();

    assert_eq!(sim.app().views().row(&lounge()).unwrap().temperature, "N/A");
    assert_eq!(sim.app().stream().dropped_messages(), 0);
}

#[tokio::test]
async fn created_room_missing_from_refresh_gets_placeholder() {
    let mut sim = started().await;
    sim.backend().hide_created_rooms(true);

    sim.key(KeyInput::Char('n')).await.unwrap();
    sim.type_text(" Kitchen ").await.unwrap();
    sim.key(KeyInput::Enter).await.unwrap();
    assert_eq!(sim.app().input_mode(), &InputMode::Browse);
    sim.settle().await.unwrap();

    let kitchen = RoomId::from("Kitchen");
    let row = sim.app().views().row(&kitchen).unwrap();
    assert_eq!(row.target, "21.0°C");
    assert!(!row.ac.on);
    assert!(row.auto_mode.on);
    assert!(!row.ac.enabled);
    assert_eq!(row.temperature, "N/A");
    assert_eq!(sim.backend().requests_to(&Route::AutoMode("Kitchen".into())), 1);
    assert_eq!(sim.backend().requests_to(&Route::Rooms), 2);

    // The next authoritative snapshot replaces the placeholder in place.
    sim.backend().reveal_hidden();
    sim.backend().record_reading("Kitchen", SensorKind::Temperature, 19.5, "°C", 2000);
    sim.push_update().await.unwrap();

    let rows: Vec<_> = sim.app().views().rows().iter().map(|r| r.room_id.clone()).collect();
    assert_eq!(rows, vec![lounge(), kitchen.clone()]);
    assert_eq!(sim.app().views().row(&kitchen).unwrap().temperature, "19.5°C");
}

#[tokio::test]
async fn blank_room_name_sends_nothing() {
    let mut sim = started().await;
    let before = sim.backend().requests().len();

    sim.key(KeyInput::Char('n')).await.unwrap();
    sim.type_text("   ").await.unwrap();
    sim.key(KeyInput::Enter).await.unwrap();
    sim.settle().await.unwrap();

    assert_eq!(sim.backend().requests().len(), before);
    assert_eq!(sim.app().status_message(), Some("room name must not be empty"));
}

#[tokio::test]
async fn reconnect_never_duplicates_rooms() {
    let backend = lounge_backend().with_room("bedroom", room(19.0, false, true));
    let mut sim = Simulation::start(backend).await.unwrap();
    let order: Vec<_> = sim.app().views().rows().iter().map(|r| r.view_id).collect();

    assert!(sim.fail_stream("connection reset").await.unwrap());
    assert_eq!(sim.app().stream_status(sim.now()), "Reconnecting in 5s");

    sim.advance(Duration::from_secs(4)).await.unwrap();
    assert_eq!(sim.driver().stream_opens(), 1);
    sim.advance(Duration::from_secs(1)).await.unwrap();
    assert_eq!(sim.driver().stream_opens(), 2);
    assert_eq!(sim.app().stream_status(sim.now()), "Connected");

    sim.push_update().await.unwrap();
    sim.push_update().await.unwrap();

    let after: Vec<_> = sim.app().views().rows().iter().map(|r| r.view_id).collect();
    assert_eq!(after, order);
    assert_eq!(sim.app().store().get_all().len(), 2);
}

#[tokio::test]
async fn malformed_stream_message_keeps_connection() {
    let mut sim = started().await;

    sim.push_message("{not json").await.unwrap();

    assert_eq!(sim.app().stream_status(sim.now()), "Connected");
    assert_eq!(sim.app().stream().dropped_messages(), 1);
    assert_eq!(sim.app().views().row(&lounge()).unwrap().temperature, "21.5°C");
}

#[tokio::test]
async fn enabling_auto_mode_locks_ac_before_answer() {
    let mut sim = started().await;
    sim.key(KeyInput::Enter).await.unwrap();

    sim.key(KeyInput::Char('m')).await.unwrap();

    assert!(!sim.app().views().row(&lounge()).unwrap().ac.enabled);
    assert!(!sim.app().views().detail().unwrap().ac.enabled);
    assert!(sim.driver().pending_commands().next().is_some());

    sim.key(KeyInput::Char('a')).await.unwrap();
    assert_eq!(sim.driver().pending_commands().count(), 1);
}

#[tokio::test]
async fn disabling_auto_mode_keeps_ac_state() {
    let backend = SimBackend::new().with_room("lounge", room(21.0, true, true));
    let mut sim = Simulation::start(backend).await.unwrap();

    sim.key(KeyInput::Char('m')).await.unwrap();

    let row = sim.app().views().row(&lounge()).unwrap();
    assert!(row.ac.enabled);
    assert!(row.ac.on);
}

#[tokio::test]
async fn failed_initial_load_is_shown_and_not_retried() {
    let backend = lounge_backend();
    backend.fail_next(Fault::Unreachable);
    let mut sim = Simulation::start(backend).await.unwrap();

    assert!(matches!(sim.app().load_state(), LoadState::Failed(_)));
    assert!(sim.app().status_message().is_some_and(|m| m.starts_with("Failed to load rooms")));
    sim.advance(Duration::from_secs(30)).await.unwrap();
    assert_eq!(sim.driver().stream_opens(), 0);
    assert_eq!(sim.backend().requests_to(&Route::Rooms), 1);
}

#[tokio::test]
async fn sensor_commands_report_backend_message() {
    let mut sim = started().await;

    sim.key(KeyInput::Char('s')).await.unwrap();
    sim.settle().await.unwrap();
    assert!(sim.backend().sensors_running("lounge"));
    assert_eq!(sim.app().status_message(), Some("Capteurs démarrés pour la pièce \"lounge\""));

    sim.key(KeyInput::Char('x')).await.unwrap();
    sim.settle().await.unwrap();
    assert!(!sim.backend().sensors_running("lounge"));
}

#[tokio::test]
async fn set_target_clamps_out_of_range_values() {
    let mut sim = started().await;

    sim.act(|app, now| app.set_target(&RoomId::from("lounge"), 31.7, now)).await.unwrap();
    assert_eq!(sim.app().views().row(&lounge()).unwrap().target, "30.0°C");
    sim.settle().await.unwrap();
    assert_eq!(sim.backend().room("lounge").unwrap().temperature_cible, 30.0);

    sim.act(|app, now| app.set_target(&RoomId::from("lounge"), 14.2, now)).await.unwrap();
    sim.settle().await.unwrap();
    assert_eq!(sim.backend().room("lounge").unwrap().temperature_cible, 15.0);
}

#[tokio::test]
async fn shutdown_closes_stream_and_stops_driver() {
    let mut sim = started().await;
    assert!(sim.driver().stream_open());

    sim.shutdown();

    assert!(!sim.driver().stream_open());
    assert!(sim.driver().stopped());
    assert_eq!(sim.app().stream_status(sim.now()), "Disconnected");
}
