//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees. They read the view models only, never the store.

mod detail;
mod header;
mod prompt;
mod rooms;
mod status;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};
use roomsync_app::{App, InputMode};
use roomsync_core::Timepoint;

/// Render the entire UI.
pub fn render<I: Timepoint>(frame: &mut Frame, app: &App<I>, now: I) {
    const HEADER_HEIGHT: u16 = 3;
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const PROMPT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let prompt_height = match app.input_mode() {
        InputMode::NamingRoom(_) => PROMPT_HEIGHT,
        InputMode::Browse => 0,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(prompt_height),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [header_area, main_area, prompt_area, status_area] = chunks.as_ref() else {
        return;
    };

    header::render(frame, app, *header_area);
    render_main_area(frame, app, *main_area);
    if let InputMode::NamingRoom(name) = app.input_mode() {
        prompt::render(frame, name, *prompt_area);
    }
    status::render(frame, app, now, *status_area);
}

/// Render the room list, split with the detail panel when one is open.
fn render_main_area<I: Timepoint>(frame: &mut Frame, app: &App<I>, area: Rect) {
    const DETAIL_WIDTH: u16 = 36;
    const LIST_MIN_WIDTH: u16 = 40;

    let Some(detail) = app.views().detail() else {
        rooms::render(frame, app, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(LIST_MIN_WIDTH), Constraint::Length(DETAIL_WIDTH)])
        .split(area);

    let [rooms_area, detail_area] = chunks.as_ref() else {
        return;
    };

    rooms::render(frame, app, *rooms_area);
    detail::render(frame, detail, *detail_area);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use ratatui::{Terminal, backend::TestBackend};
    use roomsync_app::{AppEvent, KeyInput};
    use roomsync_core::{CollectionSnapshot, RoomSnapshot, SensorReading, TargetTemperature};

    use super::*;

    fn loaded_app() -> App<Duration> {
        let mut snapshot = CollectionSnapshot::new();
        snapshot.push("lounge", RoomSnapshot {
            temperature: Some(SensorReading::new(21.5, "°C", 3_725)),
            humidity: Some(SensorReading::new(45.0, "%", 3_725)),
            pressure: None,
            target_temperature: TargetTemperature::new(21.0),
            ac_active: false,
            auto_mode: false,
        });
        snapshot.push("bedroom", RoomSnapshot {
            temperature: None,
            humidity: None,
            pressure: Some(SensorReading::new(1013.0, "hPa", 60)),
            target_temperature: TargetTemperature::new(19.5),
            ac_active: true,
            auto_mode: true,
        });

        let mut app = App::new(Duration::from_secs(5));
        app.handle(AppEvent::RoomsLoaded(Ok(snapshot)), Duration::ZERO);
        app
    }

    fn draw(app: &App<Duration>, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app, Duration::ZERO)).unwrap();

        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_owned()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn dashboard_shows_rows_and_stats() {
        let screen = draw(&loaded_app(), 100, 12);

        assert!(screen.contains("Rooms: 2"));
        assert!(screen.contains("AC on: 1"));
        assert!(screen.contains("Mean: 21.5°C"));
        assert!(screen.contains("Lounge"));
        assert!(screen.contains("Bedroom"));
        assert!(screen.contains("21.5°C"));
        assert!(screen.contains("01:02:05"));
        assert!(screen.contains("AUTO"));
    }

    #[test]
    fn detail_panel_opens_beside_list() {
        let mut app = loaded_app();
        app.handle(AppEvent::Key(KeyInput::Enter), Duration::ZERO);
        let screen = draw(&app, 100, 14);

        assert!(screen.contains("Temperature"));
        assert!(screen.contains("Humidity"));
        assert!(screen.contains("Target"));
    }

    #[test]
    fn naming_prompt_is_drawn() {
        let mut app = loaded_app();
        app.handle(AppEvent::Key(KeyInput::Char('n')), Duration::ZERO);
        app.handle(AppEvent::Key(KeyInput::Char('K')), Duration::ZERO);
        let screen = draw(&app, 100, 12);

        assert!(screen.contains("New room: K"));
    }

    #[test]
    fn loading_and_failure_states() {
        let app = App::<Duration>::new(Duration::from_secs(5));
        assert!(draw(&app, 80, 10).contains("Loading rooms"));

        let mut app = App::<Duration>::new(Duration::from_secs(5));
        app.handle(
            AppEvent::RoomsLoaded(Err(roomsync_client::TransportError::Connection(
                "refused".into(),
            ))),
            Duration::ZERO,
        );
        let screen = draw(&app, 80, 10);
        assert!(screen.contains("Could not load rooms"));
        assert!(screen.contains("Disconnected"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut app = loaded_app();
        app.handle(AppEvent::Key(KeyInput::Enter), Duration::ZERO);
        draw(&app, 10, 3);
    }
}
