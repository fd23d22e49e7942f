//! Status bar
//!
//! Displays the update stream state, the latest notification and key hints.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use roomsync_app::App;
use roomsync_client::StreamState;
use roomsync_core::Timepoint;

const KEY_HINTS: &str = "q quit | n new | enter open | s/x sensors";

/// Render the status bar.
pub fn render<I: Timepoint>(frame: &mut Frame, app: &App<I>, now: I, area: Rect) {
    let color = match app.stream().state() {
        StreamState::Connected => Color::Green,
        StreamState::Connecting | StreamState::ReconnectPending { .. } => Color::Yellow,
        StreamState::Disconnected => Color::Red,
    };
    let connection_status = Span::styled(
        app.stream_status(now),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    );

    let message = app.status_message().map_or_else(
        || Span::styled(format!(" | {KEY_HINTS}"), Style::default().fg(Color::Gray)),
        |message| Span::raw(format!(" | {message}")),
    );

    let status_line = Line::from(vec![Span::raw(" "), connection_status, message]);
    let paragraph =
        Paragraph::new(status_line).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
