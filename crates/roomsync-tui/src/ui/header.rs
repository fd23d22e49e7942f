//! Header
//!
//! Dashboard-wide statistics.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use roomsync_app::App;
use roomsync_core::Timepoint;

const SEPARATOR: &str = "  |  ";

/// Render the statistics header.
pub fn render<I: Timepoint>(frame: &mut Frame, app: &App<I>, area: Rect) {
    let stats = app.views().stats();
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().add_modifier(Modifier::BOLD);

    let line = Line::from(vec![
        Span::styled("Rooms: ", label),
        Span::styled(stats.room_count.to_string(), value),
        Span::raw(SEPARATOR),
        Span::styled("AC on: ", label),
        Span::styled(stats.ac_active_count.to_string(), value),
        Span::raw(SEPARATOR),
        Span::styled("Mean: ", label),
        Span::styled(stats.mean_label(), value),
    ]);

    let block = Block::default().borders(Borders::ALL).title(" Climate ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}
