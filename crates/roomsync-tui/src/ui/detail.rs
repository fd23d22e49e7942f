//! Detail panel
//!
//! Expanded view of the open room: every sensor with its time, then the
//! controls and the keys that operate them.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use roomsync_app::{DetailView, ToggleView};

const LABEL_WIDTH: usize = 12;

/// Render the detail panel.
pub fn render(frame: &mut Frame, detail: &DetailView, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = detail
        .sensors
        .iter()
        .map(|sensor| {
            Line::from(vec![
                Span::styled(format!("{:<LABEL_WIDTH$}", sensor.label), label),
                Span::styled(sensor.value.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", sensor.updated), label),
            ])
        })
        .collect();

    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled(format!("{:<LABEL_WIDTH$}", "Target"), label),
        Span::raw(detail.target.clone()),
        Span::styled("  [+/-]", label),
    ]));
    lines.push(toggle_line("AC", detail.ac, "[a]"));
    lines.push(toggle_line("Auto mode", detail.auto_mode, "[m]"));
    if !detail.ac.enabled {
        lines.push(Line::styled("AC follows the target in auto mode", label));
    }

    let block = Block::default().borders(Borders::ALL).title(format!(" {} ", detail.title));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn toggle_line(name: &str, toggle: ToggleView, key: &'static str) -> Line<'static> {
    let label = Style::default().fg(Color::DarkGray);
    let (text, style) = match (toggle.on, toggle.enabled) {
        (true, true) => ("ON", Style::default().fg(Color::Green)),
        (false, true) => ("OFF", Style::default()),
        (true, false) => ("ON", label),
        (false, false) => ("OFF", label),
    };
    let hint = if toggle.enabled { key } else { "" };

    Line::from(vec![
        Span::styled(format!("{name:<LABEL_WIDTH$}"), label),
        Span::styled(text, style),
        Span::styled(format!("  {hint}"), label),
    ])
}
