//! Room list
//!
//! One row per room in first-seen order, with the cursor row highlighted.

use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use roomsync_app::{App, LoadState, RoomView, ToggleView};
use roomsync_core::Timepoint;

const CURSOR_PREFIX: &str = "> ";
const PLAIN_PREFIX: &str = "  ";
const EMPTY_CELL: &str = "";
const HEADER: [&str; 8] = ["Room", "Temp", "Humidity", "Pressure", "Target", "AC", "Mode", "Updated"];

/// Render the room list.
pub fn render<I: Timepoint>(frame: &mut Frame, app: &App<I>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Rooms ");

    let placeholder = match app.load_state() {
        LoadState::Loading => Some(("Loading rooms...".to_owned(), Color::Yellow)),
        LoadState::Failed(reason) => Some((format!("Could not load rooms: {reason}"), Color::Red)),
        LoadState::Ready if app.views().rows().is_empty() => {
            Some(("No rooms yet. Press n to add one.".to_owned(), Color::DarkGray))
        },
        LoadState::Ready => None,
    };
    if let Some((text, color)) = placeholder {
        let paragraph = Paragraph::new(Line::styled(text, Style::default().fg(color))).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let rows: Vec<Row> = app
        .views()
        .rows()
        .iter()
        .enumerate()
        .map(|(index, view)| room_row(view, index == app.cursor()))
        .collect();

    let widths = [
        Constraint::Min(12),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(11),
        Constraint::Length(8),
        Constraint::Length(5),
        Constraint::Length(7),
        Constraint::Length(9),
    ];
    let header = Row::new(HEADER).style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(rows, widths).header(header).block(block).column_spacing(1);

    frame.render_widget(table, area);
}

fn room_row(view: &RoomView, selected: bool) -> Row<'static> {
    let prefix = if selected { CURSOR_PREFIX } else { PLAIN_PREFIX };
    let style = if selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    Row::new(vec![
        Cell::from(format!("{prefix}{}", view.title)),
        Cell::from(view.temperature.clone()),
        Cell::from(view.humidity.clone()),
        Cell::from(view.pressure.clone().unwrap_or_else(|| EMPTY_CELL.to_owned())),
        Cell::from(view.target.clone()),
        ac_cell(view.ac),
        Cell::from(if view.auto_mode.on { "AUTO" } else { "manual" }),
        Cell::from(view.last_update.clone()),
    ])
    .style(style)
}

fn ac_cell(ac: ToggleView) -> Cell<'static> {
    let text = if ac.on { "ON" } else { "OFF" };
    let style = match (ac.enabled, ac.on) {
        (false, _) => Style::default().fg(Color::DarkGray),
        (true, true) => Style::default().fg(Color::Cyan),
        (true, false) => Style::default(),
    };
    Cell::from(text).style(style)
}
