//! Room name prompt
//!
//! Displays the name being typed for a new room, with the cursor at its end.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

const PROMPT: &str = "New room: ";
const LINE_OFFSET_Y: u16 = 1; // inside top border
const BORDER_WIDTH: u16 = 1;

/// Render the prompt.
pub fn render(frame: &mut Frame, name: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Enter to create, Esc to cancel ");
    let paragraph = Paragraph::new(format!("{PROMPT}{name}"))
        .style(Style::default().fg(Color::White))
        .block(block);

    frame.render_widget(paragraph, area);

    let typed = (PROMPT.chars().count() + name.chars().count()) as u16;
    let max_x = area.x.saturating_add(area.width).saturating_sub(BORDER_WIDTH + 1);
    let cursor_x = area.x.saturating_add(BORDER_WIDTH).saturating_add(typed).min(max_x);
    let cursor_y = area.y.saturating_add(LINE_OFFSET_Y);

    frame.set_cursor_position((cursor_x, cursor_y));
}
