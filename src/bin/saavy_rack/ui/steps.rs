//! Step row widget - one cell per step, playhead highlighted

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_core::sequencing::StepTable;

/// Render the step row
pub fn render_steps(frame: &mut Frame, area: Rect, table: Option<&StepTable>, current: usize) {
    let block = Block::default().title(" Steps ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(table) = table else {
        frame.render_widget(Paragraph::new(" (no step table)"), inner);
        return;
    };

    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, table.max_steps() as u32); table.max_steps()])
        .split(inner);

    for (i, (cell, step)) in cells.iter().zip(table.steps()).enumerate() {
        let active = i < table.length();
        let open = step.gate_level >= table.gate_threshold();

        let mut style = match (active, open) {
            (false, _) => Style::default().fg(Color::DarkGray),
            (true, true) => Style::default().fg(Color::Green),
            (true, false) => Style::default().fg(Color::Gray),
        };
        if i == current {
            style = style.bg(Color::Blue).add_modifier(Modifier::BOLD);
        }

        let marker = match (open, step.trigger) {
            (true, true) => "█▲",
            (true, false) => "█ ",
            (false, true) => "·▲",
            (false, false) => "· ",
        };
        let text = vec![
            Line::from(format!("{} {}", i + 1, marker)),
            Line::from(format!("{:.2}", step.value)),
        ];
        frame.render_widget(Paragraph::new(text).style(style), *cell);
    }
}
