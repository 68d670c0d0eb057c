//! Telemetry widget - every live value the rack publishes

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Row, Table},
    Frame,
};

use saavy_core::telemetry::Telemetry;

/// Render the telemetry table
pub fn render_telemetry(frame: &mut Frame, area: Rect, telemetry: &Telemetry) {
    let rows = telemetry.snapshot().into_iter().map(|(name, value)| {
        let (text, color) = match value {
            Some(v) => (format!("{:>10.3}", v), Color::White),
            None => (format!("{:>10}", "-"), Color::DarkGray),
        };
        Row::new(vec![name.to_owned(), text]).style(Style::default().fg(color))
    });

    let table = Table::new(rows, [Constraint::Length(20), Constraint::Length(12)])
        .header(Row::new(vec!["key", "value"]).style(Style::default().fg(Color::Cyan)))
        .block(Block::default().title(" Telemetry ").borders(Borders::ALL));

    frame.render_widget(table, area);
}
