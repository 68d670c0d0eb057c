//! Oscilloscope widget - output audio with the sequencer gate drawn over it

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// One sample pushed from the audio thread to the scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeFrame {
    pub audio: f32,
    /// The step sequencer's gate output at the same sample.
    pub gate: f32,
}

/// Render the oscilloscope
///
/// The gate trace shares the audio's y axis, so an open gate sits on the
/// top edge and a closed one on the centre line. Step edges show up as the
/// gate's fade ramps.
pub fn render_waveform(frame: &mut Frame, area: Rect, scope: &[ScopeFrame]) {
    let open = scope.last().is_some_and(|f| f.gate > 0.5);
    let title = Span::styled(
        if open { " Output  [gate open] " } else { " Output  [gate closed] " },
        Style::default().fg(if open { Color::Yellow } else { Color::DarkGray }),
    );
    let block = Block::default().title(title).borders(Borders::ALL);

    let len = scope.len().max(1) as f64;
    let x = |i: usize| i as f64 / len;
    let audio: Vec<(f64, f64)> = scope
        .iter()
        .enumerate()
        .map(|(i, f)| (x(i), f.audio as f64))
        .collect();
    let gate: Vec<(f64, f64)> = scope
        .iter()
        .enumerate()
        .map(|(i, f)| (x(i), f.gate as f64))
        .collect();

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&audio),
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&gate),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-1.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
