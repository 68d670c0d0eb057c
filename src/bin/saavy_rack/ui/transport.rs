//! Transport bar widget - shows play state, tempo, wavetable and audio stats

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_core::{dsp::OscillatorWaveform, routing::ModMode};

/// Audio statistics for display
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    /// Compute audio stats from a buffer
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub struct TransportView {
    pub playing: bool,
    pub bpm: f64,
    pub sample_rate: f32,
    pub waveform: OscillatorWaveform,
    /// Generation of the wavetable currently published
    pub generation: u64,
    pub pitch_mode: ModMode,
}

/// Render the transport bar
pub fn render_transport(frame: &mut Frame, area: Rect, view: &TransportView, audio_stats: &AudioStats) {
    let block = Block::default().title(" saavy-rack ").borders(Borders::ALL);

    let play_symbol = if view.playing { "▶" } else { "■" };
    let play_state_str = if view.playing { "Playing" } else { "Stopped" };

    let line = Line::from(vec![
        Span::styled(
            format!(" BPM: {:.0}  ", view.bpm),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{} {}  ", play_symbol, play_state_str),
            Style::default().fg(if view.playing {
                Color::Green
            } else {
                Color::Yellow
            }),
        ),
        Span::styled(
            format!("Wave: {:?} (gen {})  ", view.waveform, view.generation),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Pitch CV: {:?}  ", view.pitch_mode),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("{:.1}kHz  ", view.sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", audio_stats.peak, audio_stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}
