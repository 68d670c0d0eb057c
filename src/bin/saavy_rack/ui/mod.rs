//! TUI module for saavy-rack
//!
//! Shows the transport, the step row, every telemetry value and an
//! oscilloscope of the output. All of it is read from lossy channels;
//! nothing drawn here feeds back into the audio thread except key presses.

mod steps;
mod telemetry;
mod transport;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::{Consumer, Producer};
use std::time::Duration;

use saavy_core::{
    dsp::{OscillatorWaveform, Wavetable},
    routing::ModMode,
    state::{BackgroundLoader, LoadSummary},
    transport::TransportMessage,
    RackHandle,
};

use super::app::request_wavetable;
use steps::render_steps;
use telemetry::render_telemetry;
use transport::{render_transport, AudioStats, TransportView};
use waveform::render_waveform;
pub use waveform::ScopeFrame;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;

/// Values fixed for the lifetime of the UI
pub struct UiInit {
    pub bpm: f64,
    pub sample_rate: f32,
    pub waveform: OscillatorWaveform,
}

pub struct UiApp {
    handle: RackHandle,
    loader: BackgroundLoader<Wavetable>,
    control_tx: Producer<TransportMessage>,
    scope_rx: Consumer<ScopeFrame>,
    scope: Vec<ScopeFrame>,
    audio_buffer: Vec<f32>,
    init: UiInit,
    waveform: OscillatorWaveform,
    /// What we last asked the transport to do; the audio thread owns the truth
    playing: bool,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        handle: RackHandle,
        loader: BackgroundLoader<Wavetable>,
        control_tx: Producer<TransportMessage>,
        scope_rx: Consumer<ScopeFrame>,
        init: UiInit,
    ) -> Self {
        Self {
            handle,
            loader,
            control_tx,
            scope_rx,
            scope: vec![ScopeFrame::default(); VIS_BUFFER_SIZE],
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            waveform: init.waveform,
            init,
            playing: false,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();

            terminal.draw(|frame| self.render(frame))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        Ok(())
    }

    /// Wait for outstanding wavetable loads.
    pub fn shutdown(&self) -> LoadSummary {
        self.loader.wait_idle()
    }

    fn poll_audio(&mut self) {
        while let Ok(sample) = self.scope_rx.pop() {
            self.scope.push(sample);
        }
        if self.scope.len() > VIS_BUFFER_SIZE {
            let excess = self.scope.len() - VIS_BUFFER_SIZE;
            self.scope.drain(0..excess);
        }
        self.audio_buffer.clear();
        self.audio_buffer.extend(self.scope.iter().map(|f| f.audio));
    }

    fn send(&mut self, message: TransportMessage) {
        if self.control_tx.push(message).is_err() {
            log::warn!("control queue full, dropped {:?}", message);
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => {
                self.send(TransportMessage::Toggle);
                self.playing = !self.playing;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.waveform = self.waveform.next();
                if let Err(err) = request_wavetable(&self.loader, self.waveform) {
                    log::warn!("could not start wavetable load: {}", err);
                }
            }
            KeyCode::Char('m') | KeyCode::Char('M') => self.toggle_pitch_mode(),
            KeyCode::Char(c @ '1'..='8') => {
                let index = c as usize - '1' as usize;
                self.toggle_gate(index);
            }
            _ => {}
        }
    }

    fn toggle_gate(&self, index: usize) {
        let result = self.handle.edit_steps("seq", |table| {
            let mut step = table.step(index);
            step.gate_level = if step.gate_level >= table.gate_threshold() {
                0.0
            } else {
                1.0
            };
            table.set_step(index, step);
        });
        if let Err(err) = result {
            log::warn!("step edit failed: {}", err);
        }
    }

    fn toggle_pitch_mode(&self) {
        let Ok(routes) = self.handle.routes("osc") else {
            return;
        };
        let next = match routes.mode("pitch") {
            Some(ModMode::Relative) => ModMode::Absolute,
            _ => ModMode::Relative,
        };
        routes.set_mode("pitch", next);
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Transport bar
                Constraint::Length(5), // Steps
                Constraint::Min(6),    // Telemetry
                Constraint::Length(8), // Waveform
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        let telemetry = self.handle.telemetry();
        let pitch_mode = self
            .handle
            .routes("osc")
            .ok()
            .and_then(|r| r.mode("pitch"))
            .unwrap_or(ModMode::Relative);
        let generation = self
            .handle
            .wavetable("osc")
            .map(|slot| slot.accepted_generation().get())
            .unwrap_or(0);

        let view = TransportView {
            playing: self.playing,
            bpm: self.init.bpm,
            sample_rate: self.init.sample_rate,
            waveform: self.waveform,
            generation,
            pitch_mode,
        };
        render_transport(frame, chunks[0], &view, &AudioStats::from_buffer(&self.audio_buffer));

        let current = telemetry.get_live_value("seq.step", 0.0) as usize;
        let table = self
            .handle
            .step_table("seq")
            .ok()
            .and_then(|slot| slot.load_full());
        render_steps(frame, chunks[1], table.as_deref(), current);

        render_telemetry(frame, chunks[2], telemetry);
        render_waveform(frame, chunks[3], &self.scope);

        let help = Paragraph::new(
            " [Q] Quit  [Space] Play/Stop  [R] Next wavetable  [1-8] Toggle gate  [M] Pitch mode",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[4]);
    }
}
