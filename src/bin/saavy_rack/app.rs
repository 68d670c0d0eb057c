//! RackApp - builds the rack, opens the audio device, runs the UI

use std::sync::Arc;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;

use saavy_core::{
    dsp::{OscillatorWaveform, Wavetable, WavetableError},
    module::{sequencer::GATE_OUT, ModuleRegistry},
    sequencing::StepTable,
    state::{BackgroundLoader, Generation, LoadError},
    transport::{HostTransport, TransportMessage},
    EngineConfig, Rack, MAX_BLOCK_SIZE,
};

use super::ui::{ScopeFrame, UiApp, UiInit};

/// Transport requests from the UI to the audio thread
const CONTROL_QUEUE_SIZE: usize = 64;
/// Audio samples from the audio thread to the scope
const SCOPE_QUEUE_SIZE: usize = 8192;

pub struct RackApp {
    bpm: f64,
    pitch_hz: f32,
    waveform: OscillatorWaveform,
    steps: StepTable,
}

impl RackApp {
    pub fn new() -> Self {
        Self {
            bpm: 120.0,
            pitch_hz: 220.0,
            waveform: OscillatorWaveform::Sine,
            steps: StepTable::new(8),
        }
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    /// Oscillator base pitch; the sequencer's value output moves around it.
    pub fn pitch(mut self, hz: f32) -> Self {
        self.pitch_hz = hz;
        self
    }

    pub fn waveform(mut self, waveform: OscillatorWaveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn steps(mut self, steps: StepTable) -> Self {
        self.steps = steps;
        self
    }

    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let registry = ModuleRegistry::builtin();
        let (mut rack, handle) = Rack::builder(&registry)
            .config(EngineConfig::default().sample_rate(sample_rate))
            .module("seq", "step_sequencer")
            .module("osc", "oscillator")
            .connect("seq", "value", "osc", "pitch")
            .connect("seq", "gate", "osc", "level")
            .output("osc", "out")
            .build()
            .wrap_err("failed to build rack")?;

        handle.step_table("seq")?.publish(self.steps);
        handle.oscillator("osc")?.set_pitch_hz(self.pitch_hz);

        let loader = BackgroundLoader::new("wavetable", Arc::clone(handle.wavetable("osc")?));
        request_wavetable(&loader, self.waveform)?;

        let (control_tx, mut control_rx) = RingBuffer::<TransportMessage>::new(CONTROL_QUEUE_SIZE);
        let (mut scope_tx, scope_rx) = RingBuffer::<ScopeFrame>::new(SCOPE_QUEUE_SIZE);

        let mut transport = HostTransport::new(sample_rate as f64, self.bpm);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                transport.drain(&mut control_rx);

                let total_frames = data.len() / channels;
                let mut frames_written = 0;
                while frames_written < total_frames {
                    let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames_to_render];

                    rack.process(&transport.state(), block);
                    transport.advance(frames_to_render);
                    // "seq" renders first, so its buffers are at index 0
                    let gate = rack.output(0, GATE_OUT).unwrap_or(&[]);

                    // Copy to output (mono to all channels)
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                        // Scope is lossy: drop samples when the UI falls behind
                        let _ = scope_tx.push(ScopeFrame {
                            audio: s,
                            gate: gate.get(i).copied().unwrap_or(0.0),
                        });
                    }

                    frames_written += frames_to_render;
                }
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )?;

        stream.play()?;
        log::info!("playing at {} Hz, {} channels", sample_rate, channels);

        let init = UiInit {
            bpm: self.bpm,
            sample_rate,
            waveform: self.waveform,
        };
        let mut app = UiApp::new(handle.clone(), loader, control_tx, scope_rx, init);
        let mut terminal = ratatui::init();
        let result = app.run(&mut terminal);
        ratatui::restore();

        // Stop the callback before tearing down what it reads
        drop(stream);
        let summary = app.shutdown();
        let released = handle.force_reclaim();
        log::info!(
            "wavetable loads: {} published, {} stale, {} failed; released {} snapshots",
            summary.accepted,
            summary.stale,
            summary.failed,
            released
        );

        result
    }
}

impl Default for RackApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Render `waveform` into a fresh table on the loader thread.
pub fn request_wavetable(
    loader: &BackgroundLoader<Wavetable>,
    waveform: OscillatorWaveform,
) -> Result<Generation, LoadError> {
    loader.request(move || Ok::<_, WavetableError>(Wavetable::new(waveform, Wavetable::DEFAULT_SIZE)))
}
