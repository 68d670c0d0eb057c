use std::sync::atomic::Ordering;
use std::sync::Arc;

use atomic_float::AtomicF32;

use super::{Capabilities, ProcessCtx};
use crate::config::EngineConfig;
use crate::dsp::{Wavetable, WavetableOscillator};
use crate::routing::{
    BlockRouting, ConnectionCache, ParamRange, RelativeCurve, RouteIndex, RoutingError,
    RoutingTable,
};
use crate::state::StateSlot;
use crate::telemetry::{Telemetry, TelemetryBuilder, TelemetryKey};

pub const OUTPUTS: [&str; 1] = ["out"];
pub const AUDIO_OUT: usize = 0;

pub const PITCH: RouteIndex = RouteIndex::new(0);
pub const LEVEL: RouteIndex = RouteIndex::new(1);
pub const PITCH_OCTAVES: f32 = 4.0;

/// Knob values, written by the control thread and read once per sample.
#[derive(Debug)]
pub struct OscillatorParams {
    pitch_hz: AtomicF32,
    level: AtomicF32,
}

impl OscillatorParams {
    pub fn new(pitch_hz: f32, level: f32) -> Self {
        Self {
            pitch_hz: AtomicF32::new(ParamRange::AUDIO_HZ.clamp(pitch_hz)),
            level: AtomicF32::new(ParamRange::UNIT.clamp(level)),
        }
    }

    pub fn pitch_hz(&self) -> f32 {
        self.pitch_hz.load(Ordering::Relaxed)
    }

    pub fn set_pitch_hz(&self, hz: f32) {
        self.pitch_hz
            .store(ParamRange::AUDIO_HZ.clamp(hz), Ordering::Relaxed);
    }

    pub fn level(&self) -> f32 {
        self.level.load(Ordering::Relaxed)
    }

    pub fn set_level(&self, level: f32) {
        self.level
            .store(ParamRange::UNIT.clamp(level), Ordering::Relaxed);
    }
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self::new(220.0, 0.5)
    }
}

#[derive(Debug, Clone, Copy)]
struct OscillatorKeys {
    pitch: TelemetryKey,
    level: TelemetryKey,
}

/// Wavetable oscillator with modulatable pitch and level.
///
/// The table is a published snapshot; until one is loaded the module
/// outputs silence.
pub struct OscillatorModule {
    osc: WavetableOscillator,
    wavetable: Arc<StateSlot<Wavetable>>,
    params: Arc<OscillatorParams>,
    table: Arc<RoutingTable>,
    cache: ConnectionCache,
    keys: Option<OscillatorKeys>,
    last_pitch: f32,
    last_level: f32,
}

impl OscillatorModule {
    pub const TYPE_NAME: &'static str = "oscillator";
    pub const CAPABILITIES: Capabilities = Capabilities {
        outputs: OUTPUTS.len(),
        follows_transport: false,
        loads_state: true,
    };

    pub fn routing_table() -> Result<RoutingTable, RoutingError> {
        RoutingTable::builder()
            .relative(
                "pitch",
                0,
                0,
                RelativeCurve::Exponential {
                    octaves: PITCH_OCTAVES,
                },
                ParamRange::AUDIO_HZ,
            )
            .absolute("level", 0, 1, ParamRange::UNIT)
            .build()
    }

    pub fn new(config: &EngineConfig) -> Result<Self, RoutingError> {
        let table = Arc::new(Self::routing_table()?);
        let cache = ConnectionCache::new(&table);
        Ok(Self {
            osc: WavetableOscillator::new(config.sample_rate),
            wavetable: Arc::new(StateSlot::new()),
            params: Arc::new(OscillatorParams::default()),
            table,
            cache,
            keys: None,
            last_pitch: 0.0,
            last_level: 0.0,
        })
    }

    pub fn routes(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    pub fn wavetable(&self) -> &Arc<StateSlot<Wavetable>> {
        &self.wavetable
    }

    pub fn params(&self) -> &Arc<OscillatorParams> {
        &self.params
    }

    pub fn prepare(&mut self, config: &EngineConfig) {
        self.osc.set_sample_rate(config.sample_rate);
        self.osc.reset();
    }

    pub fn process(&mut self, ctx: &ProcessCtx<'_>, outputs: &mut [Vec<f32>]) {
        let Some(out) = outputs.get_mut(AUDIO_OUT) else {
            return;
        };
        let n = ctx.frames.min(out.len());
        let out = &mut out[..n];

        let wavetable = self.wavetable.load();
        let Some(wavetable) = wavetable.as_deref() else {
            out.fill(0.0);
            self.last_level = 0.0;
            return;
        };

        self.cache.refresh(&self.table);
        let routing = BlockRouting::new(&self.table, &self.cache, ctx.inputs);
        let pitch = routing.signal(PITCH);
        let level = routing.signal(LEVEL);
        let base_pitch = self.params.pitch_hz();
        let base_level = self.params.level();

        for (i, sample) in out.iter_mut().enumerate() {
            let hz = pitch.at(base_pitch, i);
            let gain = level.at(base_level, i);
            *sample = self.osc.next(wavetable, hz) * gain;
            self.last_pitch = hz;
            self.last_level = gain;
        }
    }

    pub fn register_telemetry(&mut self, id: &str, builder: &mut TelemetryBuilder) {
        self.keys = Some(OscillatorKeys {
            pitch: builder.register(format!("{id}.pitch")),
            level: builder.register(format!("{id}.level")),
        });
    }

    pub fn publish_telemetry(&self, telemetry: &Telemetry) {
        if let Some(keys) = self.keys {
            telemetry.set_live_value(keys.pitch, self.last_pitch as f64);
            telemetry.set_live_value(keys.level, self.last_level as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::OscillatorWaveform;
    use crate::routing::{InputBank, NoInputs};
    use crate::transport::TransportState;

    fn ctx<'a>(transport: &'a TransportState, inputs: &'a dyn crate::routing::CvSource, frames: usize) -> ProcessCtx<'a> {
        ProcessCtx {
            transport,
            inputs,
            frames,
        }
    }

    #[test]
    fn test_silent_without_wavetable() {
        let mut module = OscillatorModule::new(&EngineConfig::default()).unwrap();
        let transport = TransportState::default();
        let mut outputs = vec![vec![1.0; 32]];
        module.process(&ctx(&transport, &NoInputs, 32), &mut outputs);
        assert!(outputs[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_level_scales_output() {
        let mut module = OscillatorModule::new(&EngineConfig::default()).unwrap();
        module
            .wavetable()
            .publish(Wavetable::new(OscillatorWaveform::Square, 64));
        module.params().set_level(0.25);

        let transport = TransportState::default();
        let mut outputs = vec![vec![0.0; 16]];
        module.process(&ctx(&transport, &NoInputs, 16), &mut outputs);
        assert_eq!(outputs[0][0], 0.25);
    }

    #[test]
    fn test_level_cv_in_absolute_mode() {
        let mut module = OscillatorModule::new(&EngineConfig::default()).unwrap();
        module
            .wavetable()
            .publish(Wavetable::new(OscillatorWaveform::Square, 64));
        module.routes().set_connected("level", true);

        let mut bank = InputBank::for_table(module.routes(), 16);
        bank.set_len(16);
        if let Some(cv) = bank.channel_mut(0, 1) {
            cv.fill(0.0);
        }

        let transport = TransportState::default();
        let mut outputs = vec![vec![1.0; 16]];
        module.process(&ctx(&transport, &bank, 16), &mut outputs);
        // Absolute cv 0 → level 0, whatever the knob says
        assert!(outputs[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_params_are_clamped() {
        let params = OscillatorParams::default();
        params.set_pitch_hz(5.0);
        params.set_level(3.0);
        assert_eq!(params.pitch_hz(), 20.0);
        assert_eq!(params.level(), 1.0);
    }
}
