use saavy_core::module::ModuleRegistry;
use saavy_core::routing::NoInputs;
use saavy_core::sequencing::{
    ClockMode, Duration, SequencerFrame, SequencerStep, StepSequencer, StepTable,
};
use saavy_core::transport::{HostTransport, TransportMessage, TransportState};
use saavy_core::{EngineConfig, Rack};

const SAMPLE_RATE: f32 = 48_000.0;
const BLOCK: usize = 128;

fn eight_steps(clock: ClockMode) -> StepTable {
    StepTable::new(8)
        .with_steps((0..8).map(|i| SequencerStep::new(i as f32 / 8.0).gate(1.0).trigger()))
        .with_clock(clock)
}

fn sequencer() -> StepSequencer {
    StepSequencer::new(&EngineConfig::default().sample_rate(SAMPLE_RATE), 8).unwrap()
}

/// Sample indices where the trigger output goes high.
fn trigger_onsets(frames: &[SequencerFrame]) -> Vec<usize> {
    let mut previous = 0.0;
    let mut onsets = Vec::new();
    for (i, frame) in frames.iter().enumerate() {
        if frame.trigger > 0.0 && previous == 0.0 {
            onsets.push(i);
        }
        previous = frame.trigger;
    }
    onsets
}

#[test]
fn free_clock_advances_once_per_period() {
    let mut seq = sequencer();
    let table = eight_steps(ClockMode::FreeRunning { rate_hz: 2.0 });
    let transport = TransportState::playing(0.0, 120.0);

    let mut frames = vec![SequencerFrame::default(); 24_000 * 4];
    for chunk in frames.chunks_mut(BLOCK) {
        seq.advance(Some(&table), &transport, &NoInputs, chunk);
    }

    // Step 0 on the first sample, then one advance every 24000 samples
    assert_eq!(trigger_onsets(&frames), vec![0, 23_999, 47_999, 71_999, 95_999]);
    assert_eq!(seq.current_step(), 4);

    // Each pulse is 1 ms wide
    let pulse = frames[23_999..].iter().take_while(|f| f.trigger == 1.0).count();
    assert_eq!(pulse, 48);

    // The value follows the step on the advance sample itself
    assert_eq!(frames[23_998].value, 0.0);
    assert_eq!(frames[23_999].value, 1.0 / 8.0);
}

#[test]
fn one_advance_after_exactly_24000_samples() {
    let mut seq = sequencer();
    let table = eight_steps(ClockMode::FreeRunning { rate_hz: 2.0 });
    let transport = TransportState::playing(0.0, 120.0);

    let mut frames = vec![SequencerFrame::default(); 24_000];
    for chunk in frames.chunks_mut(BLOCK) {
        seq.advance(Some(&table), &transport, &NoInputs, chunk);
    }
    assert_eq!(seq.current_step(), 1);
    assert_eq!(trigger_onsets(&frames).len(), 2);
}

#[test]
fn host_sync_sixteenths_follow_the_transport() {
    let mut seq = sequencer();
    let table = eight_steps(ClockMode::HostSync {
        division: Duration::SIXTEENTH,
    });
    let mut transport = HostTransport::new(SAMPLE_RATE as f64, 120.0);
    transport.apply(TransportMessage::Play);

    // 120 bpm at 48 kHz: a sixteenth is 6000 samples
    let mut frames = vec![SequencerFrame::default(); 6_000 * 9];
    for chunk in frames.chunks_mut(BLOCK) {
        seq.advance(Some(&table), &transport.state(), &NoInputs, chunk);
        transport.advance(chunk.len());
    }

    let expected: Vec<usize> = (0..9).map(|i| i * 6_000).collect();
    assert_eq!(trigger_onsets(&frames), expected);
    // Eight advances over eight steps lands back on step 0
    assert_eq!(seq.current_step(), 0);
}

#[test]
fn stop_closes_the_gate_in_the_same_block() {
    let mut seq = sequencer();
    let table = eight_steps(ClockMode::FreeRunning { rate_hz: 2.0 });

    let mut frames = vec![SequencerFrame::default(); 10_000];
    for chunk in frames.chunks_mut(BLOCK) {
        seq.advance(
            Some(&table),
            &TransportState::playing(0.0, 120.0),
            &NoInputs,
            chunk,
        );
    }
    assert_eq!(frames.last().map(|f| f.gate), Some(1.0));

    let mut stopped = [SequencerFrame::default(); BLOCK];
    seq.advance(
        Some(&table),
        &TransportState::stopped(120.0),
        &NoInputs,
        &mut stopped,
    );

    // No fade tail: the very first stopped sample is already closed
    assert!(stopped.iter().all(|f| f.gate == 0.0));
    assert!(stopped.iter().all(|f| f.trigger == 0.0));
    assert!(stopped.iter().all(|f| f.value == 0.0));
}

#[test]
fn restart_after_stop_begins_at_step_zero() {
    let mut seq = sequencer();
    let table = eight_steps(ClockMode::FreeRunning { rate_hz: 2.0 });
    let playing = TransportState::playing(0.0, 120.0);

    let mut frames = vec![SequencerFrame::default(); 30_000];
    for chunk in frames.chunks_mut(BLOCK) {
        seq.advance(Some(&table), &playing, &NoInputs, chunk);
    }
    assert_eq!(seq.current_step(), 1);

    let mut block = [SequencerFrame::default(); BLOCK];
    seq.advance(Some(&table), &TransportState::stopped(120.0), &NoInputs, &mut block);
    seq.advance(Some(&table), &playing, &NoInputs, &mut block);

    assert_eq!(seq.current_step(), 0);
    assert_eq!(block[0].trigger, 1.0);
    assert_eq!(block[0].value, 0.0);
}

#[test]
fn clock_mode_switch_mid_run_keeps_playing() {
    let registry = ModuleRegistry::builtin();
    let (mut rack, handle) = Rack::builder(&registry)
        .module("seq", "step_sequencer")
        .build()
        .unwrap();
    handle
        .edit_steps("seq", |table| {
            *table = eight_steps(ClockMode::FreeRunning { rate_hz: 2.0 });
        })
        .unwrap();

    let mut transport = HostTransport::new(SAMPLE_RATE as f64, 120.0);
    transport.apply(TransportMessage::Play);
    let mut out = [0.0f32; BLOCK];
    let mut render = |rack: &mut Rack, blocks: usize| -> Vec<usize> {
        (0..blocks)
            .map(|_| {
                rack.process(&transport.state(), &mut out);
                transport.advance(BLOCK);
                rack.telemetry().get_live_value("seq.step", -1.0) as usize
            })
            .collect()
    };

    // Past the first free-running advance, then onto the host clock
    let before = render(&mut rack, 30_000 / BLOCK);
    assert_eq!(before.last(), Some(&1));
    handle
        .edit_steps("seq", |table| {
            table.set_clock(ClockMode::HostSync {
                division: Duration::SIXTEENTH,
            })
        })
        .unwrap();

    // Four sixteenths at 120 bpm
    let after = render(&mut rack, 24_000 / BLOCK);
    assert!(after.iter().all(|&step| step < 8));
    let advances = after.windows(2).filter(|w| w[0] != w[1]).count();
    assert!((3..=5).contains(&advances), "{} advances", advances);
}
