//! Host transport: play state, tempo and song position, sampled per block.

pub mod message;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use message::{MessageReceiver, TransportMessage};

/// The host's transport as seen at the first sample of a block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub is_playing: bool,
    /// Quarter-note beats since the start of the song.
    pub song_position_beats: f64,
    pub bpm: f64,
}

impl Default for TransportState {
    fn default() -> Self {
        Self::stopped(120.0)
    }
}

impl TransportState {
    pub fn stopped(bpm: f64) -> Self {
        Self {
            is_playing: false,
            song_position_beats: 0.0,
            bpm,
        }
    }

    pub fn playing(song_position_beats: f64, bpm: f64) -> Self {
        Self {
            is_playing: true,
            song_position_beats,
            bpm,
        }
    }

    /// Beats that elapse per sample at this tempo.
    #[inline]
    pub fn beats_per_sample(&self, sample_rate: f64) -> f64 {
        if sample_rate <= 0.0 {
            return 0.0;
        }
        self.bpm / 60.0 / sample_rate
    }

    /// Song position `frame` samples into the block.
    #[inline]
    pub fn beat_at(&self, frame: usize, sample_rate: f64) -> f64 {
        self.song_position_beats + frame as f64 * self.beats_per_sample(sample_rate)
    }
}

/// Stand-in host clock for the demo binary and tests.
///
/// Owns the transport on the audio thread. Control requests arrive through
/// a [`MessageReceiver`]; the position moves forward by whole blocks.
#[derive(Debug, Clone)]
pub struct HostTransport {
    state: TransportState,
    sample_rate: f64,
}

impl HostTransport {
    pub fn new(sample_rate: f64, bpm: f64) -> Self {
        Self {
            state: TransportState::stopped(bpm),
            sample_rate,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Apply every pending control message. Realtime-safe.
    pub fn drain<R: MessageReceiver + ?Sized>(&mut self, receiver: &mut R) {
        while let Some(message) = receiver.pop() {
            self.apply(message);
        }
    }

    pub fn apply(&mut self, message: TransportMessage) {
        match message {
            TransportMessage::Play => self.state.is_playing = true,
            TransportMessage::Stop => self.state.is_playing = false,
            TransportMessage::Toggle => self.state.is_playing = !self.state.is_playing,
            TransportMessage::Locate { beats } => {
                self.state.song_position_beats = beats.max(0.0);
            }
            TransportMessage::SetBpm { bpm } => {
                if bpm.is_finite() && bpm > 0.0 {
                    self.state.bpm = bpm;
                }
            }
        }
    }

    /// Move past a rendered block. The position only runs while playing.
    pub fn advance(&mut self, frames: usize) {
        if self.state.is_playing {
            self.state.song_position_beats = self.state.beat_at(frames, self.sample_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn test_beats_per_sample() {
        let state = TransportState::playing(0.0, 120.0);
        // 120 bpm = 2 beats per second
        assert_eq!(state.beats_per_sample(48_000.0), 2.0 / 48_000.0);
        assert!((state.beat_at(24_000, 48_000.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_position_only_moves_while_playing() {
        let mut transport = HostTransport::new(48_000.0, 120.0);
        transport.advance(48_000);
        assert_eq!(transport.state().song_position_beats, 0.0);

        transport.apply(TransportMessage::Play);
        transport.advance(48_000);
        assert!((transport.state().song_position_beats - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_drain_messages() {
        let mut transport = HostTransport::new(48_000.0, 120.0);
        let mut queue: VecDeque<_> = [
            TransportMessage::Toggle,
            TransportMessage::SetBpm { bpm: 90.0 },
            TransportMessage::SetBpm { bpm: -1.0 },
            TransportMessage::Locate { beats: 8.0 },
        ]
        .into_iter()
        .collect();

        transport.drain(&mut queue);
        assert!(queue.is_empty());
        assert_eq!(transport.state(), TransportState::playing(8.0, 90.0));
    }
}
