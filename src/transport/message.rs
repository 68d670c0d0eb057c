#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Control-thread requests for the host transport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TransportMessage {
    Play,
    Stop,
    Toggle,
    /// Jump to a song position, in quarter-note beats.
    Locate { beats: f64 },
    SetBpm { bpm: f64 },
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<TransportMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<TransportMessage> {
    fn pop(&mut self) -> Option<TransportMessage> {
        Consumer::pop(self).ok()
    }
}

/// Plain queue for tests and offline rendering.
impl MessageReceiver for std::collections::VecDeque<TransportMessage> {
    fn pop(&mut self) -> Option<TransportMessage> {
        self.pop_front()
    }
}
