pub mod config; // Engine-wide settings
pub mod dsp;
pub mod module; // Module kinds hosted by a rack
pub mod persist; // Key-value save/restore
pub mod rack; // Composition root and render loop
pub mod routing; // Audio-rate modulation routes
pub mod sequencing; // Step sequencer and clocks
pub mod state; // Snapshot publication and deferred reclamation
pub mod telemetry; // Live values for display
pub mod transport;

pub use config::{ConfigError, EngineConfig};
pub use rack::{Rack, RackError, RackHandle};

pub const MAX_BLOCK_SIZE: usize = 2048;
