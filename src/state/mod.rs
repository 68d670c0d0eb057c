//! Publication of immutable state from background producers to the audio thread.
//!
//! A [`StateSlot`] holds the current snapshot behind an atomic pointer.
//! Producers swap in fully-built replacements; the audio thread loads
//! whatever is current without locking or allocating. Superseded snapshots
//! are retired into a reclaim queue and destroyed once no reader can still
//! reach them.

/// Background build-and-publish workers.
pub mod loader;
/// Deferred destruction of retired snapshots.
pub mod reclaim;
/// The publication point itself.
pub mod slot;

pub use loader::{BackgroundLoader, LoadError, LoadSummary};
pub use reclaim::{ReclaimQueue, ReclaimReport};
pub use slot::{Generation, PublishOutcome, Retired, Snapshot, StateSlot};
