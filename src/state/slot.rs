use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwapOption, Guard};
use parking_lot::Mutex;

use super::reclaim::{ReclaimQueue, ReclaimReport};

/// A reader's view of the current snapshot, valid until dropped.
///
/// Holding a `Snapshot` keeps the state alive even if a producer swaps in
/// a newer one meanwhile. Keep it for one processing block, not longer.
pub type Snapshot<T> = Guard<Option<Arc<T>>>;

/// Monotonic ticket identifying one publish request.
///
/// Taken when a load is *requested*, so a slow load cannot overwrite the
/// result of a request made after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// The snapshot a slot held before an `exchange`.
///
/// Must be handed back via [`StateSlot::retire`] so the reclaim queue can
/// decide when it is safe to destroy.
#[must_use = "pass retired state to StateSlot::retire instead of dropping it"]
pub struct Retired<T>(Option<Arc<T>>);

impl<T> Retired<T> {
    /// `true` when the slot was empty before the exchange.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn peek(&self) -> Option<&T> {
        self.0.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The state is now current.
    Accepted,
    /// A newer request already published; the state was discarded.
    Stale { latest: Generation },
}

/// Single-writer, many-reader publication point for immutable snapshots.
///
/// Producers build state off the audio thread and publish it with one
/// atomic pointer swap. The audio thread calls [`load`](Self::load) once
/// per block and [`try_reclaim`](Self::try_reclaim) once per cycle.
pub struct StateSlot<T> {
    current: ArcSwapOption<T>,
    reclaim: ReclaimQueue<T>,
    // Serialises producers; never touched by the audio thread
    producer: Mutex<()>,
    issued: AtomicU64,
    accepted: AtomicU64,
}

impl<T> StateSlot<T> {
    /// An empty slot ("nothing loaded yet").
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            reclaim: ReclaimQueue::new(),
            producer: Mutex::new(()),
            issued: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    /// A slot that starts out holding `state`.
    pub fn with_state(state: T) -> Self {
        let slot = Self::new();
        slot.current.store(Some(Arc::new(state)));
        slot
    }

    /// Publish `next` and return whatever was active before.
    ///
    /// Any `load()` that starts after this returns sees `next`. Readers
    /// that loaded the previous snapshot keep a valid reference to it.
    /// A plain exchange also supersedes every generation ticket issued so
    /// far, so an in-flight background load cannot revert it.
    pub fn exchange(&self, next: Option<Arc<T>>) -> Retired<T> {
        let _producer = self.producer.lock();
        let previous = self.current.swap(next);
        let issued = self.issued.load(Ordering::Acquire);
        self.accepted.fetch_max(issued, Ordering::AcqRel);
        Retired(previous)
    }

    /// Queue a retired snapshot for deferred destruction.
    pub fn retire(&self, retired: Retired<T>) {
        if let Some(state) = retired.0 {
            self.reclaim.retire(state);
        }
    }

    /// Exchange and retire in one step.
    pub fn publish(&self, state: T) {
        let retired = self.exchange(Some(Arc::new(state)));
        self.retire(retired);
    }

    /// Take the next publish ticket.
    pub fn next_generation(&self) -> Generation {
        Generation(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Publish `state` only if `generation` is newer than the last accepted
    /// publish. A stale state is dropped here, on the producer's thread;
    /// no reader ever saw it.
    pub fn publish_generation(&self, generation: Generation, state: Arc<T>) -> PublishOutcome {
        let _producer = self.producer.lock();
        let latest = self.accepted.load(Ordering::Acquire);
        if generation.0 <= latest {
            return PublishOutcome::Stale {
                latest: Generation(latest),
            };
        }

        let previous = self.current.swap(Some(state));
        self.accepted.store(generation.0, Ordering::Release);
        if let Some(previous) = previous {
            self.reclaim.retire(previous);
        }
        PublishOutcome::Accepted
    }

    /// Generation of the last accepted publish (0 before any ticketed publish).
    pub fn accepted_generation(&self) -> Generation {
        Generation(self.accepted.load(Ordering::Acquire))
    }

    /// Current snapshot. Lock-free and allocation-free; realtime-safe.
    ///
    /// `None` is a valid answer: nothing has been published yet, or the
    /// slot was cleared.
    #[inline]
    pub fn load(&self) -> Snapshot<T> {
        self.current.load()
    }

    /// Current snapshot as an owned `Arc`. Non-RT convenience.
    pub fn load_full(&self) -> Option<Arc<T>> {
        self.current.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// Non-blocking reclaim pass, once per audio cycle.
    #[inline]
    pub fn try_reclaim(&self) -> ReclaimReport {
        self.reclaim.try_reclaim()
    }

    /// Blocking reclaim. Non-RT only.
    pub fn force_reclaim(&self) -> usize {
        self.reclaim.force_reclaim()
    }

    /// Retired snapshots not yet destroyed. Non-RT.
    pub fn pending(&self) -> usize {
        self.reclaim.pending()
    }

    /// Clear the slot and release everything it retired. Non-RT.
    ///
    /// Returns how many retired snapshots were released.
    pub fn unload(&self) -> usize {
        let retired = self.exchange(None);
        self.retire(retired);
        self.force_reclaim()
    }

    #[cfg(test)]
    pub(crate) fn reclaim_queue(&self) -> &ReclaimQueue<T> {
        &self.reclaim
    }
}

impl<T> Default for StateSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
