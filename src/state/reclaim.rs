use std::sync::Arc;

use parking_lot::Mutex;

/*
Deferred Reclamation
====================

When a producer replaces the snapshot in a `StateSlot`, the old snapshot
cannot simply be dropped. The audio thread may have loaded it a moment
before the swap and still be reading from it. Dropping our reference is
harmless (the reader keeps its own), but whichever thread drops the LAST
reference pays for the deallocation, and freeing a few hundred megabytes
of decoded audio takes far longer than an audio callback is allowed to.

So retired snapshots go into a queue instead, and the queue decides when
they die.

Vocabulary
----------

  retire      Hand a superseded snapshot to the queue. Non-RT only: pushing
              may grow the queue's storage.

  reclaim     Drop every queued snapshot that nobody else references.
              Once the queue holds the only reference, no reader can reach
              it again, so dropping it is safe.

  in use      A queued snapshot whose strong count is above one. Some
              reader captured it before it was retired. It stays queued
              until a later pass finds it unreferenced.


Who Calls What
--------------

    producer thread          audio thread             teardown
    ───────────────          ────────────             ────────
    retire(old)  ─lock─┐
                       │     try_reclaim() ─try_lock─┐
                       └──→  [ queue ]  ←────────────┘
                                          ←─lock─ force_reclaim()

The audio thread never waits for the guard. If a producer happens to hold
it, `try_reclaim` reports `Contended` and the work rolls over to the next
cycle. Nothing is lost; it is only late.
*/

/// Result of one non-blocking reclaim pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimReport {
    /// The guard was held elsewhere; nothing was touched.
    Contended,
    /// The pass ran.
    Ran {
        /// Snapshots destroyed during this pass.
        released: usize,
        /// Snapshots still referenced by a reader, kept for a later pass.
        in_use: usize,
    },
}

impl ReclaimReport {
    /// Number of snapshots destroyed by this pass (zero when contended).
    pub fn released(&self) -> usize {
        match *self {
            ReclaimReport::Contended => 0,
            ReclaimReport::Ran { released, .. } => released,
        }
    }
}

/// Unordered collection of retired snapshots awaiting destruction.
pub struct ReclaimQueue<T> {
    retired: Mutex<Vec<Arc<T>>>,
}

impl<T> ReclaimQueue<T> {
    /// Default number of retired entries the queue can hold before it grows.
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            retired: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Queue a superseded snapshot for later destruction. Non-RT.
    pub fn retire(&self, state: Arc<T>) {
        self.retired.lock().push(state);
    }

    /// Destroy every retired snapshot nobody else references.
    ///
    /// Never blocks: on contention the pass is skipped. Never allocates:
    /// entries are dropped in place. Safe to call once per audio cycle.
    pub fn try_reclaim(&self) -> ReclaimReport {
        let Some(mut retired) = self.retired.try_lock() else {
            return ReclaimReport::Contended;
        };

        let before = retired.len();
        retired.retain(|state| Arc::strong_count(state) > 1);
        let in_use = retired.len();

        ReclaimReport::Ran {
            released: before - in_use,
            in_use,
        }
    }

    /// Blocking reclaim for shutdown, preset unload and teardown.
    ///
    /// Drops the queue's reference to every retired snapshot, whether or
    /// not a reader still holds one, and returns how many were released.
    /// Afterwards the queue is empty.
    pub fn force_reclaim(&self) -> usize {
        let mut retired = self.retired.lock();
        let released = retired.len();
        retired.clear();
        released
    }

    /// Number of snapshots waiting in the queue. Non-RT.
    pub fn pending(&self) -> usize {
        self.retired.lock().len()
    }

    /// Hold the guard for the lifetime of the returned value.
    ///
    /// Used to exercise the contended path of `try_reclaim`.
    #[cfg(test)]
    pub(crate) fn hold(&self) -> parking_lot::MutexGuard<'_, Vec<Arc<T>>> {
        self.retired.lock()
    }
}

impl<T> Default for ReclaimQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ReclaimQueue<T> {
    fn drop(&mut self) {
        let pending = self.retired.get_mut().len();
        if pending > 0 {
            log::warn!(
                "reclaim queue dropped with {} retired snapshot(s); call force_reclaim() before teardown",
                pending
            );
        }
    }
}
