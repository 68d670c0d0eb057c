use std::fmt::Display;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use thiserror::Error;

use super::slot::{Generation, PublishOutcome, StateSlot};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to spawn loader thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// How finished loads ended, counted since the last [`BackgroundLoader::wait_idle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub accepted: usize,
    /// Finished after a newer request had already published.
    pub stale: usize,
    /// Build closure returned an error or panicked.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
enum LoadResult {
    Published(PublishOutcome),
    Failed,
}

struct Workers {
    running: Vec<JoinHandle<LoadResult>>,
    summary: LoadSummary,
}

impl Workers {
    fn record(&mut self, handle: JoinHandle<LoadResult>) {
        match handle.join() {
            Ok(LoadResult::Published(PublishOutcome::Accepted)) => self.summary.accepted += 1,
            Ok(LoadResult::Published(PublishOutcome::Stale { .. })) => self.summary.stale += 1,
            Ok(LoadResult::Failed) => self.summary.failed += 1,
            Err(_) => {
                log::error!("loader thread panicked");
                self.summary.failed += 1;
            }
        }
    }

    fn reap_finished(&mut self) {
        let mut i = 0;
        while i < self.running.len() {
            if self.running[i].is_finished() {
                let handle = self.running.swap_remove(i);
                self.record(handle);
            } else {
                i += 1;
            }
        }
    }
}

/// Builds state on worker threads and publishes it into a [`StateSlot`].
///
/// Each request takes a generation ticket up front, so whichever request
/// was made last wins even if an older one finishes later. There is no
/// cancellation: a superseded load runs to completion and its result is
/// thrown away.
pub struct BackgroundLoader<T> {
    name: String,
    slot: Arc<StateSlot<T>>,
    workers: Mutex<Workers>,
}

impl<T> BackgroundLoader<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, slot: Arc<StateSlot<T>>) -> Self {
        Self {
            name: name.into(),
            slot,
            workers: Mutex::new(Workers {
                running: Vec::new(),
                summary: LoadSummary::default(),
            }),
        }
    }

    pub fn slot(&self) -> &Arc<StateSlot<T>> {
        &self.slot
    }

    /// Run `build` on a new worker thread and publish its result.
    ///
    /// A failed build is logged and leaves the slot untouched.
    pub fn request<F, E>(&self, build: F) -> Result<Generation, LoadError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Display,
    {
        let generation = self.slot.next_generation();
        let slot = Arc::clone(&self.slot);
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(format!("{}-loader", self.name))
            .spawn(move || match build() {
                Ok(state) => {
                    let outcome = slot.publish_generation(generation, Arc::new(state));
                    match outcome {
                        PublishOutcome::Accepted => {
                            log::info!("{}: published generation {}", name, generation.get())
                        }
                        PublishOutcome::Stale { latest } => log::debug!(
                            "{}: discarded generation {} (generation {} already published)",
                            name,
                            generation.get(),
                            latest.get()
                        ),
                    }
                    LoadResult::Published(outcome)
                }
                Err(err) => {
                    log::warn!("{}: load {} failed: {}", name, generation.get(), err);
                    LoadResult::Failed
                }
            })?;

        let mut workers = self.workers.lock();
        workers.reap_finished();
        workers.running.push(handle);
        Ok(generation)
    }

    /// Block until every outstanding load has finished. Non-RT.
    ///
    /// Returns the outcomes collected since the previous call.
    pub fn wait_idle(&self) -> LoadSummary {
        let mut workers = self.workers.lock();
        while let Some(handle) = workers.running.pop() {
            workers.record(handle);
        }
        std::mem::take(&mut workers.summary)
    }
}

impl<T> Drop for BackgroundLoader<T> {
    fn drop(&mut self) {
        let workers = self.workers.get_mut();
        for handle in workers.running.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_load_publishes_into_slot() {
        let slot = Arc::new(StateSlot::new());
        let loader = BackgroundLoader::new("wavetable", Arc::clone(&slot));

        loader
            .request(|| Ok::<_, String>(vec![0.5f32; 256]))
            .unwrap();
        let summary = loader.wait_idle();

        assert_eq!(summary.accepted, 1);
        assert_eq!(slot.load().as_deref().map(|t| t.len()), Some(256));
    }

    #[test]
    fn test_failed_load_leaves_slot_untouched() {
        let slot = Arc::new(StateSlot::with_state(7u32));
        let loader = BackgroundLoader::new("patch", Arc::clone(&slot));

        loader
            .request(|| Err::<u32, _>("file vanished"))
            .unwrap();
        let summary = loader.wait_idle();

        assert_eq!(summary.failed, 1);
        assert_eq!(slot.load().as_deref(), Some(&7));
    }

    #[test]
    fn test_slow_older_load_cannot_revert_newer() {
        let slot = Arc::new(StateSlot::new());
        let loader = BackgroundLoader::new("sample", Arc::clone(&slot));
        let (release_slow, wait_slow) = mpsc::channel::<()>();

        // Older request blocks until the newer one has published
        loader
            .request(move || {
                let _ = wait_slow.recv_timeout(Duration::from_secs(5));
                Ok::<_, String>("old")
            })
            .unwrap();
        loader.request(|| Ok::<_, String>("new")).unwrap();

        // Wait for the newer load to land before releasing the older one
        for _ in 0..500 {
            if slot.is_loaded() {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        release_slow.send(()).unwrap();

        let summary = loader.wait_idle();
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.stale, 1);
        assert_eq!(slot.load().as_deref(), Some(&"new"));
    }
}
