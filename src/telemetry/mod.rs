//! Live parameter values published from the audio thread for display.
//!
//! Each key owns one atomic slot. The audio thread overwrites it whenever it
//! likes; a UI reads whatever is there. No queue, no back-pressure, no
//! ordering with respect to anything else. Values read here are for
//! drawing only and must never feed back into control decisions.

use std::sync::atomic::{AtomicBool, Ordering};

use atomic_float::AtomicF64;

/// Handle to a registered telemetry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TelemetryKey(usize);

#[derive(Debug)]
struct LiveSlot {
    value: AtomicF64,
    written: AtomicBool,
}

/// Fixed set of live-value slots, registered up front by name.
#[derive(Debug)]
pub struct Telemetry {
    names: Box<[String]>,
    slots: Box<[LiveSlot]>,
}

impl Telemetry {
    pub fn builder() -> TelemetryBuilder {
        TelemetryBuilder::default()
    }

    /// Overwrite the live value for `key`. Realtime-safe: one atomic store.
    #[inline]
    pub fn set_live_value(&self, key: TelemetryKey, value: f64) {
        if let Some(slot) = self.slots.get(key.0) {
            slot.value.store(value, Ordering::Relaxed);
            slot.written.store(true, Ordering::Release);
        }
    }

    /// Last stored value for `key`, or `fallback` if it was never set.
    pub fn get(&self, key: TelemetryKey, fallback: f64) -> f64 {
        match self.slots.get(key.0) {
            Some(slot) if slot.written.load(Ordering::Acquire) => slot.value.load(Ordering::Relaxed),
            _ => fallback,
        }
    }

    /// Last stored value for the key named `name`, or `fallback` if it was
    /// never set or never registered.
    pub fn get_live_value(&self, name: &str, fallback: f64) -> f64 {
        match self.key(name) {
            Some(key) => self.get(key, fallback),
            None => fallback,
        }
    }

    pub fn key(&self, name: &str) -> Option<TelemetryKey> {
        self.names.iter().position(|n| n == name).map(TelemetryKey)
    }

    pub fn name(&self, key: TelemetryKey) -> Option<&str> {
        self.names.get(key.0).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every key with its current value (`None` if never set). Non-RT.
    pub fn snapshot(&self) -> Vec<(&str, Option<f64>)> {
        self.names
            .iter()
            .zip(self.slots.iter())
            .map(|(name, slot)| {
                let value = slot
                    .written
                    .load(Ordering::Acquire)
                    .then(|| slot.value.load(Ordering::Relaxed));
                (name.as_str(), value)
            })
            .collect()
    }
}

/// Registers telemetry keys before the channel is shared.
#[derive(Debug, Default)]
pub struct TelemetryBuilder {
    names: Vec<String>,
}

impl TelemetryBuilder {
    /// Register `name`, returning its handle. Registering the same name
    /// twice returns the same handle.
    pub fn register(&mut self, name: impl Into<String>) -> TelemetryKey {
        let name = name.into();
        if let Some(i) = self.names.iter().position(|n| *n == name) {
            return TelemetryKey(i);
        }
        self.names.push(name);
        TelemetryKey(self.names.len() - 1)
    }

    pub fn build(self) -> Telemetry {
        let slots = self
            .names
            .iter()
            .map(|_| LiveSlot {
                value: AtomicF64::new(0.0),
                written: AtomicBool::new(false),
            })
            .collect();

        Telemetry {
            names: self.names.into_boxed_slice(),
            slots,
        }
    }
}
