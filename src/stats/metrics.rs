//! Statistics for the stream registry

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of registry activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Components with an inner mapping (including emptied ones)
    pub components: usize,
    /// Registered streams across all components
    pub streams: usize,
    /// Total `publish` calls, including ones that reached no callback
    pub publishes: u64,
    /// Callback invocations that returned normally
    pub deliveries: u64,
    /// Callback panics caught while callbacks are isolated
    pub callback_panics: u64,
}

impl RegistryStats {
    /// Average number of successful deliveries per publish
    pub fn fan_out(&self) -> f64 {
        if self.publishes > 0 {
            self.deliveries as f64 / self.publishes as f64
        } else {
            0.0
        }
    }
}

/// Lock-free activity counters kept next to the registry map
#[derive(Debug, Default)]
pub(crate) struct RegistryCounters {
    publishes: AtomicU64,
    deliveries: AtomicU64,
    callback_panics: AtomicU64,
}

impl RegistryCounters {
    pub(crate) fn record_publish(&self) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deliveries(&self, count: usize) {
        self.deliveries.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_panic(&self) {
        self.callback_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, components: usize, streams: usize) -> RegistryStats {
        RegistryStats {
            components,
            streams,
            publishes: self.publishes.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
        }
    }
}
