//! Stream registry implementation
//!
//! The central registry that maps components to their subscriber callbacks
//! and fans published payloads out to them.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::stats::{RegistryCounters, RegistryStats};

use super::config::{CallbackFaults, RegistryConfig};
use super::key::{ComponentId, StreamId};

/// Subscriber callback receiving one debug payload
///
/// May be invoked from any publishing thread.
pub type Callback = Arc<dyn Fn(&str) + Send + Sync>;

type StreamMap = HashMap<StreamId, Callback>;

/// Central registry for all debug streams
///
/// Thread-safe via a single `RwLock` over the two-level map. `publish` holds
/// the read lock while it runs the callbacks, so publishes proceed in
/// parallel but a slow callback holds off `subscribe`/`unsubscribe` on every
/// component until it returns.
///
/// Callbacks may call [`publish`](Self::publish) and the read-only accessors
/// re-entrantly. Calling `subscribe` or `unsubscribe` from inside a callback
/// deadlocks.
pub struct StreamRegistry {
    /// Map of component to its registered streams
    streams: RwLock<HashMap<ComponentId, StreamMap>>,

    /// Configuration
    config: RegistryConfig,

    counters: RegistryCounters,
}

impl StreamRegistry {
    /// Create a new stream registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new stream registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            config,
            counters: RegistryCounters::default(),
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Deliver a payload to every stream registered for a component
    ///
    /// Callbacks run synchronously on the calling thread, in no particular
    /// order. Publishing to an unknown or empty component does nothing.
    ///
    /// Returns the number of callbacks that returned normally.
    pub fn publish(&self, component_id: &str, payload: &str) -> usize {
        self.counters.record_publish();

        // Recursive read: a callback that reads the registry again must not
        // queue behind a waiting writer. The accessors below do the same.
        let streams = self.streams.read_recursive();

        let Some(entries) = streams.get(component_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (stream_id, callback) in entries {
            match self.config.callback_faults {
                CallbackFaults::Propagate => {
                    callback(payload);
                    delivered += 1;
                    self.counters.record_deliveries(1);
                }
                CallbackFaults::Isolate => {
                    match panic::catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                        Ok(()) => {
                            delivered += 1;
                            self.counters.record_deliveries(1);
                        }
                        Err(cause) => {
                            self.counters.record_panic();
                            tracing::warn!(
                                component = component_id,
                                stream = %stream_id,
                                panic = %panic_message(cause.as_ref()),
                                "Debug stream callback panicked"
                            );
                        }
                    }
                }
            }
        }

        tracing::trace!(
            component = component_id,
            streams = entries.len(),
            delivered = delivered,
            "Payload published"
        );

        delivered
    }

    /// Register a callback for a stream of a component
    ///
    /// Replaces any callback already registered under the same
    /// (component, stream) pair.
    pub fn subscribe<F>(
        &self,
        stream_id: impl Into<StreamId>,
        component_id: impl Into<ComponentId>,
        callback: F,
    ) where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe_callback(stream_id.into(), component_id.into(), Arc::new(callback));
    }

    /// Register an already shared callback
    pub fn subscribe_callback(
        &self,
        stream_id: StreamId,
        component_id: ComponentId,
        callback: Callback,
    ) {
        let mut streams = self.streams.write();
        let entries = streams.entry(component_id.clone()).or_default();
        let previous = entries.insert(stream_id.clone(), callback);
        let count = entries.len();
        drop(streams);

        tracing::debug!(
            component = %component_id,
            stream = %stream_id,
            streams = count,
            replaced = previous.is_some(),
            "Debug stream subscribed"
        );

        // The replaced callback is dropped here, outside the lock.
        drop(previous);
    }

    /// Remove a stream from a component
    ///
    /// Removing a stream that is not registered is a no-op. The component's
    /// (possibly empty) stream map is kept.
    pub fn unsubscribe(&self, stream_id: &str, component_id: &str) {
        let removed = {
            let mut streams = self.streams.write();
            streams
                .get_mut(component_id)
                .and_then(|entries| entries.remove(stream_id))
        };

        tracing::debug!(
            component = component_id,
            stream = stream_id,
            removed = removed.is_some(),
            "Debug stream unsubscribed"
        );
    }

    /// Check whether a stream is currently registered
    pub fn is_subscribed(&self, stream_id: &str, component_id: &str) -> bool {
        self.streams
            .read_recursive()
            .get(component_id)
            .is_some_and(|entries| entries.contains_key(stream_id))
    }

    /// Get the number of streams registered for a component
    pub fn stream_count(&self, component_id: &str) -> usize {
        self.streams
            .read_recursive()
            .get(component_id)
            .map_or(0, |entries| entries.len())
    }

    /// Get the stream IDs registered for a component
    pub fn stream_ids(&self, component_id: &str) -> Vec<StreamId> {
        self.streams
            .read_recursive()
            .get(component_id)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the number of known components, including ones with no streams left
    pub fn component_count(&self) -> usize {
        self.streams.read_recursive().len()
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        let streams = self.streams.read_recursive();
        let stream_total = streams.values().map(HashMap::len).sum();
        self.counters.snapshot(streams.len(), stream_total)
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
