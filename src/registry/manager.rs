//! Debug stream manager trait
//!
//! The seam embedding code depends on. Components hold an
//! `Arc<dyn DebugStreamManager>` to publish their debug output, and the
//! subscription side (a UI or CLI session) attaches callbacks through the
//! same handle without either knowing about the other.

use super::key::{ComponentId, StreamId};
use super::store::{Callback, StreamRegistry};

/// Operations for managing debug streams
pub trait DebugStreamManager: Send + Sync {
    /// Deliver `payload` to every stream registered for `component_id`
    ///
    /// Returns the number of callbacks that returned normally.
    fn publish(&self, component_id: &str, payload: &str) -> usize;

    /// Register `callback` under (`component_id`, `stream_id`), replacing any
    /// previous callback for that pair
    fn subscribe(&self, stream_id: StreamId, component_id: ComponentId, callback: Callback);

    /// Remove the stream registered under (`component_id`, `stream_id`), if any
    fn unsubscribe(&self, stream_id: &str, component_id: &str);
}

impl DebugStreamManager for StreamRegistry {
    fn publish(&self, component_id: &str, payload: &str) -> usize {
        StreamRegistry::publish(self, component_id, payload)
    }

    fn subscribe(&self, stream_id: StreamId, component_id: ComponentId, callback: Callback) {
        self.subscribe_callback(stream_id, component_id, callback)
    }

    fn unsubscribe(&self, stream_id: &str, component_id: &str) {
        StreamRegistry::unsubscribe(self, stream_id, component_id)
    }
}
