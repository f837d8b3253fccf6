//! In-process debug stream registry
//!
//! Components publish debug payloads by ID; debugging sessions attach and
//! detach named callbacks for the components they watch while data keeps
//! flowing.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use livedebug::StreamRegistry;
//!
//! let registry = StreamRegistry::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! registry.subscribe("session-1", "loki.process.default", move |payload: &str| {
//!     sink.lock().unwrap().push(payload.to_string());
//! });
//!
//! registry.publish("loki.process.default", "line=1");
//! registry.unsubscribe("session-1", "loki.process.default");
//! registry.publish("loki.process.default", "line=2");
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["line=1"]);
//! ```

pub mod registry;
pub mod stats;

pub use registry::{
    Callback, CallbackFaults, ComponentId, DebugStreamManager, RegistryConfig, SinkConfig,
    StreamId, StreamReceiver, StreamRegistry,
};
pub use stats::RegistryStats;
