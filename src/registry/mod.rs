//! Debug stream registry
//!
//! The registry maps each component to the callbacks ("streams") that
//! subscribers registered for it, and fans published debug payloads out to
//! them synchronously on the publisher's thread.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<StreamRegistry>
//!                 ┌──────────────────────────────────┐
//!                 │ streams: RwLock<HashMap<         │
//!                 │   ComponentId,                   │
//!                 │   HashMap<StreamId, Callback>,   │
//!                 │ >>                               │
//!                 └────────────────┬─────────────────┘
//!                                  │
//!         ┌────────────────────────┼────────────────────────┐
//!         │                        │                        │
//!         ▼                        ▼                        ▼
//!    [Component]              [Callback]             [ChannelSink]
//!    publish(id, data)        cb(data)               try_send(data)
//!         │                        ▲                        │
//!         └──► read lock ──────────┘                        ▼
//!                                             mpsc ──► StreamReceiver::recv()
//! ```
//!
//! `subscribe` and `unsubscribe` take the write lock. `publish` keeps the
//! read lock while callbacks run, so mutations wait for in-flight
//! deliveries and a removed callback is never invoked afterwards.

pub mod config;
pub mod key;
pub mod manager;
pub mod sink;
pub mod store;

pub use config::{CallbackFaults, RegistryConfig};
pub use key::{ComponentId, StreamId};
pub use manager::DebugStreamManager;
pub use sink::{SinkConfig, StreamReceiver, DEFAULT_SINK_CAPACITY};
pub use store::{Callback, StreamRegistry};
