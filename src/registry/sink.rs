//! Channel-backed stream consumers
//!
//! A callback runs on the publisher's thread, which is the wrong place for
//! an async consumer such as a websocket session. [`subscribe_channel`]
//! registers a callback that samples, filters and forwards payloads onto a
//! bounded `tokio::sync::mpsc` channel, and hands back the receiving end.
//!
//! The forwarding callback never blocks the publisher: when the channel is
//! full (or the receiver is gone) the payload is dropped and counted.
//!
//! [`subscribe_channel`]: StreamRegistry::subscribe_channel

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;

use super::key::{ComponentId, StreamId};
use super::store::StreamRegistry;

/// Default number of payloads buffered per channel sink
pub const DEFAULT_SINK_CAPACITY: usize = 1000;

/// Channel sink options
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Payloads buffered before new ones are dropped (minimum 1)
    pub capacity: usize,

    /// Probability in `[0.0, 1.0]` that a payload is kept
    pub sample_probability: f64,

    /// Lowercased substring a payload must contain (case-insensitive)
    pub filter: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SINK_CAPACITY,
            sample_probability: 1.0,
            filter: None,
        }
    }
}

impl SinkConfig {
    /// Set the channel capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Set the sampling probability
    ///
    /// Values outside `[0.0, 1.0]` are clamped; NaN keeps everything.
    pub fn sample_probability(mut self, probability: f64) -> Self {
        self.sample_probability = normalize_probability(probability);
        self
    }

    /// Only forward payloads containing `filter`, ignoring case
    ///
    /// An empty filter matches everything.
    pub fn filter(mut self, filter: impl AsRef<str>) -> Self {
        self.filter = normalize_filter(filter.as_ref());
        self
    }
}

fn normalize_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        1.0
    } else {
        probability.clamp(0.0, 1.0)
    }
}

fn normalize_filter(filter: &str) -> Option<String> {
    let filter = filter.to_lowercase();
    (!filter.is_empty()).then_some(filter)
}

/// Forwarding callback state
struct ChannelSink {
    tx: mpsc::Sender<String>,
    sample_probability: f64,
    filter: Option<String>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    fn accepts(&self, payload: &str) -> bool {
        if let Some(ref filter) = self.filter {
            if !payload.to_lowercase().contains(filter.as_str()) {
                return false;
            }
        }

        if self.sample_probability >= 1.0 {
            true
        } else if self.sample_probability <= 0.0 {
            false
        } else {
            rand::thread_rng().gen_bool(self.sample_probability)
        }
    }

    fn forward(&self, payload: &str) {
        if !self.accepts(payload) {
            return;
        }

        if self.tx.try_send(payload.to_owned()).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Receiving end of a channel sink
///
/// Dropping the receiver does not unsubscribe; call
/// [`StreamRegistry::unsubscribe`] with [`stream_id`](Self::stream_id) and
/// [`component_id`](Self::component_id). Once the stream is unsubscribed or
/// replaced, [`recv`](Self::recv) drains what is buffered and then returns
/// `None`.
#[derive(Debug)]
pub struct StreamReceiver {
    stream_id: StreamId,
    component_id: ComponentId,
    rx: mpsc::Receiver<String>,
    dropped: Arc<AtomicU64>,
}

impl StreamReceiver {
    /// Receive the next payload
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Receive a buffered payload without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Payloads dropped because the channel was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stream this receiver is registered under
    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Component this receiver is attached to
    pub fn component_id(&self) -> &ComponentId {
        &self.component_id
    }
}

impl StreamRegistry {
    /// Subscribe a bounded channel to a component
    ///
    /// Replaces any callback already registered under the same
    /// (component, stream) pair, like [`subscribe`](Self::subscribe).
    pub fn subscribe_channel(
        &self,
        stream_id: impl Into<StreamId>,
        component_id: impl Into<ComponentId>,
        config: SinkConfig,
    ) -> StreamReceiver {
        let stream_id = stream_id.into();
        let component_id = component_id.into();
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));

        tracing::debug!(
            component = %component_id,
            stream = %stream_id,
            capacity = config.capacity,
            sample_probability = config.sample_probability,
            filter = ?config.filter,
            "Channel sink created"
        );

        // Fields are public, so a struct literal can bypass the builders.
        let sink = ChannelSink {
            tx,
            sample_probability: normalize_probability(config.sample_probability),
            filter: config.filter.as_deref().and_then(normalize_filter),
            dropped: Arc::clone(&dropped),
        };
        self.subscribe(stream_id.clone(), component_id.clone(), move |payload: &str| {
            sink.forward(payload)
        });

        StreamReceiver {
            stream_id,
            component_id,
            rx,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready_eq, task};

    use super::*;

    #[test]
    fn test_default_sink_config() {
        let config = SinkConfig::default();

        assert_eq!(config.capacity, DEFAULT_SINK_CAPACITY);
        assert_eq!(config.sample_probability, 1.0);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_builder_clamps() {
        let config = SinkConfig::default().capacity(0).sample_probability(1.5);
        assert_eq!(config.capacity, 1);
        assert_eq!(config.sample_probability, 1.0);

        let config = SinkConfig::default().sample_probability(-0.2);
        assert_eq!(config.sample_probability, 0.0);

        let config = SinkConfig::default().sample_probability(f64::NAN);
        assert_eq!(config.sample_probability, 1.0);
    }

    #[test]
    fn test_builder_filter() {
        let config = SinkConfig::default().filter("ERROR");
        assert_eq!(config.filter.as_deref(), Some("error"));

        let config = SinkConfig::default().filter("");
        assert!(config.filter.is_none());
    }

    #[tokio::test]
    async fn test_channel_receives_payloads() {
        let registry = StreamRegistry::new();
        let mut rx = registry.subscribe_channel("ws-1", "c1", SinkConfig::default());

        assert_eq!(registry.publish("c1", "first"), 1);
        assert_eq!(registry.publish("c1", "second"), 1);

        assert_eq!(rx.recv().await.as_deref(), Some("first"));
        assert_eq!(rx.recv().await.as_deref(), Some("second"));
        assert_eq!(rx.stream_id().as_str(), "ws-1");
        assert_eq!(rx.component_id().as_str(), "c1");
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_channel() {
        let registry = StreamRegistry::new();
        let mut rx = registry.subscribe_channel("ws-1", "c1", SinkConfig::default());

        registry.publish("c1", "buffered");
        registry.unsubscribe(rx.stream_id().as_str(), rx.component_id().as_str());

        assert_eq!(rx.recv().await.as_deref(), Some("buffered"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_replaced_sink_closes_channel() {
        let registry = StreamRegistry::new();
        let mut old = registry.subscribe_channel("ws-1", "c1", SinkConfig::default());
        let mut new = registry.subscribe_channel("ws-1", "c1", SinkConfig::default());

        registry.publish("c1", "x");

        assert_eq!(old.recv().await, None);
        assert_eq!(new.recv().await.as_deref(), Some("x"));
    }

    #[test]
    fn test_full_channel_drops() {
        let registry = StreamRegistry::new();
        let mut rx = registry.subscribe_channel("ws-1", "c1", SinkConfig::default().capacity(1));

        registry.publish("c1", "a");
        registry.publish("c1", "b");
        registry.publish("c1", "c");

        assert_eq!(rx.dropped(), 2);
        assert_eq!(rx.try_recv().as_deref(), Some("a"));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_dropped_receiver_counts_drops() {
        let registry = StreamRegistry::new();
        let rx = registry.subscribe_channel("ws-1", "c1", SinkConfig::default());
        let dropped = Arc::clone(&rx.dropped);
        drop(rx);

        // Still registered until unsubscribed
        assert!(registry.is_subscribed("ws-1", "c1"));
        registry.publish("c1", "x");

        assert_eq!(dropped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_zero_probability_keeps_nothing() {
        let registry = StreamRegistry::new();
        let mut rx = registry.subscribe_channel(
            "ws-1",
            "c1",
            SinkConfig::default().sample_probability(0.0),
        );

        for _ in 0..100 {
            registry.publish("c1", "x");
        }

        assert_eq!(rx.try_recv(), None);
        assert_eq!(rx.dropped(), 0);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let registry = StreamRegistry::new();
        let mut rx = registry.subscribe_channel("ws-1", "c1", SinkConfig::default().filter("Error"));

        registry.publish("c1", "level=info msg=ok");
        registry.publish("c1", "level=ERROR msg=boom");

        assert_eq!(rx.try_recv().as_deref(), Some("level=ERROR msg=boom"));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_recv_wakes_on_publish() {
        let registry = StreamRegistry::new();
        let mut rx = registry.subscribe_channel("ws-1", "c1", SinkConfig::default());

        let mut recv = task::spawn(rx.recv());
        assert_pending!(recv.poll());

        registry.publish("c1", "late");

        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), Some("late".to_string()));
    }

    #[test]
    fn test_literal_config_is_normalized() {
        let registry = StreamRegistry::new();
        let mut nan = registry.subscribe_channel(
            "ws-nan",
            "c1",
            SinkConfig {
                sample_probability: f64::NAN,
                ..Default::default()
            },
        );
        let mut above = registry.subscribe_channel(
            "ws-above",
            "c1",
            SinkConfig {
                sample_probability: 7.0,
                capacity: 0,
                ..Default::default()
            },
        );
        let mut below = registry.subscribe_channel(
            "ws-below",
            "c1",
            SinkConfig {
                sample_probability: -1.0,
                ..Default::default()
            },
        );

        assert_eq!(registry.publish("c1", "x"), 3);

        assert_eq!(nan.try_recv().as_deref(), Some("x"));
        assert_eq!(above.try_recv().as_deref(), Some("x"));
        assert_eq!(below.try_recv(), None);
    }

    #[test]
    fn test_literal_filter_is_normalized() {
        let registry = StreamRegistry::new();
        let mut upper = registry.subscribe_channel(
            "ws-upper",
            "c1",
            SinkConfig {
                filter: Some("ERROR".to_string()),
                ..Default::default()
            },
        );
        let mut empty = registry.subscribe_channel(
            "ws-empty",
            "c1",
            SinkConfig {
                filter: Some(String::new()),
                ..Default::default()
            },
        );

        registry.publish("c1", "level=error msg=boom");

        assert_eq!(upper.try_recv().as_deref(), Some("level=error msg=boom"));
        assert_eq!(empty.try_recv().as_deref(), Some("level=error msg=boom"));
    }

    #[test]
    fn test_normalize_probability() {
        assert_eq!(normalize_probability(f64::NAN), 1.0);
        assert_eq!(normalize_probability(2.0), 1.0);
        assert_eq!(normalize_probability(-0.5), 0.0);
        assert_eq!(normalize_probability(0.25), 0.25);
    }
}
