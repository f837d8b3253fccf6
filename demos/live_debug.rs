//! Live debugging demo
//!
//! Run with: cargo run --example live_debug
//!
//! A producer thread publishes debug lines for two components while:
//! - a plain callback counts everything `relabel` emits
//! - an async session consumes a sampled, filtered channel of `loki` output
//!
//! Set `RUST_LOG=livedebug=debug` to see subscribe/unsubscribe events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use livedebug::{DebugStreamManager, SinkConfig, StreamRegistry};
use tracing_subscriber::EnvFilter;

const RELABEL: &str = "prometheus.relabel.default";
const LOKI: &str = "loki.process.default";

fn produce(manager: Arc<dyn DebugStreamManager>, lines: u64) {
    for i in 0..lines {
        let level = if i % 10 == 0 { "error" } else { "info" };
        manager.publish(RELABEL, &format!("sample={i} kept=true"));
        manager.publish(LOKI, &format!("level={level} line={i}"));
        thread::sleep(Duration::from_millis(2));
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = Arc::new(StreamRegistry::new());

    let relabel_count = Arc::new(AtomicU64::new(0));
    {
        let relabel_count = Arc::clone(&relabel_count);
        registry.subscribe("counter", RELABEL, move |_: &str| {
            relabel_count.fetch_add(1, Ordering::Relaxed);
        });
    }

    let mut session = registry.subscribe_channel(
        "ui-session-1",
        LOKI,
        SinkConfig::default().sample_probability(0.5).filter("ERROR"),
    );

    let producer = {
        let manager: Arc<dyn DebugStreamManager> = registry.clone();
        thread::spawn(move || produce(manager, 200))
    };

    let consumer = tokio::spawn(async move {
        let mut received = 0u64;
        while let Some(line) = session.recv().await {
            tracing::info!(component = LOKI, %line, "Debug line");
            received += 1;
        }
        (received, session.dropped())
    });

    tokio::task::spawn_blocking(move || producer.join())
        .await
        .expect("producer task")
        .expect("producer thread");

    // Detaching closes the session channel and ends the consumer loop.
    registry.unsubscribe("ui-session-1", LOKI);
    registry.unsubscribe("counter", RELABEL);

    let (received, dropped) = consumer.await.expect("consumer task");
    let stats = registry.stats();

    tracing::info!(
        relabel_lines = relabel_count.load(Ordering::Relaxed),
        loki_lines = received,
        loki_dropped = dropped,
        publishes = stats.publishes,
        deliveries = stats.deliveries,
        "Demo finished"
    );
}
