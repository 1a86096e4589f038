//! Produce a batch of JSON messages with backpressure, then flush.
//!
//! ```sh
//! cargo run --example produce -- localhost:9092 orders
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use kafka_bridge::{ProducerBuilder, ProducerRecord, Timeout};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct Order {
    id: u64,
    amount_cents: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let broker = args.next().context("usage: produce <broker> <topic>")?;
    let topic = args.next().context("usage: produce <broker> <topic>")?;

    let mut producer = ProducerBuilder::new().with_broker(broker).build()?;

    for id in 0..1000 {
        let order = Order {
            id,
            amount_cents: id * 100,
        };
        let record = ProducerRecord::to(&topic)
            .with_key(id.to_string())
            .with_json_payload(&order)?;
        producer.enqueue(&record)?;

        // Keep at most 100 messages in flight.
        producer.poll_until_queue_size(Timeout::After(Duration::from_millis(100)), 100)?;
    }

    producer.flush(Timeout::After(Duration::from_secs(30)))?;
    info!(%topic, "all messages delivered");
    Ok(())
}
