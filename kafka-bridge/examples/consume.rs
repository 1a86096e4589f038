//! Consume a topic and print each record, committing after every message.
//!
//! ```sh
//! cargo run --example consume -- localhost:9092 orders
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use kafka_bridge::{ConsumeError, ConsumerBuilder, Timeout};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let broker = args.next().context("usage: consume <broker> <topic>")?;
    let topic = args.next().context("usage: consume <broker> <topic>")?;

    let mut consumer = ConsumerBuilder::new()
        .with_broker(broker)
        .with_topic(&topic)
        .with_group_id("kafka-bridge-demo")
        .build()?;
    consumer.subscribe(Timeout::After(Duration::from_secs(10)))?;
    info!(%topic, "subscribed");

    loop {
        match consumer.consume(Timeout::After(Duration::from_secs(1))) {
            Ok(record) => {
                info!(
                    partition = record.partition(),
                    offset = record.offset(),
                    payload = ?record.payload().map(String::from_utf8_lossy),
                    "received"
                );
                consumer.commit(&[record])?;
            }
            Err(ConsumeError::Timeout) => continue,
            Err(error) => return Err(error.into()),
        }
    }
}
