//! High-level Kafka client facades over [rdkafka].
//!
//! [`Consumer`] and [`Producer`] wrap rdkafka's `BaseConsumer` and
//! `BaseProducer` with the pieces every service otherwise reimplements:
//! subscription resolution (group subscribe vs. manual assignment), offset
//! commit coalescing, a callback-driven rebalance/error policy, and producer
//! flow control. Both are configured through builders and hold one broker
//! client each.
//!
//! ```no_run
//! use kafka_bridge::{ConsumerBuilder, ConsumeError, ProducerBuilder, ProducerRecord, Timeout};
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut producer = ProducerBuilder::new()
//!     .with_broker("localhost:9092")
//!     .build()?;
//! producer.sync_produce(&ProducerRecord::to("orders").with_payload("{}"))?;
//!
//! let mut consumer = ConsumerBuilder::new()
//!     .with_broker("localhost:9092")
//!     .with_topic("orders")
//!     .with_group_id("checkout")
//!     .build()?;
//! consumer.subscribe(Timeout::Never)?;
//! loop {
//!     match consumer.consume(Timeout::After(Duration::from_secs(1))) {
//!         Ok(record) => {
//!             // handle the record
//!             consumer.commit(&[record])?;
//!         }
//!         Err(ConsumeError::Timeout) => continue,
//!         Err(error) => return Err(error.into()),
//!     }
//! }
//! # }
//! ```
//!
//! A facade instance is single-threaded: create one per thread. Callbacks run
//! on the thread driving the poll; see [`handlers::EventHandlers`] for the
//! policy hooks.

pub mod builder;
pub mod commit;
pub mod config;
pub mod consumer;
mod context;
pub mod error;
pub mod handlers;
pub mod message;
pub mod producer;
pub mod subscription;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// The broker-client types that appear in this crate's API.
pub use rdkafka;
pub use rdkafka::config::RDKafkaLogLevel;
pub use rdkafka::producer::PurgeConfig;
pub use rdkafka::util::Timeout;
pub use rdkafka::Offset;

pub use builder::{ConsumerBuilder, ProducerBuilder};
pub use config::ClientConfiguration;
pub use consumer::Consumer;
pub use context::CallbackContext;
pub use error::{CommitError, ConfigError, ConsumeError, ProduceError, SubscriptionError};
pub use handlers::{
    DefaultEventHandlers, DeliveryReport, ErrorClass, EventHandlers, PartitionAssigner,
};
pub use message::{ConsumerRecord, ProducerRecord};
pub use producer::Producer;
pub use subscription::{ResolvedSubscription, TopicSubscription};
pub use types::Partition;
